//! Uniform block reflection and CPU-side staging.
//!
//! The layout is read from the naga IR of a compiled stage, so uniforms are
//! addressed by the member names the shader declares.

use glam::Mat4;

/// Bind group of the program's uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Binding of the uniform block inside [`UNIFORM_GROUP`].
pub const UNIFORM_BINDING: u32 = 0;

/// Member types a uniform block may expose for writing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    Int,
    Float,
    Float3,
    Float4,
    Mat4,
}

impl UniformKind {
    /// Byte size of a value of this kind.
    pub fn size(self) -> usize {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Float3 => 12,
            UniformKind::Float4 => 16,
            UniformKind::Mat4 => 64,
        }
    }

    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        use naga::{Scalar, TypeInner, VectorSize};

        match *inner {
            TypeInner::Scalar(s) if s == Scalar::I32 => Some(UniformKind::Int),
            TypeInner::Scalar(s) if s == Scalar::F32 => Some(UniformKind::Float),
            TypeInner::Vector {
                size: VectorSize::Tri,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformKind::Float3),
            TypeInner::Vector {
                size: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformKind::Float4),
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformKind::Mat4),
            _ => None,
        }
    }
}

/// One writable member of the uniform block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UniformField {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// Reflected layout of the uniform block at group 0 / binding 0.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: u32,
}

impl UniformLayout {
    /// Reads the uniform block declared by `module`.
    ///
    /// Returns `None` when the module declares no struct at the uniform slot.
    /// Members of unsupported types are left out of the lookup table.
    pub fn reflect(module: &naga::Module) -> Option<Self> {
        let (_, var) = module.global_variables.iter().find(|(_, var)| {
            var.space == naga::AddressSpace::Uniform
                && var
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.group == UNIFORM_GROUP && b.binding == UNIFORM_BINDING)
        })?;

        let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            return None;
        };

        let fields = members
            .iter()
            .filter_map(|m| {
                let name = m.name.clone()?;
                let kind = UniformKind::from_naga(&module.types[m.ty].inner)?;
                Some(UniformField {
                    name,
                    offset: m.offset,
                    kind,
                })
            })
            .collect();

        Some(Self {
            fields,
            size: *span,
        })
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Size of the whole block in bytes, padding included.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Staged copy of the uniform block.
///
/// Writes land here and are uploaded with the next flush.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size() as usize];
        Self {
            layout,
            data,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&value))
    }

    pub fn set_float3(&mut self, name: &str, value: [f32; 3]) -> bool {
        self.write(name, UniformKind::Float3, bytemuck::cast_slice(&value))
    }

    pub fn set_float4(&mut self, name: &str, value: [f32; 4]) -> bool {
        self.write(name, UniformKind::Float4, bytemuck::cast_slice(&value))
    }

    /// Column-major, matching WGSL `mat4x4<f32>`.
    pub fn set_mat4(&mut self, name: &str, value: Mat4) -> bool {
        self.write(name, UniformKind::Mat4, bytemuck::cast_slice(&value.to_cols_array()))
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        let bytes = self.read(name, UniformKind::Int)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn float4(&self, name: &str) -> Option<[f32; 4]> {
        let bytes = self.read(name, UniformKind::Float4)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        let bytes = self.read(name, UniformKind::Mat4)?;
        let cols: [f32; 16] = bytemuck::pod_read_unaligned(bytes);
        Some(Mat4::from_cols_array(&cols))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) -> bool {
        let Some(field) = self.layout.field(name) else {
            log::trace!("uniform `{name}` not found; write ignored");
            return false;
        };
        if field.kind != kind {
            log::trace!("uniform `{name}` is {:?}, not {kind:?}; write ignored", field.kind);
            return false;
        }

        let start = field.offset as usize;
        let end = start + bytes.len();
        let Some(slot) = self.data.get_mut(start..end) else {
            return false;
        };
        if slot != bytes {
            slot.copy_from_slice(bytes);
            self.dirty = true;
        }
        true
    }

    fn read(&self, name: &str, kind: UniformKind) -> Option<&[u8]> {
        let field = self.layout.field(name).filter(|f| f.kind == kind)?;
        let start = field.offset as usize;
        self.data.get(start..start + kind.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_UNIFORMS: &str = r#"
        struct BoxUniforms {
            model: mat4x4<f32>,
            boxColor: vec4<f32>,
            useTexture: i32,
        };
        @group(0) @binding(0) var<uniform> u: BoxUniforms;

        @vertex
        fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
            return u.model * vec4<f32>(p, 1.0) * f32(u.useTexture) + u.boxColor;
        }
    "#;

    fn box_layout() -> UniformLayout {
        let module = naga::front::wgsl::parse_str(BOX_UNIFORMS).expect("valid wgsl");
        UniformLayout::reflect(&module).expect("uniform block")
    }

    // ── reflection ────────────────────────────────────────────────────────

    #[test]
    fn reflects_member_offsets_and_kinds() {
        let layout = box_layout();
        assert_eq!(
            layout.field("model"),
            Some(&UniformField { name: "model".into(), offset: 0, kind: UniformKind::Mat4 })
        );
        assert_eq!(layout.field("boxColor").map(|f| f.offset), Some(64));
        assert_eq!(layout.field("boxColor").map(|f| f.kind), Some(UniformKind::Float4));
        assert_eq!(layout.field("useTexture").map(|f| f.offset), Some(80));
        assert_eq!(layout.field("useTexture").map(|f| f.kind), Some(UniformKind::Int));
    }

    #[test]
    fn block_size_is_padded_to_struct_alignment() {
        assert_eq!(box_layout().size(), 96);
    }

    #[test]
    fn module_without_uniforms_reflects_nothing() {
        let module = naga::front::wgsl::parse_str(
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        )
        .expect("valid wgsl");
        assert!(UniformLayout::reflect(&module).is_none());
    }

    // ── staging ───────────────────────────────────────────────────────────

    #[test]
    fn set_int_writes_at_reflected_offset() {
        let mut block = UniformBlock::new(box_layout());
        assert!(block.set_int("useTexture", 1));
        assert_eq!(&block.bytes()[80..84], &1i32.to_ne_bytes());
        assert_eq!(block.int("useTexture"), Some(1));
    }

    #[test]
    fn mat4_round_trips_column_major() {
        let mut block = UniformBlock::new(box_layout());
        let m = Mat4::from_translation(glam::Vec3::new(0.25, -0.5, 0.0));
        assert!(block.set_mat4("model", m));
        assert_eq!(block.mat4("model"), Some(m));
        // translation lives in the fourth column
        let x: f32 = bytemuck::pod_read_unaligned(&block.bytes()[48..52]);
        assert_eq!(x, 0.25);
    }

    #[test]
    fn unknown_name_is_a_no_op() {
        let mut block = UniformBlock::new(box_layout());
        let before = block.bytes().to_vec();
        assert!(!block.set_float4("tint", [1.0; 4]));
        assert_eq!(block.bytes(), &before[..]);
    }

    #[test]
    fn kind_mismatch_is_a_no_op() {
        let mut block = UniformBlock::new(box_layout());
        assert!(!block.set_float3("boxColor", [1.0, 0.0, 0.0]));
        assert_eq!(block.float4("boxColor"), Some([0.0; 4]));
    }

    #[test]
    fn dirty_flag_tracks_changes() {
        let mut block = UniformBlock::new(box_layout());
        assert!(block.take_dirty());
        assert!(!block.take_dirty());

        block.set_float4("boxColor", [1.0, 0.5, 0.5, 1.0]);
        assert!(block.take_dirty());

        // same value again: nothing to upload
        block.set_float4("boxColor", [1.0, 0.5, 0.5, 1.0]);
        assert!(!block.take_dirty());
    }
}

//! Vertex/index buffers for the box quad.

use bytemuck::{Pod, Zeroable};

/// Number of vertices in the quad.
pub const VERTEX_COUNT: usize = 4;

/// Number of indices in the quad (two triangles).
pub const INDEX_COUNT: u32 = 6;

/// Triangle indices over [`quad_vertices`]: TL-BR-BL, TL-TR-BR.
pub const QUAD_INDICES: [u32; INDEX_COUNT as usize] = [0, 2, 3, 0, 1, 2];

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3], // z = 0
    pub tex_coord: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Builds the quad for half-extent `size`.
///
/// Order: top-left, top-right, bottom-right, bottom-left. Texture `(0, 0)`
/// sits at the bottom-left corner.
pub fn quad_vertices(size: f32) -> [QuadVertex; VERTEX_COUNT] {
    let s = size;
    [
        QuadVertex { position: [-s, s, 0.0], tex_coord: [0.0, 1.0] },
        QuadVertex { position: [s, s, 0.0], tex_coord: [1.0, 1.0] },
        QuadVertex { position: [s, -s, 0.0], tex_coord: [1.0, 0.0] },
        QuadVertex { position: [-s, -s, 0.0], tex_coord: [0.0, 0.0] },
    ]
}

// ── buffer set ────────────────────────────────────────────────────────────

/// Vertex layout plus vertex and index buffers, created together.
pub struct BufferSet {
    layout: wgpu::VertexBufferLayout<'static>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl BufferSet {
    /// Allocates GPU storage for one quad. Contents are undefined until
    /// [`BufferSet::upload`].
    pub fn allocate(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("screensaver box vbo"),
            size: (VERTEX_COUNT * std::mem::size_of::<QuadVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("screensaver box ibo"),
            size: (INDEX_COUNT as usize * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            layout: QuadVertex::layout(),
            vertex_buffer,
            index_buffer,
        }
    }

    /// Copies the quad into the GPU buffers.
    pub fn upload(
        &self,
        queue: &wgpu::Queue,
        vertices: &[QuadVertex; VERTEX_COUNT],
        indices: &[u32; INDEX_COUNT as usize],
    ) {
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));
    }

    /// Binds vertex slot 0 and the index buffer.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    /// Vertex layout the box program is linked against.
    pub fn layout(&self) -> &wgpu::VertexBufferLayout<'static> {
        &self.layout
    }

    pub fn index_count(&self) -> u32 {
        INDEX_COUNT
    }
}

/// Straight-alpha RGBA color with every channel in `[0, 1]`.
///
/// This is what the box's `boxColor` uniform receives; the fragment shader
/// multiplies it with the sampled texel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// One of the four color channels, as selected in the control panel.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];

    pub fn label(self) -> &'static str {
        match self {
            Channel::Red => "R",
            Channel::Green => "G",
            Channel::Blue => "B",
            Channel::Alpha => "A",
        }
    }
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    /// Window clear color (dark slate blue).
    pub const BACKDROP: Color = Color::new(0.1, 0.2, 0.3, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn get(self, channel: Channel) -> f32 {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
            Channel::Alpha => self.a,
        }
    }

    /// Sets one channel, clamped to `[0, 1]`.
    #[inline]
    pub fn set(&mut self, channel: Channel, value: f32) {
        let v = value.clamp(0.0, 1.0);
        match channel {
            Channel::Red => self.r = v,
            Channel::Green => self.g = v,
            Channel::Blue => self.b = v,
            Channel::Alpha => self.a = v,
        }
    }

    /// Clamps all channels to `[0, 1]`; non-finite channels become 0.
    #[inline]
    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self::new(c(self.r), c(self.g), c(self.b), c(self.a))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

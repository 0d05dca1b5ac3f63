/// Linear RGBA color.
///
/// Values are expected in linear space. Used for clear colors and solid texture
/// fills; per-sprite tints use [`Rgba8`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Quantizes to straight-alpha bytes, clamping each channel to `[0, 1]`.
    #[inline]
    pub fn to_rgba8(self) -> Rgba8 {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba8::new(q(self.r), q(self.g), q(self.b), q(self.a))
    }
}

/// 8-bit straight-alpha RGBA, the per-instance tint format uploaded to the GPU.
///
/// White leaves the sampled texel unchanged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `0xRRGGBBAA`.
    #[inline]
    pub const fn from_hex(rgba: u32) -> Self {
        Self::new((rgba >> 24) as u8, (rgba >> 16) as u8, (rgba >> 8) as u8, rgba as u8)
    }

    /// Returns a copy whose alpha is multiplied by `factor` (clamped to `[0, 1]`).
    #[inline]
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_unpacks_channels_in_order() {
        assert_eq!(Rgba8::from_hex(0x11223344), Rgba8::new(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn alpha_factor_scales_only_alpha() {
        let c = Rgba8::new(10, 20, 30, 200).with_alpha_factor(0.5);
        assert_eq!(c, Rgba8::new(10, 20, 30, 100));
    }

    #[test]
    fn alpha_factor_is_clamped() {
        assert_eq!(Rgba8::WHITE.with_alpha_factor(3.0).a, 255);
        assert_eq!(Rgba8::WHITE.with_alpha_factor(-1.0).a, 0);
    }

    #[test]
    fn color_quantizes_to_bytes() {
        assert_eq!(ColorRgba::new(1.0, 0.0, 0.5, 2.0).to_rgba8(), Rgba8::new(255, 0, 128, 255));
    }
}

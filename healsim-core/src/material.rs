/// Surface descriptions shared by scene nodes

/// Linear RGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a packed `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn add(self, other: Color) -> Self {
        Self::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }

    pub fn modulate(self, other: Color) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    pub fn lerp(self, other: Color, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Perceived brightness (Rec. 709 weights)
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Round sprites drawn once per vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsMaterial {
    pub color: Color,
    /// World-space size, attenuated by distance when `size_attenuation` is set
    pub size: f32,
    pub opacity: f32,
    pub size_attenuation: bool,
}

impl PointsMaterial {
    pub fn new(color: Color, size: f32) -> Self {
        Self {
            color,
            size,
            opacity: 1.0,
            size_attenuation: true,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Diffuse surface lit by the scene's lights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardMaterial {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
}

impl StandardMaterial {
    pub fn new(color: Color, roughness: f32) -> Self {
        Self {
            color,
            roughness,
            metalness: 0.0,
        }
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Points(PointsMaterial),
    Standard(StandardMaterial),
}

impl Material {
    pub fn color(&self) -> Color {
        match self {
            Material::Points(points) => points.color,
            Material::Standard(standard) => standard.color,
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            Material::Points(points) => points.opacity,
            Material::Standard(_) => 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity() < 1.0
    }
}

impl From<PointsMaterial> for Material {
    fn from(material: PointsMaterial) -> Self {
        Material::Points(material)
    }
}

impl From<StandardMaterial> for Material {
    fn from(material: StandardMaterial) -> Self {
        Material::Standard(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_hex() {
        let color = Color::from_hex(0x0a0a2a);
        assert_relative_eq!(color.r, 10.0 / 255.0);
        assert_relative_eq!(color.g, 10.0 / 255.0);
        assert_relative_eq!(color.b, 42.0 / 255.0);
        assert_eq!(Color::from_hex(0xffffff), Color::WHITE);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let material = PointsMaterial::new(Color::WHITE, 0.1).with_opacity(1.7);
        assert_relative_eq!(material.opacity, 1.0);
        assert!(!Material::from(material).is_transparent());
        assert!(Material::from(material.with_opacity(0.6)).is_transparent());
    }
}

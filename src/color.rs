/// An RGBA color with components between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    /// Unpacks a color from a 0xAARRGGBB integer.
    pub fn from_argb(argb: u32) -> Color {
        let channel = |shift: u32| f64::from((argb >> shift) & 0xFF) / 255.;
        Color {
            r: channel(16),
            g: channel(8),
            b: channel(0),
            a: channel(24),
        }
    }

    /// Returns true if the color is fully transparent.
    pub fn is_transparent(&self) -> bool {
        self.a == 0.
    }
}

#[test]
fn test_color_from_argb() {
    let color = Color::from_argb(0xFF00_FF00);
    assert_eq!(color, Color { r: 0., g: 1., b: 0., a: 1. });
    assert!(Color::from_argb(0x00FF_FFFF).is_transparent());
}

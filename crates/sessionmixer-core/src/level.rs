//! Level meter to fader track color
//!
//! A gang's level indicators are folded into one track color:
//!
//! ```text
//! zero        → black
//! quiet       → dark green   (H=120°, V=0.3)
//! 50%         → bright green (H=120°, V=0.6)
//! 80%         → yellow       (H=60°,  V=0.8)
//! full scale  → red          (H=0°,   V=1.0)
//! ```
//!
//! Levels are placed on a logarithmic scale first, so low signals still move
//! the color visibly instead of sitting at black until the signal is loud.

use crate::provider::ParamRange;

/// Bottom of the level window; anything quieter maps to 0.0
pub const LEVEL_FLOOR_DB: f64 = -96.0;

/// RGBA color with components in 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl LevelColor {
    /// Color for a level of exactly zero
    pub const SILENT: LevelColor = LevelColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// HSV value component (max channel)
    pub fn brightness(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    /// 8-bit RGB, for GUI toolkits that want bytes
    pub fn to_rgb8(&self) -> [u8; 3] {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [byte(self.r), byte(self.g), byte(self.b)]
    }
}

/// Normalize a raw level reading to 0.0-1.0 on a dB scale
///
/// `20*log10(level/max)` clamped to [`LEVEL_FLOOR_DB`], then rescaled so the
/// floor is 0.0 and full scale is 1.0.
pub fn normalize_level(level: i64, range: ParamRange) -> f32 {
    if level <= range.min || range.max <= 0 || level <= 0 {
        return 0.0;
    }

    let db = (20.0 * (level as f64 / range.max as f64).log10()).max(LEVEL_FLOOR_DB);
    let normalized = (db - LEVEL_FLOOR_DB) / -LEVEL_FLOOR_DB;
    (normalized as f32).clamp(0.0, 1.0)
}

/// Track color for a raw level reading
pub fn level_color(level: i64, range: ParamRange) -> LevelColor {
    if level == 0 {
        return LevelColor::SILENT;
    }
    intensity_color(normalize_level(level, range))
}

/// Three-segment intensity curve over a normalized level
pub fn intensity_color(normalized: f32) -> LevelColor {
    let n = normalized.clamp(0.0, 1.0);

    let (hue, value) = if n <= 0.5 {
        // Dark green to bright green
        (120.0, 0.3 + (n / 0.5) * 0.3)
    } else if n <= 0.8 {
        // Green to yellow
        let t = ((n - 0.5) / 0.3).min(1.0);
        (120.0 - t * 60.0, 0.6 + t * 0.2)
    } else {
        // Yellow to red
        let t = ((n - 0.8) / 0.2).min(1.0);
        (60.0 - t * 60.0, 0.8 + t * 0.2)
    };

    let (r, g, b) = hsv_to_rgb(hue, 1.0, value);
    LevelColor::from_rgb(r, g, b)
}

/// Convert HSV (hue in degrees) to RGB components in 0.0-1.0
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const METER: ParamRange = ParamRange { min: 0, max: 4095 };

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_zero_level_is_silent() {
        assert_eq!(level_color(0, METER), LevelColor::SILENT);
        assert_eq!(LevelColor::SILENT.to_rgb8(), [0, 0, 0]);
    }

    #[test]
    fn test_brightness_non_decreasing() {
        let levels = [0, 512, 2048, 4095];
        let brightness: Vec<f32> = levels
            .iter()
            .map(|&level| level_color(level, METER).brightness())
            .collect();

        for pair in brightness.windows(2) {
            assert!(pair[1] >= pair[0], "brightness decreased: {:?}", brightness);
        }
        assert!(brightness[1] > brightness[0]);
    }

    #[test]
    fn test_full_scale_is_red() {
        let color = level_color(4095, METER);
        assert!(approx(color.r, 1.0));
        assert!(approx(color.g, 0.0));
        assert!(approx(color.b, 0.0));
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn test_segment_endpoints() {
        let floor = intensity_color(0.0);
        assert!(approx(floor.g, 0.3) && approx(floor.r, 0.0));

        let mid = intensity_color(0.5);
        assert!(approx(mid.g, 0.6) && approx(mid.r, 0.0));

        let yellow = intensity_color(0.8);
        assert!(approx(yellow.r, 0.8) && approx(yellow.g, 0.8) && approx(yellow.b, 0.0));
    }

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(0, METER), 0.0);
        assert_eq!(normalize_level(4095, METER), 1.0);
        // -6 dB is 90 dB above the floor
        let half = normalize_level(2048, METER);
        assert!((half - 0.9373).abs() < 0.001);
        // Below -96 dB clamps to the floor
        let quiet = normalize_level(1, ParamRange::new(0, 1 << 20));
        assert_eq!(quiet, 0.0);
    }

    #[test]
    fn test_level_at_min_is_floor_color() {
        let range = ParamRange::new(10, 4095);
        assert_eq!(level_color(10, range), intensity_color(0.0));
    }

    #[test]
    fn test_invalid_max_is_floor_color() {
        assert_eq!(level_color(5, ParamRange::new(0, 0)), intensity_color(0.0));
    }
}

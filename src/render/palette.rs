use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];
pub type Rgba = [u8; 4];

fn default_saturation() -> f32 { 0.85 }
fn default_value() -> f32 { 1.0 }
fn default_speed() -> f32 { 0.05 }

/// How bars are colored. Resolved once per tick into a `Palette`; never read
/// inside the numeric pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ColorMode {
    Solid {
        color: Rgb,
    },
    /// Linear blend from the first bar to the last.
    Gradient {
        from: Rgb,
        to: Rgb,
    },
    /// Hue sweep across the bars, rotating `speed` turns per second.
    Rainbow {
        #[serde(default = "default_saturation")]
        saturation: f32,
        #[serde(default = "default_value")]
        value: f32,
        #[serde(default = "default_speed")]
        speed: f32,
    },
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Gradient {
            from: [64, 196, 255],
            to: [255, 64, 160],
        }
    }
}

impl ColorMode {
    pub fn resolve(&self, bar_count: usize, time: f32) -> Palette {
        let count = bar_count.max(1);
        let colors = (0..count)
            .map(|i| {
                let t = if count > 1 { i as f32 / (count - 1) as f32 } else { 0.0 };
                match *self {
                    ColorMode::Solid { color } => opaque(color),
                    ColorMode::Gradient { from, to } => opaque(lerp_rgb(from, to, t)),
                    ColorMode::Rainbow { saturation, value, speed } => {
                        let hue = (t * 0.85 + time * speed).rem_euclid(1.0);
                        opaque(hsv_to_rgb(hue, saturation, value))
                    }
                }
            })
            .collect();
        Palette { colors }
    }
}

/// Per-bar colors for one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colors: Vec<Rgba>,
}

impl Palette {
    pub fn bar(&self, index: usize) -> Rgba {
        self.colors
            .get(index)
            .or_else(|| self.colors.last())
            .copied()
            .unwrap_or([255, 255, 255, 255])
    }

    /// Tips are drawn as a lightened version of their bar color.
    pub fn tip(&self, index: usize) -> Rgba {
        let [r, g, b, a] = self.bar(index);
        let [r, g, b] = lerp_rgb([r, g, b], [255, 255, 255], 0.5);
        [r, g, b, a]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

fn opaque([r, g, b]: Rgb) -> Rgba {
    [r, g, b, 255]
}

fn lerp_rgb(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    [mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])]
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let byte = |c: f32| (c * 255.0).round() as u8;
    [byte(r), byte(g), byte(b)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_hits_both_ends() {
        let palette = ColorMode::Gradient { from: [0, 0, 0], to: [200, 100, 50] }.resolve(5, 0.0);
        assert_eq!(palette.len(), 5);
        assert_eq!(palette.bar(0), [0, 0, 0, 255]);
        assert_eq!(palette.bar(4), [200, 100, 50, 255]);
        assert_eq!(palette.bar(2), [100, 50, 25, 255]);
        // out of range falls back to the last color
        assert_eq!(palette.bar(99), [200, 100, 50, 255]);
    }

    #[test]
    fn solid_and_tip_colors() {
        let palette = ColorMode::Solid { color: [100, 0, 0] }.resolve(3, 0.0);
        assert_eq!(palette.bar(1), [100, 0, 0, 255]);
        assert_eq!(palette.tip(1), [178, 128, 128, 255]);
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), [0, 255, 0]);
        assert_eq!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), [0, 0, 255]);
        assert_eq!(hsv_to_rgb(0.5, 0.0, 0.5), [128, 128, 128]);
    }

    #[test]
    fn rainbow_rotates_over_time() {
        let mode = ColorMode::Rainbow { saturation: 1.0, value: 1.0, speed: 0.25 };
        let a = mode.resolve(8, 0.0);
        let b = mode.resolve(8, 1.0);
        assert_ne!(a.bar(0), b.bar(0));
    }

    #[test]
    fn color_mode_from_toml() {
        let mode: ColorMode = toml::from_str("mode = \"rainbow\"\nspeed = 0.5").unwrap();
        assert_eq!(mode, ColorMode::Rainbow { saturation: 0.85, value: 1.0, speed: 0.5 });
    }
}

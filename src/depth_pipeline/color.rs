//! Hue-wheel colour mapping of normalized range values

use crate::depth_pipeline::normalize::MAX_SCALAR;

/// Maps a normalized scalar in `[0, 240]` to a packed `0xAARRGGBB` pixel.
///
/// Hue is `240 - scalar` at full saturation and half lightness, so near values
/// are blue and far values red. Alpha falls off linearly with the scalar.
pub fn scalar_to_argb(scalar: f32) -> u32 {
    let scalar = scalar.clamp(0.0, MAX_SCALAR);
    let [r, g, b] = hsl_to_rgb(MAX_SCALAR - scalar, 1.0, 0.5);
    let alpha = (255.0 * (1.0 - scalar / MAX_SCALAR)) as u8;
    u32::from_be_bytes([alpha, r, g, b])
}

/// HSL to 8-bit RGB. `hue` in degrees `[0, 360)`, `saturation` and `lightness` in `[0, 1]`.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [u8; 3] {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let m = lightness - 0.5 * c;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [channel(r + m), channel(g + m), channel(b + m)]
}

fn channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(argb: u32) -> [u8; 4] {
        argb.to_be_bytes()
    }

    #[test]
    fn test_near_is_opaque_blue() {
        assert_eq!(split(scalar_to_argb(0.0)), [255, 0, 0, 255]);
    }

    #[test]
    fn test_far_is_transparent_red() {
        assert_eq!(split(scalar_to_argb(240.0)), [0, 255, 0, 0]);
    }

    #[test]
    fn test_midpoint_is_half_transparent_green() {
        let [a, r, g, b] = split(scalar_to_argb(120.0));
        assert_eq!(a, 127);
        assert_eq!((r, g, b), (0, 255, 0));
    }

    #[test]
    fn test_alpha_decreases_with_distance() {
        let mut previous = u8::MAX;
        for step in 0..=240 {
            let alpha = split(scalar_to_argb(step as f32))[0];
            assert!(alpha <= previous);
            previous = alpha;
        }
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(60.0, 1.0, 0.5), [255, 255, 0]);
        assert_eq!(hsl_to_rgb(180.0, 1.0, 0.5), [0, 255, 255]);
        assert_eq!(hsl_to_rgb(0.0, 0.0, 0.5), [128, 128, 128]);
    }
}

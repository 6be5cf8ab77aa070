//! Fixed colour scales for maps and figures

use crate::metrics::biomass::AVAILABLE_RANGE;
use crate::metrics::livestock::MAX_RESIDENCY_DAYS;
use crate::metrics::SurfaceType;
use image::Rgb;

const RED: Rgb<u8> = Rgb([215, 48, 39]);
const YELLOW: Rgb<u8> = Rgb([254, 224, 80]);
const GREEN: Rgb<u8> = Rgb([26, 152, 80]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLUE: Rgb<u8> = Rgb([8, 69, 148]);
const DIVERGING_BLUE: Rgb<u8> = Rgb([33, 102, 172]);
const DIVERGING_RED: Rgb<u8> = Rgb([178, 24, 43]);

pub const POSITIVE_BAR: Rgb<u8> = Rgb([46, 125, 50]);
pub const NEGATIVE_BAR: Rgb<u8> = Rgb([198, 40, 40]);
pub const POINT: Rgb<u8> = Rgb([70, 130, 180]);
pub const FIT_LINE: Rgb<u8> = Rgb([200, 30, 30]);

fn lerp(a: Rgb<u8>, b: Rgb<u8>, t: f64) -> Rgb<u8> {
    let mix = |i: usize| (a.0[i] as f64 + (b.0[i] as f64 - a.0[i] as f64) * t).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

/// Piecewise-linear ramp through evenly spaced stops, `t` clamped to [0, 1]
pub fn ramp(stops: &[Rgb<u8>], t: f64) -> Rgb<u8> {
    match stops {
        [] => WHITE,
        [only] => *only,
        _ => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            let scaled = t * (stops.len() - 1) as f64;
            let index = (scaled.floor() as usize).min(stops.len() - 2);
            lerp(stops[index], stops[index + 1], scaled - index as f64)
        }
    }
}

/// Red to yellow to green over the available-biomass range
pub fn productivity_color(available_kg_ha: f64) -> Rgb<u8> {
    ramp(&[RED, YELLOW, GREEN], available_kg_ha / AVAILABLE_RANGE.1)
}

pub fn residency_color(days: f64) -> Rgb<u8> {
    ramp(&[WHITE, BLUE], days / MAX_RESIDENCY_DAYS)
}

/// Blue (-1) through white (0) to red (+1)
pub fn correlation_color(r: f64) -> Rgb<u8> {
    ramp(&[DIVERGING_BLUE, WHITE, DIVERGING_RED], (r + 1.0) / 2.0)
}

pub fn surface_color(surface_type: SurfaceType) -> Rgb<u8> {
    match surface_type {
        SurfaceType::BareSoil => Rgb([0xd7, 0xb9, 0x8e]),
        SurfaceType::Sparse => Rgb([0xf3, 0xe0, 0x6b]),
        SurfaceType::Moderate => Rgb([0x8c, 0xc8, 0x4b]),
        SurfaceType::Dense => Rgb([0x2e, 0x7d, 0x32]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_productivity_scale_ends() {
        assert_eq!(productivity_color(0.0), RED);
        assert_eq!(productivity_color(600.0), YELLOW);
        assert_eq!(productivity_color(1200.0), GREEN);
        assert_eq!(productivity_color(5000.0), GREEN);
    }

    #[test]
    fn test_residency_and_correlation_scales() {
        assert_eq!(residency_color(0.0), WHITE);
        assert_eq!(residency_color(10.0), BLUE);
        assert_eq!(correlation_color(0.0), WHITE);
        assert_eq!(correlation_color(-1.0), DIVERGING_BLUE);
        assert_eq!(correlation_color(1.0), DIVERGING_RED);
    }

    #[test]
    fn test_surface_colors_distinct() {
        let colors: Vec<_> = SurfaceType::ALL.iter().map(|s| surface_color(*s)).collect();
        for i in 0..colors.len() {
            for j in (i + 1)..colors.len() {
                assert_ne!(colors[i], colors[j]);
            }
        }
    }
}

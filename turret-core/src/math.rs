//! Float helpers usable without `std`
//!
//! `core` does not carry the libm-backed float methods, so the few the
//! controller needs are spelled out here.

/// Absolute value
#[inline]
pub fn abs(v: f32) -> f32 {
    if v < 0.0 {
        -v
    } else {
        v
    }
}

/// Sign of `v` as -1, 0 or 1
#[inline]
pub fn signum(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Round half away from zero to the nearest integer
#[inline]
pub fn round(v: f32) -> i64 {
    if v >= 0.0 {
        (v + 0.5) as i64
    } else {
        (v - 0.5) as i64
    }
}

/// Raise `base` to a small non-negative integer power
pub fn powi(base: f32, exp: u8) -> f32 {
    let mut out = 1.0;
    for _ in 0..exp {
        out *= base;
    }
    out
}

/// First-order low-pass blend factor for a step of `dt` against time constant `tau`
///
/// A zero time constant means no filtering.
#[inline]
pub fn smoothing(dt: f32, tau: f32) -> f32 {
    if tau <= 0.0 {
        1.0
    } else {
        dt / (tau + dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round(2.5), 3);
        assert_eq!(round(-2.5), -3);
        assert_eq!(round(-0.4), 0);
        assert_eq!(round(199.99), 200);
    }

    #[test]
    fn test_powi() {
        assert_eq!(powi(0.5, 0), 1.0);
        assert_eq!(powi(0.5, 2), 0.25);
        assert_eq!(powi(-2.0, 3), -8.0);
    }

    #[test]
    fn test_smoothing_bounds() {
        assert_eq!(smoothing(0.01, 0.0), 1.0);
        let a = smoothing(0.01, 0.09);
        assert!((a - 0.1).abs() < 1e-6);
    }
}

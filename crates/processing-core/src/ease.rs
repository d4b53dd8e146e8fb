//! Easing curves used by scene animations.

/// Easing applied to a normalized progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    OutCubic,
}

impl Easing {
    /// Map `t` (clamped to `[0, 1]`) through the curve. Endpoints are exact.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Blend `from` → `to` by `e`. Exact at `e == 0` and `e == 1`.
pub fn mix(from: f64, to: f64, e: f64) -> f64 {
    from * (1.0 - e) + to * e
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_cubic_endpoints_and_shape() {
        assert_eq!(Easing::OutCubic.apply(0.0), 0.0);
        assert_eq!(Easing::OutCubic.apply(1.0), 1.0);
        assert!((Easing::OutCubic.apply(0.5) - 0.875).abs() < 1e-12);
        // Front-loaded: ahead of linear everywhere inside (0, 1).
        assert!(Easing::OutCubic.apply(0.25) > Easing::Linear.apply(0.25));
    }

    #[test]
    fn test_apply_clamps_out_of_range() {
        assert_eq!(Easing::OutCubic.apply(-3.0), 0.0);
        assert_eq!(Easing::OutCubic.apply(7.0), 1.0);
        assert_eq!(Easing::Linear.apply(f64::NAN), 0.0);
    }

    #[test]
    fn test_mix_is_exact_at_ends() {
        assert_eq!(mix(1.0, 1.12, 0.0), 1.0);
        assert_eq!(mix(1.0, 1.12, 1.0), 1.12);
        assert_eq!(mix(50.0, 0.0, 1.0), 0.0);
    }
}

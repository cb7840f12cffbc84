//! Fuzzy membership functions over `[0, 1]`.

use crate::core::result::RiskCategory;
use crate::scoring::sanitize_unit;

fn triangle(x: f64, start: f64, peak: f64, end: f64) -> f64 {
    if x <= start || x >= end {
        0.0
    } else if x <= peak {
        (x - start) / (peak - start)
    } else {
        (end - x) / (end - peak)
    }
}

fn left_shoulder(x: f64, full: f64, end: f64) -> f64 {
    if x <= full {
        1.0
    } else if x >= end {
        0.0
    } else {
        (end - x) / (end - full)
    }
}

fn right_shoulder(x: f64, start: f64, full: f64) -> f64 {
    if x <= start {
        0.0
    } else if x >= full {
        1.0
    } else {
        (x - start) / (full - start)
    }
}

/// Degree to which probability `p` belongs to `category`, in `[0, 1]`.
pub fn membership(category: RiskCategory, p: f64) -> f64 {
    let p = sanitize_unit(p);
    let degree = match category {
        RiskCategory::Minimal => left_shoulder(p, 0.0, 0.2),
        RiskCategory::Low => triangle(p, 0.15, 0.3, 0.45),
        RiskCategory::Medium => triangle(p, 0.35, 0.55, 0.75),
        RiskCategory::High => triangle(p, 0.65, 0.82, 0.95),
        RiskCategory::Critical => right_shoulder(p, 0.85, 1.0),
    };
    sanitize_unit(degree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peaks() {
        assert_eq!(membership(RiskCategory::Minimal, 0.0), 1.0);
        assert_eq!(membership(RiskCategory::Low, 0.3), 1.0);
        assert_eq!(membership(RiskCategory::Medium, 0.55), 1.0);
        assert_eq!(membership(RiskCategory::High, 0.82), 1.0);
        assert_eq!(membership(RiskCategory::Critical, 1.0), 1.0);
    }

    #[test]
    fn test_overlaps_are_fuzzy() {
        // 0.4 sits in both LOW and MEDIUM
        let low = membership(RiskCategory::Low, 0.4);
        let medium = membership(RiskCategory::Medium, 0.4);
        assert!(low > 0.0 && medium > 0.0);
        assert!((low - 1.0 / 3.0).abs() < 1e-9);
        assert!((medium - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_outside_support_is_zero() {
        assert_eq!(membership(RiskCategory::Minimal, 0.5), 0.0);
        assert_eq!(membership(RiskCategory::Low, 0.1), 0.0);
        assert_eq!(membership(RiskCategory::High, 0.5), 0.0);
        assert_eq!(membership(RiskCategory::Critical, 0.85), 0.0);
    }

    #[test]
    fn test_all_degrees_in_range() {
        for i in 0..=1000 {
            let p = i as f64 / 1000.0;
            for c in RiskCategory::ALL {
                let d = membership(c, p);
                assert!((0.0..=1.0).contains(&d), "{c} at {p} = {d}");
            }
        }
        for c in RiskCategory::ALL {
            assert!(membership(c, f64::NAN).is_finite());
        }
    }
}

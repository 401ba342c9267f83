//! Threshold classification and part status derivation.
//!
//! Both functions are pure: no stored state, no side effects.

use crate::model::{PartStatus, Verdict};

/// Classifies a reading against a threshold.
///
/// The boundary is inclusive on the pass side: a value exactly at the
/// threshold passes.
pub fn classify(value: f64, threshold: f64) -> Verdict {
    if value >= threshold {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Derives a part's aggregate status from every verdict it holds, across both
/// channels.
///
/// `Unset` when there are no verdicts, `Fail` if any verdict failed,
/// otherwise `Pass`.
pub fn derive_status(verdicts: impl IntoIterator<Item = Verdict>) -> PartStatus {
    let mut status = PartStatus::Unset;
    for verdict in verdicts {
        match verdict {
            Verdict::Fail => return PartStatus::Fail,
            Verdict::Pass => status = PartStatus::Pass,
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_at_threshold_passes() {
        assert_eq!(classify(5.0, 5.0), Verdict::Pass);
    }

    #[test]
    fn value_just_below_threshold_fails() {
        assert_eq!(classify(4.9, 5.0), Verdict::Fail);
        assert_eq!(classify(5.0 - f64::EPSILON * 8.0, 5.0), Verdict::Fail);
    }

    #[test]
    fn value_above_threshold_passes() {
        assert_eq!(classify(12.5, 5.0), Verdict::Pass);
    }

    #[test]
    fn pass_iff_value_at_or_above_threshold() {
        let values = [-3.0, 0.0, 0.5, 1.0, 4.99, 5.0, 5.01, 100.0];
        let thresholds = [0.0, 1.0, 5.0, 50.0];
        for t in thresholds {
            for v in values {
                assert_eq!(classify(v, t) == Verdict::Pass, v >= t, "v={v} t={t}");
            }
        }
    }

    #[test]
    fn zero_threshold_passes_zero_reading() {
        assert_eq!(classify(0.0, 0.0), Verdict::Pass);
    }

    #[test]
    fn no_verdicts_is_unset() {
        assert_eq!(derive_status([]), PartStatus::Unset);
    }

    #[test]
    fn all_pass_is_pass() {
        assert_eq!(
            derive_status([Verdict::Pass, Verdict::Pass]),
            PartStatus::Pass
        );
    }

    #[test]
    fn any_fail_is_fail() {
        assert_eq!(
            derive_status([Verdict::Pass, Verdict::Fail, Verdict::Pass]),
            PartStatus::Fail
        );
        assert_eq!(derive_status([Verdict::Fail]), PartStatus::Fail);
    }
}

//! Binomial confidence intervals for match rates.

use serde::Serialize;
use thiserror::Error;

/// z for a two-sided 95% interval.
pub const Z_95: f64 = 1.95996;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Interval requested for an empty sample")]
    EmptySample,

    #[error("Successes ({successes}) exceed sample size ({total})")]
    SuccessesExceedTotal { successes: u32, total: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

/// Wilson score interval for `successes` out of `total` at 95% confidence.
///
/// Callers must not ask for an interval over an empty sample; that is
/// reported as [`IntervalError::EmptySample`] rather than a NaN.
pub fn wilson_interval(successes: u32, total: u32) -> Result<Interval, IntervalError> {
    if total == 0 {
        return Err(IntervalError::EmptySample);
    }
    if successes > total {
        return Err(IntervalError::SuccessesExceedTotal { successes, total });
    }

    let n = total as f64;
    let ns = successes as f64;
    let z2 = Z_95 * Z_95;

    let a = 1.0 / (n + z2);
    let b = ns + z2 / 2.0;
    let c = Z_95 * (ns * (n - ns) / n + z2 / 4.0).sqrt();

    Ok(Interval {
        lower: unit(a * (b - c)),
        upper: unit(a * (b + c)),
    })
}

/// Clamp into [0, 1]; also folds -0.0 into 0.0.
fn unit(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0
    } else {
        x
    }
}

pub fn standard_error(p: f64, n: u32) -> Result<f64, IntervalError> {
    if n == 0 {
        return Err(IntervalError::EmptySample);
    }
    Ok((p * (1.0 - p) / n as f64).sqrt())
}

/// `"3/4; 75.0% (CI: 30.1 - 95.4)"`
pub fn format_stats(successes: u32, total: u32) -> Result<String, IntervalError> {
    let ci = wilson_interval(successes, total)?;
    let percentage = successes as f64 / total as f64 * 100.0;
    Ok(format!(
        "{successes}/{total}; {percentage:.1}% (CI: {:.1} - {:.1})",
        ci.lower * 100.0,
        ci.upper * 100.0
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_wilson_reference_values() {
        let ci = wilson_interval(5, 10).unwrap();
        assert_close(ci.lower, 0.23659347739211153);
        assert_close(ci.upper, 0.7634065226078884);

        let ci = wilson_interval(45, 60).unwrap();
        assert_close(ci.lower, 0.6276795657121113);
        assert_close(ci.upper, 0.8422346231834201);
    }

    #[test]
    fn test_wilson_brackets_proportion() {
        for total in 1..=40u32 {
            for successes in 0..=total {
                let ci = wilson_interval(successes, total).unwrap();
                let p = successes as f64 / total as f64;
                assert!(ci.lower >= 0.0 && ci.upper <= 1.0);
                assert!(ci.lower <= p + 1e-12, "{successes}/{total}");
                assert!(p <= ci.upper + 1e-12, "{successes}/{total}");
            }
        }
    }

    #[test]
    fn test_wilson_rejects_bad_samples() {
        assert_eq!(wilson_interval(0, 0), Err(IntervalError::EmptySample));
        assert_eq!(
            wilson_interval(3, 2),
            Err(IntervalError::SuccessesExceedTotal { successes: 3, total: 2 })
        );
    }

    #[test]
    fn test_standard_error() {
        assert_close(standard_error(0.5, 100).unwrap(), 0.05);
        assert_close(standard_error(1.0, 7).unwrap(), 0.0);
        assert_eq!(standard_error(0.5, 0), Err(IntervalError::EmptySample));
    }

    #[test]
    fn test_format_stats() {
        assert_eq!(format_stats(5, 10).unwrap(), "5/10; 50.0% (CI: 23.7 - 76.3)");
        assert_eq!(format_stats(3, 4).unwrap(), "3/4; 75.0% (CI: 30.1 - 95.4)");
        assert_eq!(format_stats(0, 4).unwrap(), "0/4; 0.0% (CI: 0.0 - 49.0)");
        assert_eq!(format_stats(1, 3).unwrap(), "1/3; 33.3% (CI: 6.1 - 79.2)");
        assert!(format_stats(0, 0).is_err());
    }
}

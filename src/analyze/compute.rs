//! Error budget arithmetic.

use super::model::Status;

/// The budget formula, spelled out for `--explain` output.
pub const BUDGET_FORMULA: &str =
    "allowedBad = 1 - goal; bad = 1 - compliance; consumedPercent = (bad / allowedBad) * 100";

/// The numbers derived from one goal/compliance pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// Compliance after clamping into [0, 1].
    pub compliance: f64,

    /// `1 - compliance`.
    pub bad_fraction: f64,

    /// `1 - goal`.
    pub allowed_bad_fraction: f64,

    /// Percent of the error budget consumed in the window.
    pub consumed_percent: f64,

    /// Status implied by the numbers alone.
    pub status: Status,

    /// Adjustments applied while computing, e.g. clamping.
    pub notes: Vec<String>,
}

/// Rounds to four decimal places for stable serialized output.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Computes budget consumption from a goal fraction and a measured
/// compliance fraction.
///
/// A goal of exactly 1.0 leaves no budget to divide by; the result is
/// partial with an explanatory note rather than an infinity.
pub fn compute_budget(goal: f64, compliance: f64) -> Budget {
    let mut notes = Vec::new();

    let compliance = if compliance < 0.0 {
        notes.push("compliance clamped to 0".to_string());
        0.0
    } else if compliance > 1.0 {
        notes.push("compliance clamped to 1".to_string());
        1.0
    } else {
        compliance
    };

    let bad_fraction = round4(1.0 - compliance);
    let allowed_bad_fraction = round4(1.0 - goal);

    if allowed_bad_fraction <= 0.0 {
        notes.push("goal is 100%; cannot compute allowed bad fraction".to_string());
        return Budget {
            compliance: round4(compliance),
            bad_fraction,
            allowed_bad_fraction: 0.0,
            consumed_percent: 0.0,
            status: Status::Partial,
            notes,
        };
    }

    let consumed_percent = round4((bad_fraction / allowed_bad_fraction) * 100.0);
    let status = if consumed_percent > 100.0 {
        notes.push("error budget exceeded in window".to_string());
        Status::Breach
    } else {
        Status::Ok
    };

    Budget {
        compliance: round4(compliance),
        bad_fraction,
        allowed_bad_fraction,
        consumed_percent,
        status,
        notes,
    }
}

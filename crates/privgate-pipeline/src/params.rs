//! Privacy-budget resolution for uploaded datasets.

use tracing::warn;

use crate::model::ResolvedParameters;

/// Epsilon applied when the client supplies no usable value.
pub const DEFAULT_EPSILON: f64 = 1.0;

/// Resolve the raw epsilon form value.
///
/// Absent, unparsable, non-finite, zero and negative inputs all resolve to
/// [`DEFAULT_EPSILON`], as do values that overflow or underflow to zero once
/// narrowed to the single-precision wire field. The input is not trimmed.
#[must_use]
pub fn resolve_epsilon(raw: Option<&str>) -> ResolvedParameters {
    let Some(raw) = raw else {
        return ResolvedParameters::new(DEFAULT_EPSILON);
    };
    match raw.parse::<f64>() {
        Ok(value) if fits_wire(value) => ResolvedParameters::new(value),
        Ok(value) => {
            warn!(%raw, value, "epsilon out of range; using default");
            ResolvedParameters::new(DEFAULT_EPSILON)
        }
        Err(_) => {
            warn!(%raw, "epsilon not numeric; using default");
            ResolvedParameters::new(DEFAULT_EPSILON)
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn fits_wire(value: f64) -> bool {
    let narrowed = value as f32;
    value.is_finite() && narrowed.is_finite() && narrowed > 0.0
}

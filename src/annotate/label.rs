use serde::{Deserialize, Serialize};

/// Shortest span a label may have, in seconds.
pub const MIN_LABEL_SECONDS: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub u64);

impl std::fmt::Display for LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A time-ranged annotation. `layer` is recomputed by the engine after every
/// change to the label set and is never set by callers.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub id: LabelId,
    pub config_id: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub color: String,
    pub(crate) layer: usize,
}

impl Label {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Clamp a span into `[0, duration]`.
///
/// Returns `None` when the span is non-finite or has no positive length after
/// clamping.
pub fn clamp_span(start: f64, end: f64, duration: f64) -> Option<(f64, f64)> {
    if !start.is_finite() || !end.is_finite() || !duration.is_finite() {
        return None;
    }
    let start = start.clamp(0.0, duration.max(0.0));
    let end = end.clamp(0.0, duration.max(0.0));
    if end <= start {
        return None;
    }
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_range_is_valid() {
        assert_eq!(clamp_span(0.0, 10.0, 10.0), Some((0.0, 10.0)));
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(clamp_span(-2.0, 12.0, 10.0), Some((0.0, 10.0)));
        assert_eq!(clamp_span(9.0, 30.0, 10.0), Some((9.0, 10.0)));
    }

    #[test]
    fn empty_or_inverted_is_discarded() {
        assert_eq!(clamp_span(5.0, 5.0, 10.0), None);
        assert_eq!(clamp_span(6.0, 5.0, 10.0), None);
        assert_eq!(clamp_span(11.0, 12.0, 10.0), None);
        assert_eq!(clamp_span(f64::NAN, 1.0, 10.0), None);
    }
}

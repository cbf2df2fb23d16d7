//! Error debounce policy.
//!
//! Turns the raw fault seen by one poll into the fault surfaced on the
//! equipment state:
//!
//! - no raw fault: surfaced error clears, counter resets
//! - immediate fault (`timeout`, `invalidData`, `commandFailed`, `tripped`,
//!   `crashedPreviously`): surfaced at once, counter resets
//! - mismatch fault: counter increments; the fault is surfaced once the
//!   counter reaches the threshold, otherwise the previous error is kept
//!
//! All mismatch kinds share one counter.

use barn_common::equipment::error::ErrorKind;

/// Result of one debounce step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Error to surface.
    pub error: Option<ErrorKind>,
    /// Updated consecutive-mismatch counter.
    pub count: u32,
}

/// One debounce step.
///
/// `threshold` values below 1 are treated as 1.
pub fn debounce(
    raw: Option<ErrorKind>,
    previous: Option<ErrorKind>,
    count: u32,
    threshold: u32,
) -> Verdict {
    match raw {
        None => Verdict {
            error: None,
            count: 0,
        },
        Some(kind) if kind.is_debounced() => {
            let count = count.saturating_add(1);
            let error = if count >= threshold.max(1) {
                Some(kind)
            } else {
                previous
            };
            Verdict { error, count }
        }
        Some(kind) => Verdict {
            error: Some(kind),
            count: 0,
        },
    }
}

//! Sorted Set Module
//!
//! Per-key collection of unique members, each carrying an `f64` score.
//!
//! ## Responsibilities
//! - O(1) member → score lookups
//! - Ordered iteration by (score, member)
//! - "Seek ≥ (score, member), then walk forward" range queries
//!
//! ## Data Structure Choice
//! Two indexes that are always updated together:
//! - `HashMap<member, score>` answers ZSCORE and locates a member's
//!   position in the order index (the position *is* `(score, member)`).
//! - `BTreeSet<(score, member)>` gives O(log n) seek and in-order walks.
//!
//! Member names are `Bytes`, so both indexes share one heap allocation
//! per member.

mod set;

pub use set::SortedSet;

use ordered_float::OrderedFloat;

/// Score as stored in the order index.
///
/// NaN never reaches a set (rejected at parse time), so the total order
/// `OrderedFloat` provides agrees with IEEE comparison, `-0.0 == 0.0`
/// included.
pub type Score = OrderedFloat<f64>;

/// Magnitudes outside this range are rendered in exponent form
const PLAIN_MIN: f64 = 1e-4;
const PLAIN_MAX: f64 = 1e16;

/// Render a score the way replies carry it: shortest round-trip form,
/// so `2.0` becomes `"2"` and `1.1` stays `"1.1"`. Very large or very
/// small magnitudes use exponent form (`1e300`, `2.5e-7`).
pub fn format_score(score: f64) -> String {
    let magnitude = score.abs();
    if score.is_finite() && score != 0.0 && !(PLAIN_MIN..PLAIN_MAX).contains(&magnitude) {
        format!("{:e}", score)
    } else {
        format!("{}", score)
    }
}

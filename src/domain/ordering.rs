//! Stable fill ordering for deterministic processing.

use crate::domain::{Fill, FillId};
use chrono::{DateTime, Utc};

/// Ordering key for fills: `time`, ties broken by ascending id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FillOrderingKey {
    pub time: DateTime<Utc>,
    pub id: FillId,
}

impl FillOrderingKey {
    pub fn from_fill(fill: &Fill) -> Self {
        FillOrderingKey {
            time: fill.time,
            id: fill.id.clone(),
        }
    }

    /// Returns true if fill_a should come before fill_b.
    pub fn should_come_before(fill_a: &Fill, fill_b: &Fill) -> bool {
        Self::from_fill(fill_a) < Self::from_fill(fill_b)
    }
}

/// Sort fills by `(time, id)` ascending.
pub fn sort_fills_deterministic(fills: &mut [Fill]) {
    fills.sort_by(|a, b| FillOrderingKey::from_fill(a).cmp(&FillOrderingKey::from_fill(b)));
}

/// True if the slice is already in `(time, id)` order.
pub fn is_sorted_deterministic(fills: &[Fill]) -> bool {
    fills
        .windows(2)
        .all(|pair| !FillOrderingKey::should_come_before(&pair[1], &pair[0]))
}

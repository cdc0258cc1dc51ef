//! Period indices and contiguous period ranges.
//!
//! Periods are integer ordinals at a fixed (caller-defined) frequency; calendar
//! conversion happens outside this crate. A [`PeriodRange`] is inclusive on
//! both ends, matching how sample and horizon ranges are written in
//! macroeconomic work (`2000Q1:2010Q4`).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Period — ordinal time index at a fixed frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Period(i64);

impl Period {
    pub const fn new(ordinal: i64) -> Self {
        Period(ordinal)
    }

    pub const fn ordinal(self) -> i64 {
        self.0
    }

    /// Shift by `k` periods (negative `k` moves backwards).
    pub const fn offset(self, k: i64) -> Self {
        Period(self.0 + k)
    }

    /// Signed distance `self − other` in periods.
    pub const fn since(self, other: Period) -> i64 {
        self.0 - other.0
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PeriodRange — inclusive, contiguous range of periods.
///
/// Invariants
/// ----------
/// - `start <= end`; a range always holds at least one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeriodRange {
    start: Period,
    end: Period,
}

impl PeriodRange {
    /// Build an inclusive range; returns `None` when `end < start`.
    pub fn new(start: Period, end: Period) -> Option<Self> {
        if end < start { None } else { Some(PeriodRange { start, end }) }
    }

    /// Range of `len ≥ 1` periods beginning at `start`.
    pub fn with_len(start: Period, len: usize) -> Option<Self> {
        if len == 0 { None } else { Self::new(start, start.offset(len as i64 - 1)) }
    }

    /// Range of `max(len, 1)` periods from `start`; for callers that already
    /// hold a non-empty length.
    pub(crate) fn covering(start: Period, len: usize) -> Self {
        PeriodRange { start, end: start.offset(len.max(1) as i64 - 1) }
    }

    pub fn start(&self) -> Period {
        self.start
    }

    pub fn end(&self) -> Period {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end.since(self.start) + 1) as usize
    }

    /// Always `false`; present for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, period: Period) -> bool {
        self.start <= period && period <= self.end
    }

    /// 0-based position of `period` inside the range.
    pub fn position(&self, period: Period) -> Option<usize> {
        if self.contains(period) { Some(period.since(self.start) as usize) } else { None }
    }

    pub fn iter(&self) -> impl Iterator<Item = Period> + '_ {
        (self.start.ordinal()..=self.end.ordinal()).map(Period::new)
    }
}

impl std::fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

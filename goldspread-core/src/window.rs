//! Time-window labels and their upstream request parameters.
//!
//! The UI offers a fixed set of short codes. Each maps to exactly one
//! `WindowSpec`; anything unrecognized resolves to the default (`24S`).

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// UI-facing window selector.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum WindowLabel {
    /// `1S`: last hour.
    OneHour,
    /// `24S`: last 24 hours.
    #[default]
    OneDay,
    /// `1H`: last week.
    OneWeek,
    /// `1A`: last month.
    OneMonth,
    /// `3A`: last three months.
    ThreeMonths,
    /// `1Y`: last year.
    OneYear,
}

/// Upstream parameters and post-fetch trim for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub label: WindowLabel,
    pub upstream_period: &'static str,
    pub upstream_interval: &'static str,
    pub trim_duration: TimeDelta,
}

impl WindowLabel {
    pub const ALL: [WindowLabel; 6] = [
        WindowLabel::OneHour,
        WindowLabel::OneDay,
        WindowLabel::OneWeek,
        WindowLabel::OneMonth,
        WindowLabel::ThreeMonths,
        WindowLabel::OneYear,
    ];

    /// The short code shown in the UI.
    pub fn code(self) -> &'static str {
        match self {
            WindowLabel::OneHour => "1S",
            WindowLabel::OneDay => "24S",
            WindowLabel::OneWeek => "1H",
            WindowLabel::OneMonth => "1A",
            WindowLabel::ThreeMonths => "3A",
            WindowLabel::OneYear => "1Y",
        }
    }

    /// Strict lookup by code (case-insensitive, surrounding whitespace ignored).
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|label| label.code().eq_ignore_ascii_case(code))
    }

    /// Lenient lookup: unrecognized codes fall back to the default window.
    pub fn resolve(code: &str) -> Self {
        Self::parse(code).unwrap_or_default()
    }

    pub fn spec(self) -> WindowSpec {
        let (period, interval, trim_minutes) = match self {
            WindowLabel::OneHour => ("1d", "1m", 60),
            WindowLabel::OneDay => ("5d", "15m", 1_440),
            WindowLabel::OneWeek => ("1mo", "60m", 10_080),
            WindowLabel::OneMonth => ("3mo", "1d", 43_200),
            WindowLabel::ThreeMonths => ("1y", "1d", 129_600),
            WindowLabel::OneYear => ("2y", "1d", 525_600),
        };
        WindowSpec {
            label: self,
            upstream_period: period,
            upstream_interval: interval,
            trim_duration: TimeDelta::minutes(trim_minutes),
        }
    }
}

impl fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl WindowSpec {
    /// Spec for a raw UI code, falling back to the default window.
    pub fn for_code(code: &str) -> Self {
        WindowLabel::resolve(code).spec()
    }
}

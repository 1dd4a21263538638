use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const PRIORITY_ELEVATED: u8 = 4;
pub const PRIORITY_HIGH: u8 = 5;

const LATE_AFTER_MINUTES: i64 = 10;
const HOUR_MINUTES: i64 = 60;
const DAY_MINUTES: i64 = 24 * HOUR_MINUTES;
const WEEK_MINUTES: i64 = 7 * DAY_MINUTES;
const MONTH_MINUTES: i64 = 30 * DAY_MINUTES;

/// Message tier for a due note, escalating with how long the review has been waiting.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
	OnTime,
	Late,
	HoursLate,
	DaysLate,
	WeeksLate,
	MonthsLate,
}
impl UrgencyTier {
	pub fn for_minutes_late(minutes_late: i64) -> Self {
		match minutes_late {
			m if m < LATE_AFTER_MINUTES => Self::OnTime,
			m if m < HOUR_MINUTES => Self::Late,
			m if m < DAY_MINUTES => Self::HoursLate,
			m if m < WEEK_MINUTES => Self::DaysLate,
			m if m < MONTH_MINUTES => Self::WeeksLate,
			_ => Self::MonthsLate,
		}
	}

	/// ntfy priority, 1 (min) to 5 (max).
	pub fn priority(self) -> u8 {
		match self {
			Self::OnTime | Self::Late | Self::HoursLate => PRIORITY_ELEVATED,
			Self::DaysLate | Self::WeeksLate | Self::MonthsLate => PRIORITY_HIGH,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::OnTime => "on_time",
			Self::Late => "late",
			Self::HoursLate => "hours_late",
			Self::DaysLate => "days_late",
			Self::WeeksLate => "weeks_late",
			Self::MonthsLate => "months_late",
		}
	}
}

pub fn minutes_late(next_review: OffsetDateTime, now: OffsetDateTime) -> i64 {
	(now - next_review).whole_minutes().max(0)
}

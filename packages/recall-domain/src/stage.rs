use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Completed notes keep a non-null `next_review` this far in the future.
pub const COMPLETED_HORIZON_DAYS: i64 = 100 * 365;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStage {
	TenMinutes,
	OneDay,
	SevenDays,
	OneMonth,
	ThreeMonths,
	OneYear,
	TwoYears,
	FiveYears,
	Completed,
}
impl ReviewStage {
	pub const ALL: [Self; 9] = [
		Self::TenMinutes,
		Self::OneDay,
		Self::SevenDays,
		Self::OneMonth,
		Self::ThreeMonths,
		Self::OneYear,
		Self::TwoYears,
		Self::FiveYears,
		Self::Completed,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::TenMinutes => "TEN_MINUTES",
			Self::OneDay => "ONE_DAY",
			Self::SevenDays => "SEVEN_DAYS",
			Self::OneMonth => "ONE_MONTH",
			Self::ThreeMonths => "THREE_MONTHS",
			Self::OneYear => "ONE_YEAR",
			Self::TwoYears => "TWO_YEARS",
			Self::FiveYears => "FIVE_YEARS",
			Self::Completed => "COMPLETED",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::TenMinutes => "10 min",
			Self::OneDay => "1 day",
			Self::SevenDays => "7 days",
			Self::OneMonth => "1 month",
			Self::ThreeMonths => "3 months",
			Self::OneYear => "1 year",
			Self::TwoYears => "2 years",
			Self::FiveYears => "5 years",
			Self::Completed => "Completed",
		}
	}

	/// Wait before the next review at this stage. `None` for a completed note.
	pub fn interval(self) -> Option<Duration> {
		let minutes = match self {
			Self::TenMinutes => 10,
			Self::OneDay => 24 * 60,
			Self::SevenDays => 7 * 24 * 60,
			Self::OneMonth => 30 * 24 * 60,
			Self::ThreeMonths => 90 * 24 * 60,
			Self::OneYear => 365 * 24 * 60,
			Self::TwoYears => 730 * 24 * 60,
			Self::FiveYears => 1_825 * 24 * 60,
			Self::Completed => return None,
		};

		Some(Duration::minutes(minutes))
	}

	pub fn is_completed(self) -> bool {
		matches!(self, Self::Completed)
	}

	fn index(self) -> usize {
		Self::ALL.iter().position(|stage| *stage == self).unwrap_or(0)
	}

	pub fn next(self, action: ReviewAction) -> Self {
		let index = self.index();
		let next = match action {
			ReviewAction::Good => (index + 1).min(Self::ALL.len() - 1),
			ReviewAction::Again => index,
			ReviewAction::Weak => index.saturating_sub(1),
		};

		Self::ALL[next]
	}
}
impl fmt::Display for ReviewStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for ReviewStage {
	type Err = UnknownStage;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|stage| stage.as_str() == s)
			.ok_or_else(|| UnknownStage(s.to_string()))
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownStage(pub String);
impl fmt::Display for UnknownStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown review stage {:?}.", self.0)
	}
}
impl std::error::Error for UnknownStage {}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
	Weak,
	Again,
	Good,
}
impl ReviewAction {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Weak => "weak",
			Self::Again => "again",
			Self::Good => "good",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReviewTransition {
	pub old_stage: ReviewStage,
	pub new_stage: ReviewStage,
	pub next_review: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
}

pub fn initial_next_review(now: OffsetDateTime) -> OffsetDateTime {
	next_review_for(ReviewStage::TenMinutes, now)
}

pub fn next_review_for(stage: ReviewStage, now: OffsetDateTime) -> OffsetDateTime {
	match stage.interval() {
		Some(interval) => now + interval,
		None => now + Duration::days(COMPLETED_HORIZON_DAYS),
	}
}

pub fn apply_review(
	current: ReviewStage,
	action: ReviewAction,
	now: OffsetDateTime,
) -> ReviewTransition {
	let new_stage = current.next(action);

	ReviewTransition {
		old_stage: current,
		new_stage,
		next_review: next_review_for(new_stage, now),
		completed_at: new_stage.is_completed().then_some(now),
	}
}

use crate::urgency::{self, UrgencyTier};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;
const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;
const MINUTES_PER_MONTH: i64 = 30 * MINUTES_PER_DAY;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReviewReminder {
	pub tier: UrgencyTier,
	pub title: String,
	pub body: String,
	pub priority: u8,
	pub tags: Vec<String>,
}

pub fn compose(note_name: &str, minutes_late: i64) -> ReviewReminder {
	let tier = UrgencyTier::for_minutes_late(minutes_late);
	let (title, body) = match tier {
		UrgencyTier::OnTime =>
			(format!("Time to review: {note_name}"), format!("Review \"{note_name}\" now.")),
		UrgencyTier::Late => (
			format!("Review running late: {note_name}"),
			format!("\"{note_name}\" has been waiting {}.", plural(minutes_late, "minute")),
		),
		UrgencyTier::HoursLate => (
			format!("Review overdue: {note_name}"),
			format!(
				"\"{note_name}\" is {} late.",
				plural(minutes_late / MINUTES_PER_HOUR, "hour")
			),
		),
		UrgencyTier::DaysLate => (
			format!("Review overdue: {note_name}"),
			format!(
				"\"{note_name}\" is {} late. Review it before it fades.",
				plural(minutes_late / MINUTES_PER_DAY, "day")
			),
		),
		UrgencyTier::WeeksLate => (
			format!("Review badly overdue: {note_name}"),
			format!(
				"\"{note_name}\" is {} late. Review it before it fades.",
				plural(minutes_late / MINUTES_PER_WEEK, "week")
			),
		),
		UrgencyTier::MonthsLate => (
			format!("Review badly overdue: {note_name}"),
			format!(
				"\"{note_name}\" is {} late. It may need relearning.",
				plural(minutes_late / MINUTES_PER_MONTH, "month")
			),
		),
	};

	ReviewReminder { tier, title, body, priority: tier.priority(), tags: tags_for(tier) }
}

pub fn compose_at(
	note_name: &str,
	next_review: time::OffsetDateTime,
	now: time::OffsetDateTime,
) -> ReviewReminder {
	compose(note_name, urgency::minutes_late(next_review, now))
}

fn tags_for(tier: UrgencyTier) -> Vec<String> {
	let tags: &[&str] = match tier {
		UrgencyTier::OnTime => &["alarm_clock", "book"],
		UrgencyTier::Late | UrgencyTier::HoursLate => &["warning", "book"],
		UrgencyTier::DaysLate | UrgencyTier::WeeksLate | UrgencyTier::MonthsLate =>
			&["rotating_light", "book"],
	};

	tags.iter().map(|tag| tag.to_string()).collect()
}

fn plural(count: i64, unit: &str) -> String {
	if count == 1 { format!("1 {unit}") } else { format!("{count} {unit}s") }
}

pub mod reminder;
pub mod stage;
pub mod urgency;

mod schedule;

pub use schedule::{ScheduleEntry, ScheduleStore, SqliteScheduleStore};

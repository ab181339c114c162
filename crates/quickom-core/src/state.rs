//! Join window and status projection for a meeting record.
//!
//! Pages and the mobile service show whether a meeting can be joined right
//! now and what phase it is in. Recurring meetings have no schedule, so the
//! projection hides their start time and duration.

use serde::{Deserialize, Serialize};

use crate::meeting::{AudioMode, MeetingRecord};

/// Join window evaluation at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingState {
    /// Inside the join window.
    pub in_progress: bool,
    /// A join button should be offered.
    pub available: bool,
    /// The window has closed.
    pub finished: bool,
}

impl MeetingState {
    /// Evaluates the join window.
    ///
    /// The window opens `first_able_to_join_minutes` before the start and
    /// closes at start + duration.
    pub fn at(record: &MeetingRecord, now: i64, first_able_to_join_minutes: u32) -> Self {
        let first_available = record.start_time - i64::from(first_able_to_join_minutes) * 60;
        let last_available = record.start_time + record.duration;

        let in_progress = first_available <= now && now <= last_available;
        Self {
            in_progress,
            available: record.recurring || in_progress,
            finished: !record.recurring && now > last_available,
        }
    }
}

/// Coarse meeting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// Recurring meeting, no schedule.
    Recurring,
    /// The provider no longer has the meeting.
    Missing,
    /// Join window closed.
    Finished,
    /// Inside the join window.
    Started,
    /// Before the join window.
    NotStarted,
}

impl MeetingStatus {
    /// Derives the status from a record and its evaluated window.
    pub fn of(record: &MeetingRecord, state: &MeetingState) -> Self {
        if record.recurring {
            Self::Recurring
        } else if !record.exists_on_provider {
            Self::Missing
        } else if state.finished {
            Self::Finished
        } else if state.in_progress {
            Self::Started
        } else {
            Self::NotStarted
        }
    }

    /// Returns a short label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recurring => "recurring",
            Self::Missing => "missing",
            Self::Finished => "finished",
            Self::Started => "started",
            Self::NotStarted => "not_started",
        }
    }
}

/// Read-only projection of a meeting for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSummary {
    /// Local identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Whether joining is offered now.
    pub available: bool,
    /// Start time, 0 for recurring meetings.
    pub start_time: i64,
    /// Duration in seconds, 0 for recurring meetings.
    pub duration: i64,
    /// Whether a passcode is set.
    pub has_password: bool,
    /// Participants may join before the host.
    pub join_before_host: bool,
    /// Host video on join.
    pub start_video_host: bool,
    /// Participant video on join.
    pub start_video_participants: bool,
    /// Audio channels.
    pub audio: AudioMode,
    /// Meeting phase.
    pub status: MeetingStatus,
}

impl MeetingSummary {
    /// Builds the projection at `now`.
    pub fn from_record(record: &MeetingRecord, now: i64, first_able_to_join_minutes: u32) -> Self {
        let state = MeetingState::at(record, now, first_able_to_join_minutes);
        let (start_time, duration) = if record.recurring {
            (0, 0)
        } else {
            (record.start_time, record.duration)
        };

        Self {
            id: record.id,
            name: record.name.clone(),
            available: state.available,
            start_time,
            duration,
            has_password: record.has_password(),
            join_before_host: record.options.join_before_host,
            start_video_host: record.options.host_video,
            start_video_participants: record.options.participants_video,
            audio: record.options.audio,
            status: MeetingStatus::of(record, &state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: i64 = 1_700_000_000;

    fn scheduled() -> MeetingRecord {
        MeetingRecord::new(1, "Lecture").with_schedule(START, 3600)
    }

    #[test]
    fn before_window() {
        let state = MeetingState::at(&scheduled(), START - 16 * 60, 15);
        assert!(!state.in_progress);
        assert!(!state.available);
        assert!(!state.finished);
        assert_eq!(MeetingStatus::of(&scheduled(), &state), MeetingStatus::NotStarted);
    }

    #[test]
    fn window_opens_early() {
        let state = MeetingState::at(&scheduled(), START - 15 * 60, 15);
        assert!(state.in_progress);
        assert!(state.available);
    }

    #[test]
    fn window_closes_at_end() {
        let record = scheduled();
        assert!(MeetingState::at(&record, START + 3600, 15).in_progress);

        let after = MeetingState::at(&record, START + 3601, 15);
        assert!(!after.in_progress);
        assert!(after.finished);
        assert_eq!(MeetingStatus::of(&record, &after), MeetingStatus::Finished);
    }

    #[test]
    fn recurring_is_always_available() {
        let record = scheduled().with_recurring(true);
        let state = MeetingState::at(&record, START + 100_000, 0);
        assert!(state.available);
        assert!(!state.finished);
        assert_eq!(MeetingStatus::of(&record, &state), MeetingStatus::Recurring);
    }

    #[test]
    fn missing_takes_precedence_over_schedule() {
        let mut record = scheduled();
        record.exists_on_provider = false;
        let state = MeetingState::at(&record, START, 15);
        assert_eq!(MeetingStatus::of(&record, &state), MeetingStatus::Missing);
    }

    #[test]
    fn summary_hides_schedule_for_recurring() {
        let record = scheduled().with_recurring(true).with_password("9999");
        let summary = MeetingSummary::from_record(&record, START, 15);
        assert_eq!(summary.start_time, 0);
        assert_eq!(summary.duration, 0);
        assert!(summary.has_password);
        assert_eq!(summary.status.as_str(), "recurring");
    }

    #[test]
    fn summary_keeps_schedule_for_scheduled() {
        let summary = MeetingSummary::from_record(&scheduled(), START, 15);
        assert_eq!(summary.start_time, START);
        assert_eq!(summary.duration, 3600);
        assert_eq!(summary.status, MeetingStatus::Started);
        assert!(summary.start_video_host);
    }
}

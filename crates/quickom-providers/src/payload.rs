//! Request bodies built from meeting records.

use serde::Serialize;

use quickom_core::{
    AudioMode, MeetingRecord, MeetingType, format_provider_time, seconds_to_minutes_ceil,
    strip_markup,
};

/// Create and update request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingPayload {
    pub topic: String,
    #[serde(rename = "type")]
    pub meeting_type: MeetingType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda: Option<String>,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Only for scheduled types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Minutes, only for scheduled types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Set for updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub settings: PayloadSettings,
}

/// The `settings` object of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadSettings {
    pub host_video: bool,
    pub audio: AudioMode,
    /// Meetings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_before_host: Option<bool>,
    /// Meetings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_video: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_hosts: Option<String>,
}

impl MeetingPayload {
    /// Builds the body for `record`.
    ///
    /// `timezone` is used when the record carries none.
    pub fn from_record(record: &MeetingRecord, timezone: &str) -> Self {
        let meeting_type = record.meeting_type();
        let scheduled = !meeting_type.is_recurring();
        let is_meeting = !meeting_type.is_webinar();

        let agenda = record
            .intro
            .as_deref()
            .map(strip_markup)
            .filter(|a| !a.trim().is_empty());

        Self {
            topic: record.name.clone(),
            meeting_type,
            agenda,
            timezone: record
                .timezone
                .clone()
                .filter(|tz| !tz.is_empty())
                .unwrap_or_else(|| timezone.to_string()),
            password: record.password.clone().filter(|p| !p.is_empty()),
            start_time: scheduled
                .then(|| format_provider_time(record.start_time))
                .flatten(),
            duration: scheduled.then(|| seconds_to_minutes_ceil(record.duration)),
            alias: None,
            settings: PayloadSettings {
                host_video: record.options.host_video,
                audio: record.options.audio,
                join_before_host: is_meeting.then_some(record.options.join_before_host),
                participant_video: is_meeting.then_some(record.options.participants_video),
                alternative_hosts: record
                    .alternative_hosts
                    .clone()
                    .filter(|h| !h.is_empty()),
            },
        }
    }

    /// Builder method to address an existing meeting.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

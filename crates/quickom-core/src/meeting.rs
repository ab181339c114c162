//! Meeting records and provider meeting types.
//!
//! A [`MeetingRecord`] is the durable local copy of one Quickom classroom
//! attached to a course module. The provider owns the session itself; the
//! record mirrors the fields needed to render, grade and schedule it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider meeting type, as sent in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum MeetingType {
    /// A meeting with a fixed start time.
    ScheduledMeeting,
    /// A recurring meeting with no fixed time.
    RecurringMeeting,
    /// A webinar with a fixed start time.
    ScheduledWebinar,
    /// A recurring webinar with no fixed time.
    RecurringWebinar,
}

impl MeetingType {
    /// Picks the type code for the given record flags.
    pub fn from_flags(recurring: bool, webinar: bool) -> Self {
        match (webinar, recurring) {
            (false, false) => Self::ScheduledMeeting,
            (false, true) => Self::RecurringMeeting,
            (true, false) => Self::ScheduledWebinar,
            (true, true) => Self::RecurringWebinar,
        }
    }

    /// Looks up a type from its wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(Self::ScheduledMeeting),
            3 => Some(Self::RecurringMeeting),
            5 => Some(Self::ScheduledWebinar),
            6 => Some(Self::RecurringWebinar),
            _ => None,
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> i64 {
        match self {
            Self::ScheduledMeeting => 2,
            Self::RecurringMeeting => 3,
            Self::ScheduledWebinar => 5,
            Self::RecurringWebinar => 6,
        }
    }

    /// Whether the type has no fixed start time.
    pub fn is_recurring(self) -> bool {
        matches!(self, Self::RecurringMeeting | Self::RecurringWebinar)
    }

    /// Whether the type belongs to the webinar endpoint family.
    pub fn is_webinar(self) -> bool {
        matches!(self, Self::ScheduledWebinar | Self::RecurringWebinar)
    }
}

impl From<MeetingType> for i64 {
    fn from(kind: MeetingType) -> Self {
        kind.code()
    }
}

impl TryFrom<i64> for MeetingType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown meeting type code {}", code))
    }
}

/// Audio channels offered to participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// Telephone and computer audio.
    #[default]
    Both,
    /// Telephone only.
    Telephony,
    /// Computer audio only.
    Voip,
}

impl AudioMode {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Telephony => "telephony",
            Self::Voip => "voip",
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "telephony" => Ok(Self::Telephony),
            "voip" => Ok(Self::Voip),
            other => Err(format!("unknown audio mode: {}", other)),
        }
    }
}

/// Session options mirrored from the provider `settings` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingOptions {
    /// Participants may join before the host.
    pub join_before_host: bool,
    /// Host video starts on join.
    pub host_video: bool,
    /// Participant video starts on join.
    pub participants_video: bool,
    /// Audio channels.
    pub audio: AudioMode,
}

impl Default for MeetingOptions {
    fn default() -> Self {
        Self {
            join_before_host: false,
            host_video: true,
            participants_video: true,
            audio: AudioMode::Both,
        }
    }
}

/// The local record of one Quickom meeting or webinar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingRecord {
    /// Local identifier, assigned by the store.
    pub id: i64,
    /// Owning course.
    pub course: i64,
    /// Provider-side identifier. Empty until the meeting is created.
    pub meeting_id: String,
    /// Display name (provider `topic`).
    pub name: String,
    /// Description (provider `agenda`).
    pub intro: Option<String>,
    /// Text format of `intro`.
    pub intro_format: i32,
    /// Start time, epoch seconds.
    pub start_time: i64,
    /// Duration in seconds.
    pub duration: i64,
    /// Recurring meetings have no meaningful start time or duration.
    pub recurring: bool,
    /// Webinar endpoint family. Fixed at creation.
    pub webinar: bool,
    /// Provider-reported timezone.
    pub timezone: Option<String>,
    /// Meeting passcode.
    pub password: Option<String>,
    /// Participant URL.
    pub join_url: Option<String>,
    /// Host URL. Carries a rotating token.
    pub start_url: Option<String>,
    /// Host key used to build the host access token.
    pub host_key: Option<String>,
    /// Stable provider identifier used for update and delete.
    pub alias: Option<String>,
    /// Local user who created the meeting.
    pub creator_id: Option<String>,
    /// Provider user hosting the meeting.
    pub host_id: Option<String>,
    /// Provider creation timestamp, as reported.
    pub created_at: Option<String>,
    /// Comma separated alternative hosts.
    pub alternative_hosts: Option<String>,
    /// Whether the provider is believed to still have this meeting.
    pub exists_on_provider: bool,
    /// Session options.
    pub options: MeetingOptions,
    /// 0 = ungraded, >0 = maximum points, <0 = negated scale id.
    pub grade: i64,
    /// Last local write, epoch seconds.
    pub time_modified: i64,
}

impl Default for MeetingRecord {
    fn default() -> Self {
        Self {
            id: 0,
            course: 0,
            meeting_id: String::new(),
            name: String::new(),
            intro: None,
            intro_format: 1,
            start_time: 0,
            duration: 0,
            recurring: false,
            webinar: false,
            timezone: None,
            password: None,
            join_url: None,
            start_url: None,
            host_key: None,
            alias: None,
            creator_id: None,
            host_id: None,
            created_at: None,
            alternative_hosts: None,
            exists_on_provider: true,
            options: MeetingOptions::default(),
            grade: 0,
            time_modified: 0,
        }
    }
}

impl MeetingRecord {
    /// Creates an unsaved record for the given course.
    pub fn new(course: i64, name: impl Into<String>) -> Self {
        Self {
            course,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the schedule.
    pub fn with_schedule(mut self, start_time: i64, duration: i64) -> Self {
        self.start_time = start_time;
        self.duration = duration;
        self
    }

    /// Builder method to set the description.
    pub fn with_intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = Some(intro.into());
        self
    }

    /// Builder method to mark as recurring.
    pub fn with_recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }

    /// Builder method to mark as webinar.
    pub fn with_webinar(mut self, webinar: bool) -> Self {
        self.webinar = webinar;
        self
    }

    /// Builder method to set the passcode.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Builder method to set session options.
    pub fn with_options(mut self, options: MeetingOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder method to set the grade setting.
    pub fn with_grade(mut self, grade: i64) -> Self {
        self.grade = grade;
        self
    }

    /// The provider type code implied by this record.
    pub fn meeting_type(&self) -> MeetingType {
        MeetingType::from_flags(self.recurring, self.webinar)
    }

    /// Whether a passcode is set.
    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Compares two records on every field except `start_url`.
    pub fn same_ignoring_start_url(&self, other: &MeetingRecord) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.start_url = None;
        b.start_url = None;
        a == b
    }

    /// Whether any field mirrored into the calendar event differs.
    pub fn calendar_fields_differ(&self, other: &MeetingRecord) -> bool {
        self.intro != other.intro
            || self.intro_format != other.intro_format
            || self.start_time != other.start_time
            || self.duration != other.duration
            || self.recurring != other.recurring
    }
}

/// Removes markup tags from a text fragment.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

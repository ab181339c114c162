//! Wire types for the Quickom REST API.
//!
//! Only the fields the plugin reads are modelled; everything else in a
//! response is ignored. Numeric identifiers may arrive as JSON numbers or
//! strings and are normalized to strings.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Signed(n) => n.to_string(),
            WireId::Unsigned(n) => n.to_string(),
        }
    }
}

fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireId>::deserialize(deserializer)?.map(String::from))
}

fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(String::from)
}

/// A meeting or webinar as returned by the provider.
///
/// The QR-code create/update endpoints return `tutor_url` and
/// `student_url` in place of `start_url` and `join_url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMeeting {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub host_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, rename = "type")]
    pub meeting_type: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub agenda: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub start_url: Option<String>,
    #[serde(default)]
    pub join_url: Option<String>,
    #[serde(default)]
    pub tutor_url: Option<String>,
    #[serde(default)]
    pub student_url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub host_key: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub settings: Option<MeetingSettings>,
}

impl ProviderMeeting {
    /// `start_url`, or `tutor_url` when absent.
    pub fn host_url(&self) -> Option<&str> {
        self.start_url.as_deref().or(self.tutor_url.as_deref())
    }

    /// `join_url`, or `student_url` when absent.
    pub fn participant_url(&self) -> Option<&str> {
        self.join_url.as_deref().or(self.student_url.as_deref())
    }
}

/// The `settings` object of a meeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSettings {
    #[serde(default)]
    pub host_video: Option<bool>,
    #[serde(default)]
    pub participant_video: Option<bool>,
    #[serde(default)]
    pub join_before_host: Option<bool>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub alternative_hosts: Option<String>,
}

/// A provider account user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    #[serde(deserialize_with = "id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// 1 = basic, 2 = licensed.
    #[serde(default, rename = "type")]
    pub user_type: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_login_time: Option<String>,
}

impl ProviderUser {
    /// User type code for a licensed user.
    pub const LICENSED: i64 = 2;

    /// Whether the user holds a license.
    pub fn is_licensed(&self) -> bool {
        self.user_type == Some(Self::LICENSED)
    }
}

/// A past meeting entry from the usage reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMeeting {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub participants_count: Option<i64>,
}

/// One participant row from a meeting report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantReport {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub join_time: Option<String>,
    #[serde(default)]
    pub leave_time: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub attentiveness_score: Option<String>,
}

/// A webinar registrant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body returned with a failing status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    /// The first non-empty message field.
    pub fn message(&self) -> Option<&str> {
        [&self.message, &self.error, &self.error_description]
            .into_iter()
            .filter_map(|m| m.as_deref())
            .find(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_meeting_response() {
        let json = r#"{
            "uuid": "aDYlohsHRtCd4ii1uC2+hA==",
            "id": 85746065432,
            "host_id": "KdYKjnimT4KPd8FFgQt9FQ",
            "topic": "Algebra review",
            "type": 2,
            "start_time": "2020-03-30T04:03:00Z",
            "duration": 60,
            "timezone": "Europe/Paris",
            "agenda": "Chapter 4",
            "created_at": "2020-03-29T10:00:00Z",
            "start_url": "https://quickom.example/s/857",
            "join_url": "https://quickom.example/j/857",
            "password": "4321",
            "settings": {
                "host_video": true,
                "participant_video": false,
                "join_before_host": true,
                "audio": "voip",
                "alternative_hosts": "a@example.com",
                "waiting_room": false
            }
        }"#;

        let meeting: ProviderMeeting = serde_json::from_str(json).unwrap();
        assert_eq!(meeting.id.as_deref(), Some("85746065432"));
        assert_eq!(meeting.meeting_type, Some(2));
        assert_eq!(meeting.duration, Some(60));
        let settings = meeting.settings.unwrap();
        assert_eq!(settings.participant_video, Some(false));
        assert_eq!(settings.audio.as_deref(), Some("voip"));
    }

    #[test]
    fn parse_qrcode_response_urls() {
        let json = r#"{
            "alias": "room-857",
            "host_key": "k3y",
            "tutor_url": "https://quickom.example/call/857",
            "student_url": "https://quickom.example/call/857?guest=1"
        }"#;

        let meeting: ProviderMeeting = serde_json::from_str(json).unwrap();
        assert_eq!(meeting.id, None);
        assert_eq!(meeting.alias.as_deref(), Some("room-857"));
        assert_eq!(meeting.host_url(), Some("https://quickom.example/call/857"));
        assert_eq!(
            meeting.participant_url(),
            Some("https://quickom.example/call/857?guest=1")
        );
    }

    #[test]
    fn parse_user_with_numeric_id() {
        let json = r#"{"id": 42, "email": "t@example.com", "type": 2}"#;
        let user: ProviderUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "42");
        assert!(user.is_licensed());
    }

    #[test]
    fn error_body_message_fallbacks() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error": "", "error_description": "bad key"}"#).unwrap();
        assert_eq!(body.message(), Some("bad key"));

        let body: ErrorBody = serde_json::from_str(r#"{"code": 3001}"#).unwrap();
        assert_eq!(body.message(), None);
        assert_eq!(body.code, Some(3001));
    }

    #[test]
    fn parse_participant_report() {
        let json = r#"{
            "id": "",
            "user_id": 16778240,
            "name": "Ada",
            "user_email": "ada@example.com",
            "join_time": "2020-03-30T04:05:00Z",
            "leave_time": "2020-03-30T05:00:00Z",
            "duration": 3300,
            "attentiveness_score": "97%"
        }"#;
        let row: ParticipantReport = serde_json::from_str(json).unwrap();
        assert_eq!(row.user_id.as_deref(), Some("16778240"));
        assert_eq!(row.duration, Some(3300));
    }
}

//! Launch URLs for hosts and participants.
//!
//! Hosts enter through `start_url` with an access token derived from the
//! meeting alias and host key. Participants enter through `join_url` with
//! their display name attached.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;
use url::Url;

use crate::meeting::MeetingRecord;

/// Errors building a launch URL.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The record has no URL for this role.
    #[error("meeting has no {0}")]
    MissingUrl(&'static str),

    /// Alias or host key is missing.
    #[error("meeting has no host credentials")]
    MissingCredentials,

    /// The stored URL does not parse.
    #[error("invalid meeting URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Builds the URL a host uses to start the meeting.
pub fn host_launch_url(record: &MeetingRecord) -> Result<String, LinkError> {
    let start_url = record
        .start_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(LinkError::MissingUrl("start_url"))?;
    let (alias, host_key) = match (record.alias.as_deref(), record.host_key.as_deref()) {
        (Some(alias), Some(key)) if !alias.is_empty() && !key.is_empty() => (alias, key),
        _ => return Err(LinkError::MissingCredentials),
    };

    let token = URL_SAFE_NO_PAD.encode(format!("{}:{}", alias, host_key));
    let mut url = Url::parse(start_url)?;
    url.query_pairs_mut().append_pair("joinType", "host");
    url.set_fragment(Some(&format!("access_token={}&token_type=Basic", token)));
    Ok(url.into())
}

/// Builds the URL a participant uses to join the meeting.
pub fn participant_launch_url(
    record: &MeetingRecord,
    display_name: &str,
) -> Result<String, LinkError> {
    let join_url = record
        .join_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(LinkError::MissingUrl("join_url"))?;

    let mut url = Url::parse(join_url)?;
    url.query_pairs_mut().append_pair("name", display_name);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MeetingRecord {
        let mut record = MeetingRecord::new(1, "Lab");
        record.start_url = Some("https://quickom.example/call/42".into());
        record.join_url = Some("https://quickom.example/call/42".into());
        record.alias = Some("room-1".into());
        record.host_key = Some("k3y".into());
        record
    }

    #[test]
    fn host_url_carries_token() {
        let url = host_launch_url(&record()).unwrap();
        assert_eq!(
            url,
            "https://quickom.example/call/42?joinType=host#access_token=cm9vbS0xOmszeQ&token_type=Basic"
        );
    }

    #[test]
    fn host_url_requires_credentials() {
        let mut r = record();
        r.host_key = None;
        assert!(matches!(host_launch_url(&r), Err(LinkError::MissingCredentials)));
    }

    #[test]
    fn host_url_requires_start_url() {
        let mut r = record();
        r.start_url = None;
        assert!(matches!(host_launch_url(&r), Err(LinkError::MissingUrl(_))));
    }

    #[test]
    fn participant_url_encodes_name() {
        let url = participant_launch_url(&record(), "Ada Lovelace").unwrap();
        assert_eq!(url, "https://quickom.example/call/42?name=Ada+Lovelace");
    }

    #[test]
    fn participant_url_rejects_bad_url() {
        let mut r = record();
        r.join_url = Some("not a url".into());
        assert!(matches!(
            participant_launch_url(&r, "x"),
            Err(LinkError::InvalidUrl(_))
        ));
    }
}

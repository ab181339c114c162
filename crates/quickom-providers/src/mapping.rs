//! Folding provider responses onto local records.
//!
//! [`apply_provider_meeting`] is pure: it never stamps `time_modified` and a
//! field missing from the response leaves the local value untouched, so
//! applying the same response twice yields the same record.

use tracing::warn;

use quickom_core::{AudioMode, MeetingRecord, MeetingType, minutes_to_seconds, parse_provider_time};

use crate::schema::ProviderMeeting;

fn copy_present(target: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value {
        *target = Some(value.to_string());
    }
}

/// Returns `record` updated with every field present in `meeting`.
pub fn apply_provider_meeting(record: &MeetingRecord, meeting: &ProviderMeeting) -> MeetingRecord {
    let mut out = record.clone();

    copy_present(&mut out.start_url, meeting.host_url());
    copy_present(&mut out.join_url, meeting.participant_url());
    copy_present(&mut out.created_at, meeting.created_at.as_deref());
    copy_present(&mut out.timezone, meeting.timezone.as_deref());
    copy_present(&mut out.creator_id, meeting.creator_id.as_deref());
    copy_present(&mut out.host_id, meeting.host_id.as_deref());
    copy_present(&mut out.host_key, meeting.host_key.as_deref());
    copy_present(&mut out.alias, meeting.alias.as_deref());
    copy_present(&mut out.password, meeting.password.as_deref());
    copy_present(&mut out.intro, meeting.agenda.as_deref());

    if let Some(ref id) = meeting.id {
        out.meeting_id = id.clone();
    }
    if let Some(ref topic) = meeting.topic {
        out.name = topic.clone();
    }
    if let Some(minutes) = meeting.duration {
        out.duration = minutes_to_seconds(minutes);
    }

    if let Some(ref start) = meeting.start_time {
        match parse_provider_time(start) {
            Some(epoch) => out.start_time = epoch,
            None => warn!(meeting_id = %out.meeting_id, start_time = %start, "unparsable start time"),
        }
    }

    if let Some(code) = meeting.meeting_type {
        match MeetingType::from_code(code) {
            Some(kind) => out.recurring = kind.is_recurring(),
            None => warn!(meeting_id = %out.meeting_id, code, "unknown meeting type"),
        }
    }

    if let Some(ref settings) = meeting.settings {
        if let Some(v) = settings.join_before_host {
            out.options.join_before_host = v;
        }
        if let Some(v) = settings.participant_video {
            out.options.participants_video = v;
        }
        if let Some(v) = settings.host_video {
            out.options.host_video = v;
        }
        if let Some(ref audio) = settings.audio {
            match audio.parse::<AudioMode>() {
                Ok(mode) => out.options.audio = mode,
                Err(e) => warn!(meeting_id = %out.meeting_id, error = %e, "ignoring audio setting"),
            }
        }
        copy_present(&mut out.alternative_hosts, settings.alternative_hosts.as_deref());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MeetingSettings;

    fn stored() -> MeetingRecord {
        let mut record = MeetingRecord::new(7, "Algebra")
            .with_schedule(1_585_540_980, 3600)
            .with_intro("Chapter 4");
        record.id = 12;
        record.meeting_id = "857".into();
        record.alias = Some("room-857".into());
        record.time_modified = 1_585_000_000;
        record
    }

    fn full_response() -> ProviderMeeting {
        ProviderMeeting {
            id: Some("857".into()),
            topic: Some("Algebra II".into()),
            meeting_type: Some(3),
            start_time: Some("2020-03-30T05:00:00Z".into()),
            duration: Some(90),
            agenda: Some("Chapter 5".into()),
            start_url: Some("https://quickom.example/s/857?tk=1".into()),
            join_url: Some("https://quickom.example/j/857".into()),
            password: Some("1234".into()),
            settings: Some(MeetingSettings {
                host_video: Some(false),
                participant_video: Some(false),
                join_before_host: Some(true),
                audio: Some("telephony".into()),
                alternative_hosts: Some("b@example.com".into()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn maps_every_present_field() {
        let out = apply_provider_meeting(&stored(), &full_response());
        assert_eq!(out.name, "Algebra II");
        assert_eq!(out.duration, 5400);
        assert_eq!(out.start_time, 1_585_544_400);
        assert!(out.recurring);
        assert_eq!(out.intro.as_deref(), Some("Chapter 5"));
        assert_eq!(out.password.as_deref(), Some("1234"));
        assert!(out.options.join_before_host);
        assert!(!out.options.participants_video);
        assert!(!out.options.host_video);
        assert_eq!(out.options.audio, AudioMode::Telephony);
        assert_eq!(out.alternative_hosts.as_deref(), Some("b@example.com"));
        assert_eq!(out.time_modified, 1_585_000_000);
        assert_eq!(out.id, 12);
    }

    #[test]
    fn mapping_is_idempotent() {
        let response = full_response();
        let once = apply_provider_meeting(&stored(), &response);
        let twice = apply_provider_meeting(&once, &response);
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_fields_keep_local_values() {
        let partial = ProviderMeeting {
            id: Some("857".into()),
            ..Default::default()
        };
        let out = apply_provider_meeting(&stored(), &partial);
        assert_eq!(out, stored());
    }

    #[test]
    fn unparsable_values_are_ignored() {
        let response = ProviderMeeting {
            start_time: Some("next tuesday".into()),
            meeting_type: Some(99),
            settings: Some(MeetingSettings {
                audio: Some("radio".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let out = apply_provider_meeting(&stored(), &response);
        assert_eq!(out.start_time, stored().start_time);
        assert!(!out.recurring);
        assert_eq!(out.options.audio, AudioMode::Both);
    }

    #[test]
    fn qrcode_urls_fill_launch_fields() {
        let response = ProviderMeeting {
            alias: Some("room-900".into()),
            host_key: Some("k3y".into()),
            tutor_url: Some("https://quickom.example/call/900".into()),
            student_url: Some("https://quickom.example/call/900?guest=1".into()),
            ..Default::default()
        };
        let out = apply_provider_meeting(&MeetingRecord::new(1, "New"), &response);
        assert_eq!(out.alias.as_deref(), Some("room-900"));
        assert_eq!(out.start_url.as_deref(), Some("https://quickom.example/call/900"));
        assert_eq!(
            out.join_url.as_deref(),
            Some("https://quickom.example/call/900?guest=1")
        );
    }
}

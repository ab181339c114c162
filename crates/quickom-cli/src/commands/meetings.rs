//! Meeting management commands.

use chrono::Utc;
use serde::Serialize;

use quickom_core::{MeetingRecord, MeetingSummary, minutes_to_seconds, parse_provider_time};
use quickom_server::{Joiner, MeetingStore};

use super::Context;
use crate::cli::MeetingsAction;
use crate::config::DefaultSettings;
use crate::error::{ClientError, ClientResult};

/// Dispatches a `meetings` action.
pub async fn run(ctx: &Context, action: MeetingsAction) -> ClientResult<()> {
    match action {
        MeetingsAction::List { json } => list(ctx, json),
        MeetingsAction::Add {
            course,
            name,
            intro,
            start,
            duration_minutes,
            recurring,
            webinar,
            password,
            grade,
        } => {
            let draft = NewMeeting {
                course,
                name,
                intro,
                start,
                duration_minutes,
                recurring,
                webinar,
                password,
                grade,
            };
            let record = draft.into_record(&ctx.config.defaults)?;
            let manager = ctx.instances(ctx.provider()?);
            let stored = manager.add_instance(record).await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
            Ok(())
        }
        MeetingsAction::Delete { id } => {
            let manager = ctx.instances(ctx.provider()?);
            if manager.delete_instance(id).await? {
                println!("Deleted meeting {}.", id);
                Ok(())
            } else {
                Err(ClientError::Usage(format!("no meeting with id {}", id)))
            }
        }
        MeetingsAction::Recreate { id, host_id } => {
            let manager = ctx.instances(ctx.provider()?);
            let record = manager.recreate_instance(id, &host_id).await?;
            println!(
                "Recreated meeting {} as provider meeting {}.",
                record.id, record.meeting_id
            );
            Ok(())
        }
        MeetingsAction::Launch {
            id,
            user_id,
            name,
            host,
        } => {
            let manager = ctx.instances(ctx.provider()?);
            let joiner = Joiner {
                user_id,
                full_name: name,
                is_host: host,
            };
            println!("{}", manager.launch(id, &joiner)?);
            Ok(())
        }
    }
}

/// One row of `meetings list`.
#[derive(Debug, Serialize)]
struct Row {
    meeting_id: String,
    course: i64,
    exists_on_provider: bool,
    #[serde(flatten)]
    summary: MeetingSummary,
}

fn list(ctx: &Context, json: bool) -> ClientResult<()> {
    let now = Utc::now().timestamp();
    let window = ctx.config.defaults.first_able_to_join;
    let rows: Vec<Row> = ctx
        .store
        .all()?
        .iter()
        .map(|record| Row {
            meeting_id: record.meeting_id.clone(),
            course: record.course,
            exists_on_provider: record.exists_on_provider,
            summary: MeetingSummary::from_record(record, now, window),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No meetings stored.");
        return Ok(());
    }
    for row in rows {
        println!(
            "{:>5}  {:<12} {:<11} {}",
            row.summary.id,
            row.meeting_id,
            row.summary.status.as_str(),
            row.summary.name
        );
    }
    Ok(())
}

/// Input of `meetings add`.
#[derive(Debug, Clone, Default)]
struct NewMeeting {
    course: i64,
    name: String,
    intro: Option<String>,
    start: Option<String>,
    duration_minutes: i64,
    recurring: bool,
    webinar: bool,
    password: Option<String>,
    grade: i64,
}

impl NewMeeting {
    fn into_record(self, defaults: &DefaultSettings) -> ClientResult<MeetingRecord> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Usage("meeting name must not be empty".into()));
        }

        let mut record = MeetingRecord::new(self.course, self.name)
            .with_options(defaults.meeting_options())
            .with_recurring(self.recurring)
            .with_webinar(self.webinar)
            .with_grade(self.grade);

        if !self.recurring {
            let start = self.start.as_deref().ok_or_else(|| {
                ClientError::Usage("--start is required for scheduled meetings".into())
            })?;
            let start_time = parse_provider_time(start)
                .ok_or_else(|| ClientError::Usage(format!("invalid start time `{}`", start)))?;
            if self.duration_minutes <= 0 {
                return Err(ClientError::Usage("duration must be positive".into()));
            }
            record = record.with_schedule(start_time, minutes_to_seconds(self.duration_minutes));
        }
        if let Some(intro) = self.intro.filter(|i| !i.trim().is_empty()) {
            record = record.with_intro(intro);
        }
        if let Some(password) = self.password.filter(|p| !p.is_empty()) {
            record = record.with_password(password);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickom_core::AudioMode;

    fn scheduled() -> NewMeeting {
        NewMeeting {
            course: 4,
            name: "Algebra".into(),
            start: Some("2020-03-30T04:03:00Z".into()),
            duration_minutes: 90,
            ..Default::default()
        }
    }

    #[test]
    fn scheduled_meeting_record() {
        let defaults = DefaultSettings {
            audio: AudioMode::Voip,
            ..Default::default()
        };
        let record = scheduled().into_record(&defaults).unwrap();
        assert_eq!(record.course, 4);
        assert_eq!(record.start_time, 1_585_540_980);
        assert_eq!(record.duration, 5400);
        assert_eq!(record.options.audio, AudioMode::Voip);
        assert!(!record.has_password());
    }

    #[test]
    fn recurring_meeting_needs_no_start() {
        let draft = NewMeeting {
            recurring: true,
            start: None,
            password: Some("1234".into()),
            ..scheduled()
        };
        let record = draft.into_record(&DefaultSettings::default()).unwrap();
        assert!(record.recurring);
        assert_eq!(record.start_time, 0);
        assert!(record.has_password());
    }

    #[test]
    fn scheduled_meeting_requires_valid_start() {
        let defaults = DefaultSettings::default();
        let missing = NewMeeting {
            start: None,
            ..scheduled()
        };
        assert!(missing.into_record(&defaults).is_err());

        let garbled = NewMeeting {
            start: Some("next tuesday".into()),
            ..scheduled()
        };
        assert!(garbled.into_record(&defaults).is_err());
    }
}

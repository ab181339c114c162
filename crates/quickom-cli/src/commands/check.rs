//! Check command: single provider lookup.

use quickom_providers::MeetingLookup;

use super::Context;
use crate::error::{ClientError, ClientResult};

/// Prints the provider's view of one meeting.
pub async fn run(ctx: &Context, meeting_id: &str, webinar: bool) -> ClientResult<()> {
    let provider = ctx.provider()?;
    match provider.lookup(meeting_id, webinar).await? {
        MeetingLookup::Found(meeting) => {
            println!("{}", serde_json::to_string_pretty(&meeting)?);
            Ok(())
        }
        MeetingLookup::NotFound => Err(ClientError::Provider(format!(
            "{} {} does not exist or has expired",
            if webinar { "webinar" } else { "meeting" },
            meeting_id
        ))),
    }
}

//! Privacy commands.

use quickom_server::PrivacyProvider;
use quickom_server::privacy::metadata;

use super::Context;
use crate::cli::PrivacyAction;
use crate::error::{ClientError, ClientResult};

/// Dispatches a `privacy` action.
pub fn run(ctx: &Context, action: PrivacyAction) -> ClientResult<()> {
    let privacy = PrivacyProvider::new(ctx.store.clone());
    match action {
        PrivacyAction::Metadata => {
            println!("{}", serde_json::to_string_pretty(&metadata())?);
        }
        PrivacyAction::Contexts { user_id } => {
            println!(
                "{}",
                serde_json::to_string(&privacy.contexts_for_user(user_id)?)?
            );
        }
        PrivacyAction::Export { user_id, meetings } => {
            let meetings = if meetings.is_empty() {
                privacy.contexts_for_user(user_id)?
            } else {
                meetings
            };
            let rows = privacy.export_user_data(user_id, &meetings)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        PrivacyAction::Delete { meeting, users } => {
            let removed = match (meeting, users.is_empty()) {
                (Some(meeting), true) => privacy.delete_for_meeting(meeting)?,
                (Some(meeting), false) => privacy.delete_users_in_meeting(meeting, &users)?,
                (None, false) => {
                    let mut removed = 0;
                    for user in users {
                        let meetings = privacy.contexts_for_user(user)?;
                        removed += privacy.delete_for_user(user, &meetings)?;
                    }
                    removed
                }
                (None, true) => {
                    return Err(ClientError::Usage(
                        "pass --meeting, --users, or both".into(),
                    ));
                }
            };
            println!("Removed {} participant rows.", removed);
        }
    }
    Ok(())
}

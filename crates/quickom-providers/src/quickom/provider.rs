//! Quickom meeting provider implementation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use rand::RngCore;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use quickom_core::MeetingRecord;

use crate::budget::CallBudget;
use crate::error::{ProviderError, ProviderResult};
use crate::payload::MeetingPayload;
use crate::provider::{BoxFuture, MeetingLookup, MeetingProvider};
use crate::schema::{ParticipantReport, ProviderMeeting, ProviderUser, Registrant, ReportMeeting};

use super::client::{PROVIDER_NAME, QuickomClient, decode, decode_items};
use super::config::QuickomConfig;

/// Upstream code returned when auto-creating a user that already exists.
const USER_ALREADY_IN_ACCOUNT: i64 = 1005;

/// User type assigned to auto-created users.
const BASIC_USER_TYPE: i64 = 1;

const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Percent-encodes a meeting UUID for use as a path segment.
///
/// UUIDs starting with `/` or containing `//` must be encoded twice.
fn encode_uuid(uuid: &str) -> String {
    let once = urlencoding::encode(uuid).into_owned();
    if uuid.starts_with('/') || uuid.contains("//") {
        urlencoding::encode(&once).into_owned()
    } else {
        once
    }
}

fn family(webinar: bool) -> &'static str {
    if webinar { "webinars" } else { "meetings" }
}

/// A user to create in the provider account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Quickom provider.
///
/// Wraps a [`QuickomClient`] with endpoint semantics. The account user list
/// is cached for the lifetime of this value.
#[derive(Debug)]
pub struct QuickomProvider {
    client: QuickomClient,
    users: RwLock<Option<Vec<ProviderUser>>>,
}

impl QuickomProvider {
    /// Creates a provider with its own report budget.
    pub fn new(config: QuickomConfig) -> ProviderResult<Self> {
        Self::with_budget(config, CallBudget::default())
    }

    /// Creates a provider drawing report calls from a shared budget.
    pub fn with_budget(config: QuickomConfig, budget: CallBudget) -> ProviderResult<Self> {
        Ok(Self {
            client: QuickomClient::new(config, budget)?,
            users: RwLock::new(None),
        })
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &QuickomClient {
        &self.client
    }

    fn payload(&self, record: &MeetingRecord) -> ProviderResult<serde_json::Value> {
        let payload = MeetingPayload::from_record(record, &self.client.config().timezone);
        let payload = match record.alias.as_deref() {
            Some(alias) if !alias.is_empty() => payload.with_alias(alias),
            _ => payload,
        };
        serde_json::to_value(payload).map_err(|e| {
            ProviderError::internal(format!("failed to encode meeting payload: {}", e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })
    }

    fn require_alias(record: &MeetingRecord) -> ProviderResult<&str> {
        record
            .alias
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                ProviderError::bad_request(format!("meeting {} has no alias", record.id))
                    .with_provider(PROVIDER_NAME)
            })
    }

    /// Creates a meeting.
    pub async fn create(&self, record: &MeetingRecord) -> ProviderResult<ProviderMeeting> {
        let body = self.payload(record)?;
        let response = self.client.post("api/account/qrcode/create", body).await?;
        if response.is_null() {
            return Err(ProviderError::invalid_response("empty create response")
                .with_provider(PROVIDER_NAME));
        }
        let meeting: ProviderMeeting = decode(response)?;
        info!(course = record.course, alias = ?meeting.alias, "created meeting");
        Ok(meeting)
    }

    /// Updates the meeting identified by the record alias.
    pub async fn update(&self, record: &MeetingRecord) -> ProviderResult<()> {
        Self::require_alias(record)?;
        let body = self.payload(record)?;
        self.client.post("api/account/qrcode/update", body).await?;
        debug!(id = record.id, "updated meeting");
        Ok(())
    }

    /// Deletes the meeting identified by the record alias.
    pub async fn delete(&self, record: &MeetingRecord) -> ProviderResult<()> {
        let alias = Self::require_alias(record)?;
        match self
            .client
            .post("api/account/qrcode/delete", json!({ "alias": alias }))
            .await
        {
            Ok(_) => {
                debug!(id = record.id, alias, "deleted meeting");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(id = record.id, alias, "meeting already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches one meeting or webinar.
    pub async fn lookup(&self, meeting_id: &str, webinar: bool) -> ProviderResult<MeetingLookup> {
        let path = format!("{}/{}", family(webinar), urlencoding::encode(meeting_id));
        match self.client.get(&path, &[]).await {
            Ok(body) => Ok(MeetingLookup::Found(decode(body)?)),
            Err(e) if e.is_not_found() => Ok(MeetingLookup::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Lists all account users. Cached after the first call.
    pub async fn list_users(&self) -> ProviderResult<Vec<ProviderUser>> {
        if let Some(ref users) = *self.users.read().await {
            return Ok(users.clone());
        }

        let mut cache = self.users.write().await;
        if let Some(ref users) = *cache {
            return Ok(users.clone());
        }
        let items = self.client.list_paginated("users", &[], "users").await?;
        let users: Vec<ProviderUser> = decode_items(items)?;
        debug!(count = users.len(), "cached account users");
        *cache = Some(users.clone());
        Ok(users)
    }

    /// Looks up a user by id or email.
    pub async fn get_user(&self, identifier: &str) -> ProviderResult<Option<ProviderUser>> {
        let path = format!("users/{}", urlencoding::encode(identifier));
        match self.client.get(&path, &[]).await {
            Ok(body) => Ok(Some(decode(body)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates a basic user. Returns false when the user already exists.
    pub async fn autocreate_user(&self, user: &NewUser) -> ProviderResult<bool> {
        let mut secret = [0u8; 16];
        rand::rng().fill_bytes(&mut secret);

        let body = json!({
            "action": "autocreate",
            "user_info": {
                "email": user.email,
                "type": BASIC_USER_TYPE,
                "first_name": user.first_name,
                "last_name": user.last_name,
                "password": STANDARD.encode(secret),
            }
        });

        match self.client.post("users", body).await {
            Ok(_) => {
                *self.users.write().await = None;
                info!(email = %user.email, "auto-created provider user");
                Ok(true)
            }
            Err(e) if e.upstream_code() == Some(USER_ALREADY_IN_ACCOUNT) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Lists a user's meetings or webinars.
    pub async fn list_meetings(
        &self,
        user_id: &str,
        webinar: bool,
    ) -> ProviderResult<Vec<ProviderMeeting>> {
        let path = format!("users/{}/{}", urlencoding::encode(user_id), family(webinar));
        let items = self
            .client
            .list_paginated(&path, &[], family(webinar))
            .await?;
        decode_items(items)
    }

    /// Past meetings hosted by a user between two dates.
    pub async fn get_user_report(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProviderResult<Vec<ReportMeeting>> {
        let path = format!("report/users/{}/meetings", urlencoding::encode(user_id));
        let query = [
            ("from", from.format(REPORT_DATE_FORMAT).to_string()),
            ("to", to.format(REPORT_DATE_FORMAT).to_string()),
        ];
        let items = self.client.list_paginated(&path, &query, "meetings").await?;
        decode_items(items)
    }

    /// Registrants of a webinar.
    pub async fn list_webinar_attendees(&self, uuid: &str) -> ProviderResult<Vec<Registrant>> {
        let path = format!("webinars/{}/registrants", encode_uuid(uuid));
        let items = self.client.list_paginated(&path, &[], "registrants").await?;
        decode_items(items)
    }

    /// Details of one webinar occurrence.
    pub async fn get_webinar_detail(&self, uuid: &str) -> ProviderResult<ProviderMeeting> {
        let path = format!("webinars/{}", encode_uuid(uuid));
        decode(self.client.get(&path, &[]).await?)
    }

    /// Participants of a past meeting or webinar.
    pub async fn get_meeting_participants(
        &self,
        uuid: &str,
        webinar: bool,
    ) -> ProviderResult<Vec<ParticipantReport>> {
        let path = format!("report/{}/{}/participants", family(webinar), encode_uuid(uuid));
        let listing = self.client.list_pages(&path, &[], "participants").await?;
        if !listing.complete {
            return Err(ProviderError::rate_limited(format!(
                "participants report for {} cut short after {} rows",
                uuid,
                listing.items.len()
            ))
            .with_provider(PROVIDER_NAME));
        }
        decode_items(listing.items)
    }

    /// Summary report of a past webinar.
    pub async fn get_webinar_details_report(&self, identifier: &str) -> ProviderResult<ReportMeeting> {
        let path = format!("report/webinars/{}", encode_uuid(identifier));
        decode(self.client.get(&path, &[]).await?)
    }

    /// Ids of users who hosted at least one meeting between two dates.
    pub async fn get_active_hosts_uuids(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProviderResult<Vec<String>> {
        let query = [
            ("type", "active".to_string()),
            ("from", from.format(REPORT_DATE_FORMAT).to_string()),
            ("to", to.format(REPORT_DATE_FORMAT).to_string()),
        ];
        let items = self.client.list_paginated("report/users", &query, "users").await?;
        let users: Vec<ProviderUser> = decode_items(items)?;
        Ok(users.into_iter().map(|u| u.id).collect())
    }
}

impl MeetingProvider for QuickomProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn create_meeting<'a>(
        &'a self,
        record: &'a MeetingRecord,
    ) -> BoxFuture<'a, ProviderResult<ProviderMeeting>> {
        Box::pin(self.create(record))
    }

    fn update_meeting<'a>(&'a self, record: &'a MeetingRecord) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.update(record))
    }

    fn delete_meeting<'a>(&'a self, record: &'a MeetingRecord) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.delete(record))
    }

    fn get_meeting_or_webinar_info<'a>(
        &'a self,
        meeting_id: &'a str,
        webinar: bool,
    ) -> BoxFuture<'a, ProviderResult<MeetingLookup>> {
        Box::pin(self.lookup(meeting_id, webinar))
    }
}

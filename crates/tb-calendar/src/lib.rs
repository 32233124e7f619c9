//! Google Calendar integration for tutorbill.
//!
//! Fetches the operator's calendar events over a date range and converts
//! them to [`tb_core::RawEvent`] records. Events whose timestamps cannot be
//! parsed (all-day placeholders, malformed payloads) are rejected
//! individually and reported back; a bad event never aborts the fetch.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tb_core::{Attendee, RawEvent};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Calendar client errors.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The provided access token was invalid.
    #[error("invalid access token: {reason}")]
    InvalidToken { reason: &'static str },
    /// The stored token cannot be refreshed.
    #[error("token file has no refresh credentials; re-authorize the calendar")]
    MissingRefreshCredentials,
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("calendar API error: {message}")]
    Api { message: String },
    /// Failed to parse a response body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Why one event could not be converted to a [`RawEvent`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Date-only events (all-day placeholders) carry no billable times.
    #[error("event has no start/end time")]
    MissingDateTime,
    /// The provider sent a timestamp we cannot parse.
    #[error("unparseable timestamp {value:?}: {source}")]
    BadTimestamp {
        value: String,
        source: chrono::format::ParseError,
    },
}

/// Stored OAuth credentials in Google's authorized-user format
/// (`token.json`, written by the initial authorization flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// The last-issued access token.
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl AuthorizedUser {
    /// Whether this token can be refreshed without user interaction.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

/// Exchanges a refresh token for a fresh access token.
///
/// Mirrors what the authorization flow does on expiry: a refresh-token grant
/// against Google's token endpoint. The caller is expected to persist the
/// returned token back into the token file.
pub async fn refresh_access_token(auth: &AuthorizedUser) -> Result<String, CalendarError> {
    let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
        auth.refresh_token.as_deref(),
        auth.client_id.as_deref(),
        auth.client_secret.as_deref(),
    ) else {
        return Err(CalendarError::MissingRefreshCredentials);
    };

    let http = reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(CalendarError::ClientBuild)?;

    let response = http
        .post(TOKEN_URL)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CalendarError::Api {
            message: format!("token refresh failed with status {status}: {body}"),
        });
    }

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
    }

    let payload: TokenResponse = serde_json::from_str(&body)
        .map_err(|err| CalendarError::InvalidResponse(err.to_string()))?;
    Ok(payload.access_token)
}

/// One event the provider sent but we could not convert.
#[derive(Debug)]
pub struct RejectedEvent {
    /// Title of the rejected event, when present.
    pub title: String,
    pub error: ConvertError,
}

/// Result of fetching one date range.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Converted events in provider order (ascending start time).
    pub events: Vec<RawEvent>,
    /// Events rejected during conversion, for operator visibility.
    pub rejected: Vec<RejectedEvent>,
}

/// Google Calendar API client.
pub struct Client {
    http: reqwest::Client,
    access_token: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client with the given access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, or if the
    /// HTTP client fails to build.
    pub fn new(access_token: impl Into<String>) -> Result<Self, CalendarError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(CalendarError::InvalidToken {
                reason: "access token cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(CalendarError::ClientBuild)?;

        Ok(Self { http, access_token })
    }

    /// Fetches all primary-calendar events between `start` and `end`.
    ///
    /// Recurring events are expanded (`singleEvents=true`) and pages are
    /// followed until exhausted. Conversion failures are collected in the
    /// outcome rather than failing the fetch.
    pub async fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchOutcome, CalendarError> {
        let mut outcome = FetchOutcome::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("singleEvents", "true".into()),
                ("orderBy", "startTime".into()),
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(EVENTS_URL)
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(CalendarError::Api {
                    message: format!("status {status}: {body}"),
                });
            }

            let page: EventsPage = serde_json::from_str(&body)
                .map_err(|err| CalendarError::InvalidResponse(err.to_string()))?;

            for item in page.items {
                let title = item.summary.clone().unwrap_or_default();
                match convert_event(item) {
                    Ok(event) => outcome.events.push(event),
                    Err(error) => {
                        tracing::error!(%title, %error, "rejecting calendar event");
                        outcome.rejected.push(RejectedEvent { title, error });
                    }
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!(
            events = outcome.events.len(),
            rejected = outcome.rejected.len(),
            "fetched calendar events"
        );
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<WireEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    summary: Option<String>,
    #[serde(default)]
    attendees: Vec<WireAttendee>,
    start: WireTime,
    end: WireTime,
}

#[derive(Debug, Deserialize)]
struct WireAttendee {
    email: Option<String>,
    #[serde(default, rename = "self")]
    is_self: bool,
}

/// Google sends either `dateTime` (timed events) or `date` (all-day).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTime {
    date_time: Option<String>,
}

fn parse_time(time: &WireTime) -> Result<DateTime<Utc>, ConvertError> {
    let value = time.date_time.as_deref().ok_or(ConvertError::MissingDateTime)?;
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| ConvertError::BadTimestamp {
            value: value.to_string(),
            source,
        })
}

fn convert_event(event: WireEvent) -> Result<RawEvent, ConvertError> {
    let start = parse_time(&event.start)?;
    let end = parse_time(&event.end)?;
    Ok(RawEvent {
        title: event.summary.unwrap_or_default(),
        attendees: event
            .attendees
            .into_iter()
            .map(|attendee| Attendee {
                email: attendee.email,
                is_self: attendee.is_self,
            })
            .collect(),
        start,
        end,
    })
}

//! Raw calendar events as handed over by the event source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One attendee on a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Attendee email, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether this attendee is the operator's own calendar account.
    #[serde(default)]
    pub is_self: bool,
}

impl Attendee {
    /// An attendee with an email address.
    #[must_use]
    pub fn with_email(email: impl Into<String>, is_self: bool) -> Self {
        Self {
            email: Some(email.into()),
            is_self,
        }
    }

    /// The operator's own account without an email.
    #[must_use]
    pub const fn just_self() -> Self {
        Self {
            email: None,
            is_self: true,
        }
    }
}

/// A calendar event, already filtered to the invoicing date range.
///
/// No invariants are enforced here. Titles may be empty (all-day placeholder
/// events and the like) and attendee lists may be empty; classification and
/// assembly accept both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event title/summary.
    #[serde(default)]
    pub title: String,
    /// Attendees in provider order.
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    /// Session start.
    pub start: DateTime<Utc>,
    /// Session end.
    pub end: DateTime<Utc>,
}

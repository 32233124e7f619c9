//! The client roster: who can be billed, at what rate, via which emails.

use serde::{Deserialize, Serialize};

use crate::event::Attendee;

/// One client on the roster.
///
/// `name` is the canonical identifier everywhere downstream: names extracted
/// from event titles and names resolved via email must match it exactly.
/// `rate` must be positive; the loader enforces this once at load time and it
/// is not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Canonical client name.
    pub name: String,
    /// `"private"` or an agency identifier.
    pub client_type: String,
    /// Hourly rate in GBP.
    pub rate: f64,
    /// Email addresses recognized for attendee matching. May be empty for
    /// clients only ever matched by title.
    #[serde(default)]
    pub emails: Vec<String>,
}

/// Read-only collection of roster entries, ordered by client name.
///
/// The name ordering makes email matching deterministic when two entries
/// share a recognized email: the lexicographically-first client wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Builds a roster, sorting entries by name.
    #[must_use]
    pub fn new(mut entries: Vec<RosterEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Looks up an entry by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Returns the first entry whose recognized emails contain `email`.
    #[must_use]
    pub fn match_email(&self, email: &str) -> Option<&RosterEntry> {
        self.entries
            .iter()
            .find(|entry| entry.emails.iter().any(|e| e == email))
    }

    /// Resolves attendees to a roster entry via email matching.
    ///
    /// Attendees are tried in order (outer loop); for each one the whole
    /// roster is scanned (inner loop). The first attendee with any roster
    /// match wins, regardless of where its entry sits in the roster.
    #[must_use]
    pub fn match_attendees(&self, attendees: &[Attendee]) -> Option<&RosterEntry> {
        attendees
            .iter()
            .filter_map(|attendee| attendee.email.as_deref())
            .find_map(|email| self.match_email(email))
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    /// Iterates client names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a RosterEntry;
    type IntoIter = std::slice::Iter<'a, RosterEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

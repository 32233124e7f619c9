//! Lesson assembly: drives the classifier across an event batch.
//!
//! Every event is processed independently and maps to zero-or-one lesson.
//! Nothing a single event does can abort the batch: every failure degrades
//! to a skip diagnostic (business reasons) or a fault (contract violations),
//! both carried alongside the lessons in the result.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{Classification, classify};
use crate::event::RawEvent;
use crate::roster::Roster;

/// One billable session, after matching and rate resolution.
///
/// `rate` and `client_type` are denormalized copies taken from the roster
/// entry at assembly time; the roster may legitimately change between runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lesson {
    /// Client name, equal to some roster entry's name.
    pub student: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Hourly rate in GBP.
    pub rate: f64,
    pub client_type: String,
}

/// Why an event produced no lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Empty title; expected noise such as all-day placeholders.
    NoTitle,
    /// Invoicing handled entirely by a third-party agency.
    AgencyBilled,
    /// Attendee emails did not resolve to any roster entry.
    UnmatchedEmail,
    /// A title convention matched but the name could not be extracted.
    #[serde(rename = "unparseable-title-pattern")]
    UnparseableTitle,
    /// No known convention matched.
    UnrecognizedFormat,
    /// Excluded by the caller-supplied allow-list.
    FilteredOut,
    /// A name resolved but has no roster entry. The most actionable class:
    /// a real session happened and billing configuration is incomplete.
    RosterEntryMissing,
}

impl SkipReason {
    /// Stable, machine-distinguishable reason code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoTitle => "no-title",
            Self::AgencyBilled => "agency-billed",
            Self::UnmatchedEmail => "unmatched-email",
            Self::UnparseableTitle => "unparseable-title-pattern",
            Self::UnrecognizedFormat => "unrecognized-format",
            Self::FilteredOut => "filtered-out",
            Self::RosterEntryMissing => "roster-entry-missing",
        }
    }

    /// Whether this category is an intentional or expected exclusion rather
    /// than a data-quality problem. Informational skips are logged at debug
    /// level and should not be surfaced as warnings.
    #[must_use]
    pub const fn is_informational(self) -> bool {
        matches!(self, Self::NoTitle | Self::AgencyBilled | Self::FilteredOut)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic for one skipped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    /// Title of the skipped event.
    pub title: String,
    pub reason: SkipReason,
    /// The resolved or extracted student name, when one existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
    /// One entry per attendee, carried for unmatched-email triage: the
    /// email, or a placeholder when the provider sent none. An unmatched
    /// email usually means a roster gap the operator should close.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
}

impl Skip {
    fn new(title: &str, reason: SkipReason) -> Self {
        Self {
            title: title.to_string(),
            reason,
            student: None,
            attendees: Vec::new(),
        }
    }

    fn with_student(title: &str, reason: SkipReason, student: String) -> Self {
        Self {
            student: Some(student),
            ..Self::new(title, reason)
        }
    }
}

/// A contract violation on one event: not a business skip, still not
/// batch-fatal. Surfaced distinctly so callers never conflate it with the
/// skip categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub title: String,
    pub message: String,
}

/// Output of one assembly run over an event batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// Lessons in input event order; grouping is the renderer's job.
    pub lessons: Vec<Lesson>,
    /// One diagnostic per skipped event, in input order.
    pub skips: Vec<Skip>,
    /// Contract violations, in input order.
    pub faults: Vec<Fault>,
}

impl Assembly {
    /// Skip counts per reason, in reason order.
    #[must_use]
    pub fn skip_counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for skip in &self.skips {
            *counts.entry(skip.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Names that resolved to a student but have no roster entry.
    /// Deduplicated, in first-occurrence order.
    #[must_use]
    pub fn missing_students(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for skip in &self.skips {
            if skip.reason != SkipReason::RosterEntryMissing {
                continue;
            }
            match skip.student.as_deref() {
                Some(student) if !seen.contains(&student) => seen.push(student),
                _ => {}
            }
        }
        seen
    }
}

enum Outcome {
    Lesson(Lesson),
    Skipped(Skip),
    Faulted(Fault),
}

/// Assembles billable lessons from a batch of calendar events.
///
/// Events are processed in order and output order matches input order.
/// `name_filter` restricts output to the named students; an empty slice
/// means no restriction. The roster is read-only for the duration of the
/// run, so assembling the same inputs twice yields identical output.
#[must_use]
pub fn assemble_lessons(events: &[RawEvent], roster: &Roster, name_filter: &[String]) -> Assembly {
    let mut assembly = Assembly::default();

    for event in events {
        match process_event(event, roster, name_filter) {
            Outcome::Lesson(lesson) => assembly.lessons.push(lesson),
            Outcome::Skipped(skip) => {
                log_skip(&skip);
                assembly.skips.push(skip);
            }
            Outcome::Faulted(fault) => {
                tracing::error!(title = %fault.title, message = %fault.message, "event violates contract");
                assembly.faults.push(fault);
            }
        }
    }

    tracing::info!(
        lessons = assembly.lessons.len(),
        skipped = assembly.skips.len(),
        events = events.len(),
        "assembled lessons"
    );
    assembly
}

fn log_skip(skip: &Skip) {
    if skip.reason.is_informational() {
        tracing::debug!(title = %skip.title, reason = %skip.reason, "skipping event");
    } else if skip.reason == SkipReason::RosterEntryMissing {
        tracing::error!(
            title = %skip.title,
            student = skip.student.as_deref().unwrap_or_default(),
            "student not on the roster; add their details before invoicing"
        );
    } else {
        tracing::warn!(
            title = %skip.title,
            reason = %skip.reason,
            attendees = ?skip.attendees,
            "skipping event"
        );
    }
}

fn process_event(event: &RawEvent, roster: &Roster, name_filter: &[String]) -> Outcome {
    // Rejected before classification: an empty title is expected noise,
    // distinct from Unrecognized.
    if event.title.is_empty() {
        return Outcome::Skipped(Skip::new("", SkipReason::NoTitle));
    }

    let student = match classify(&event.title, &event.attendees) {
        Classification::Email => match roster.match_attendees(&event.attendees) {
            Some(entry) => entry.name.clone(),
            None => {
                let mut skip = Skip::new(&event.title, SkipReason::UnmatchedEmail);
                // The full attendee list, not just the addressable ones.
                skip.attendees = event
                    .attendees
                    .iter()
                    .map(|attendee| match attendee.email.clone() {
                        Some(email) => email,
                        None => "(no email)".to_string(),
                    })
                    .collect();
                return Outcome::Skipped(skip);
            }
        },
        Classification::AgencyBilled => {
            return Outcome::Skipped(Skip::new(&event.title, SkipReason::AgencyBilled));
        }
        Classification::TitlePattern {
            name: Some(name), ..
        } => name,
        Classification::TitlePattern { name: None, .. } => {
            return Outcome::Skipped(Skip::new(&event.title, SkipReason::UnparseableTitle));
        }
        Classification::Unrecognized => {
            return Outcome::Skipped(Skip::new(&event.title, SkipReason::UnrecognizedFormat));
        }
    };

    // Intentional exclusion requested by the caller; never a warning.
    if !name_filter.is_empty() && !name_filter.iter().any(|name| *name == student) {
        return Outcome::Skipped(Skip::with_student(
            &event.title,
            SkipReason::FilteredOut,
            student,
        ));
    }

    let Some(entry) = roster.get(&student) else {
        return Outcome::Skipped(Skip::with_student(
            &event.title,
            SkipReason::RosterEntryMissing,
            student,
        ));
    };

    if event.end <= event.start {
        return Outcome::Faulted(Fault {
            title: event.title.clone(),
            message: format!("end {} is not after start {}", event.end, event.start),
        });
    }

    Outcome::Lesson(Lesson {
        student,
        start: event.start,
        end: event.end,
        rate: entry.rate,
        client_type: entry.client_type.clone(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::event::Attendee;
    use crate::roster::RosterEntry;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
    }

    fn event(title: &str, attendees: Vec<Attendee>) -> RawEvent {
        RawEvent {
            title: title.into(),
            attendees,
            start: ts(10),
            end: ts(11),
        }
    }

    fn roster() -> Roster {
        Roster::new(vec![
            RosterEntry {
                name: "Alice Smith".into(),
                client_type: "private".into(),
                rate: 50.0,
                emails: vec!["alice@x.com".into()],
            },
            RosterEntry {
                name: "Bob Jones".into(),
                client_type: "blue_education".into(),
                rate: 40.0,
                emails: vec![],
            },
        ])
    }

    #[test]
    fn email_match_produces_one_lesson() {
        let events = vec![event(
            "Maths",
            vec![
                Attendee::with_email("tutor@x.com", true),
                Attendee::with_email("alice@x.com", false),
            ],
        )];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert_eq!(assembly.lessons.len(), 1);
        assert!(assembly.skips.is_empty());
        let lesson = &assembly.lessons[0];
        assert_eq!(lesson.student, "Alice Smith");
        assert_eq!(lesson.client_type, "private");
        assert!((lesson.rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(lesson.start, ts(10));
        assert_eq!(lesson.end, ts(11));
    }

    #[test]
    fn unknown_email_yields_unmatched_email_skip() {
        let events = vec![event(
            "Maths",
            vec![
                Attendee::with_email("tutor@x.com", true),
                Attendee::with_email("unknown@x.com", false),
            ],
        )];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert!(assembly.lessons.is_empty());
        assert_eq!(assembly.skips.len(), 1);
        let skip = &assembly.skips[0];
        assert_eq!(skip.reason, SkipReason::UnmatchedEmail);
        // Full attendee list carried for operator follow-up.
        assert_eq!(skip.attendees, vec!["tutor@x.com", "unknown@x.com"]);
    }

    #[test]
    fn unmatched_email_diagnostic_keeps_attendees_without_emails() {
        let events = vec![event(
            "Maths",
            vec![
                Attendee::just_self(),
                Attendee::with_email("unknown@x.com", false),
            ],
        )];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        let skip = &assembly.skips[0];
        assert_eq!(skip.reason, SkipReason::UnmatchedEmail);
        // An email-less attendee still shows up, as a placeholder.
        assert_eq!(skip.attendees, vec!["(no email)", "unknown@x.com"]);
    }

    #[test]
    fn title_name_without_roster_entry_is_roster_entry_missing() {
        // Not unmatched-email: the categories must never be conflated.
        let events = vec![event("Tutoring Carol White", vec![])];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert!(assembly.lessons.is_empty());
        assert_eq!(assembly.skips.len(), 1);
        assert_eq!(assembly.skips[0].reason, SkipReason::RosterEntryMissing);
        assert_eq!(assembly.skips[0].student.as_deref(), Some("Carol White"));
        assert_eq!(assembly.missing_students(), vec!["Carol White"]);
    }

    #[test]
    fn agency_billed_events_never_produce_lessons() {
        let events = vec![event("PMT - Alice Smith", vec![])];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert!(assembly.lessons.is_empty());
        assert_eq!(assembly.skips[0].reason, SkipReason::AgencyBilled);
        assert!(assembly.skips[0].reason.is_informational());
    }

    #[test]
    fn empty_title_skips_before_classification() {
        // Never reaches the title rules and never shows up as an email
        // diagnostic, even with attendees present.
        let events = vec![event(
            "",
            vec![Attendee::with_email("unknown@x.com", false)],
        )];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert!(assembly.lessons.is_empty());
        assert_eq!(assembly.skips[0].reason, SkipReason::NoTitle);
        assert!(assembly.skips[0].attendees.is_empty());
    }

    #[test]
    fn unparseable_blue_education_title() {
        let events = vec![event("BAC Oscar Sun", vec![])];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert_eq!(assembly.skips[0].reason, SkipReason::UnparseableTitle);
    }

    #[test]
    fn unrecognized_title_format() {
        let events = vec![event("Dentist appointment", vec![])];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert_eq!(assembly.skips[0].reason, SkipReason::UnrecognizedFormat);
    }

    #[test]
    fn allow_list_filters_silently() {
        let events = vec![
            event("Tutoring Alice Smith", vec![]),
            event("Oscar Sun BAC", vec![]),
            event("Tutoring Bob Jones", vec![]),
        ];
        let filter = vec!["Alice Smith".to_string()];

        let assembly = assemble_lessons(&events, &roster(), &filter);

        assert_eq!(assembly.lessons.len(), 1);
        assert_eq!(assembly.lessons[0].student, "Alice Smith");
        // Bob Jones and Oscar Sun get filtered-out notes, never warnings.
        for skip in &assembly.skips {
            assert_eq!(skip.reason, SkipReason::FilteredOut);
            assert!(skip.reason.is_informational());
        }
    }

    #[test]
    fn filter_is_checked_before_roster_lookup() {
        // An off-roster name excluded by the filter is filtered-out, not
        // roster-entry-missing; the caller asked for it to be ignored.
        let events = vec![event("Tutoring Carol White", vec![])];
        let filter = vec!["Alice Smith".to_string()];

        let assembly = assemble_lessons(&events, &roster(), &filter);

        assert_eq!(assembly.skips[0].reason, SkipReason::FilteredOut);
    }

    #[test]
    fn end_not_after_start_is_a_fault_not_a_skip() {
        let mut bad = event("Tutoring Alice Smith", vec![]);
        bad.end = bad.start;
        let events = vec![bad, event("Tutoring Bob Jones", vec![])];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        // The fault does not abort the batch.
        assert_eq!(assembly.faults.len(), 1);
        assert!(assembly.skips.is_empty());
        assert_eq!(assembly.lessons.len(), 1);
        assert_eq!(assembly.lessons[0].student, "Bob Jones");
    }

    #[test]
    fn output_preserves_input_order() {
        let events = vec![
            event("Tutoring Bob Jones", vec![]),
            event("Tutoring Alice Smith", vec![]),
        ];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        let students: Vec<_> = assembly
            .lessons
            .iter()
            .map(|lesson| lesson.student.as_str())
            .collect();
        assert_eq!(students, vec!["Bob Jones", "Alice Smith"]);
    }

    #[test]
    fn assembly_is_idempotent() {
        let events = vec![
            event("Tutoring Alice Smith", vec![]),
            event("PMT session", vec![]),
            event("Tutoring Carol White", vec![]),
            event("Maths", vec![Attendee::with_email("nobody@x.com", false)]),
        ];
        let roster = roster();

        let first = assemble_lessons(&events, &roster, &[]);
        let second = assemble_lessons(&events, &roster, &[]);

        assert_eq!(first, second);
    }

    #[test]
    fn skip_counts_group_by_reason() {
        let events = vec![
            event("", vec![]),
            event("", vec![]),
            event("PMT session", vec![]),
            event("Dentist", vec![]),
        ];

        let assembly = assemble_lessons(&events, &roster(), &[]);
        let counts = assembly.skip_counts();

        assert_eq!(counts[&SkipReason::NoTitle], 2);
        assert_eq!(counts[&SkipReason::AgencyBilled], 1);
        assert_eq!(counts[&SkipReason::UnrecognizedFormat], 1);
        assert!(!counts.contains_key(&SkipReason::UnmatchedEmail));
    }

    #[test]
    fn missing_students_deduplicates_in_first_seen_order() {
        let events = vec![
            event("Tutoring Carol White", vec![]),
            event("Tutoring Dan Green", vec![]),
            event("Tutoring Carol White", vec![]),
        ];

        let assembly = assemble_lessons(&events, &roster(), &[]);

        assert_eq!(assembly.missing_students(), vec!["Carol White", "Dan Green"]);
    }
}

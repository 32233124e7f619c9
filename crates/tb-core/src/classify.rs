//! Calendar event classification and student name extraction.
//!
//! Maps an event's title and attendee list to a category and, where the title
//! itself carries it, a student name. Rule order is fixed and significant: a
//! real external attendee is strong positive evidence and outranks every
//! title heuristic, since the marker substrings could coincidentally appear
//! in attendee-driven events too.

use crate::event::Attendee;

/// Marker for sessions invoiced by the Physics and Maths Tutor agency.
pub const PMT_MARKER: &str = "PMT";
/// Marker for Blue Education sessions.
pub const BAC_MARKER: &str = "BAC";
/// Title prefix for in-person sessions.
pub const TUTORING_PREFIX: &str = "Tutoring ";

/// Which title convention matched a [`Classification::TitlePattern`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    /// "FirstName LastName BAC [details]"
    BlueEducation,
    /// "Tutoring StudentName"
    InPerson,
}

/// Outcome of classifying a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// At least one attendee besides the operator. The student is resolved
    /// via roster email matching, which the classifier does not own.
    Email,
    /// Agency-billed session. Must never produce a lesson.
    AgencyBilled,
    /// A recognized title convention. `name` is `None` when extraction
    /// failed on a malformed title.
    TitlePattern {
        kind: TitleKind,
        name: Option<String>,
    },
    /// No known convention matched.
    Unrecognized,
}

/// Classifies an event by its title and attendee list.
///
/// Rules are evaluated in this fixed order, first match wins:
/// 1. any non-self attendee => [`Classification::Email`]
/// 2. title contains `"PMT"` => [`Classification::AgencyBilled`]
/// 3. title contains `"BAC"` => Blue Education title pattern
/// 4. title starts with `"Tutoring "` => in-person title pattern
/// 5. otherwise [`Classification::Unrecognized`]
///
/// The marker checks are substring-anywhere and case-sensitive. That is
/// fragile but load-bearing: real-world titles rely on these exact
/// semantics, and word-boundary matching would silently reclassify events.
#[must_use]
pub fn classify(title: &str, attendees: &[Attendee]) -> Classification {
    let just_me = attendees.iter().all(|attendee| attendee.is_self);

    if !just_me {
        return Classification::Email;
    }

    if title.contains(PMT_MARKER) {
        return Classification::AgencyBilled;
    }

    if title.contains(BAC_MARKER) {
        return Classification::TitlePattern {
            kind: TitleKind::BlueEducation,
            name: extract_blue_education_name(title),
        };
    }

    if title.starts_with(TUTORING_PREFIX) {
        return Classification::TitlePattern {
            kind: TitleKind::InPerson,
            name: extract_in_person_name(title),
        };
    }

    Classification::Unrecognized
}

/// Extracts the student name from a Blue Education title.
///
/// Titles follow "FirstName LastName BAC [details]": the name is the two
/// whitespace-separated tokens immediately before the standalone `BAC`
/// token. Returns `None` when the marker is not a standalone token or when
/// fewer than two tokens precede it; a failed extraction is preferable to a
/// guessed name.
#[must_use]
pub fn extract_blue_education_name(title: &str) -> Option<String> {
    let parts: Vec<&str> = title.split_whitespace().collect();
    let bac_index = parts.iter().position(|part| *part == BAC_MARKER)?;
    if bac_index < 2 {
        return None;
    }
    Some(format!("{} {}", parts[bac_index - 2], parts[bac_index - 1]))
}

/// Extracts the student name from an in-person tutoring title.
///
/// Only the leading `"Tutoring "` prefix is consumed; any later occurrence
/// of the word is part of the student's name and preserved verbatim. The
/// remainder is trimmed but internal whitespace is kept as-is.
#[must_use]
pub fn extract_in_person_name(title: &str) -> Option<String> {
    let name = title.strip_prefix(TUTORING_PREFIX)?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(email: &str) -> Attendee {
        Attendee::with_email(email, false)
    }

    #[test]
    fn non_self_attendee_beats_every_title_rule() {
        // Rule 1 precedence: title content is irrelevant once a real
        // external participant is present.
        for title in ["PMT - John", "Oscar Sun BAC Maths", "Tutoring Alice", "random"] {
            let attendees = vec![Attendee::just_self(), external("x@example.com")];
            assert_eq!(classify(title, &attendees), Classification::Email, "{title}");
        }
    }

    #[test]
    fn all_self_attendees_fall_through_to_title_rules() {
        let attendees = vec![Attendee::just_self()];
        assert_eq!(
            classify("PMT - John", &attendees),
            Classification::AgencyBilled
        );
    }

    #[test]
    fn empty_attendee_list_counts_as_just_me() {
        assert_eq!(classify("PMT session", &[]), Classification::AgencyBilled);
    }

    #[test]
    fn pmt_matches_anywhere_in_title() {
        assert_eq!(
            classify("Session PMT rescheduled", &[]),
            Classification::AgencyBilled
        );
    }

    #[test]
    fn pmt_is_case_sensitive() {
        assert_eq!(classify("pmt session", &[]), Classification::Unrecognized);
    }

    #[test]
    fn pmt_beats_bac_when_both_present() {
        assert_eq!(
            classify("Oscar Sun BAC PMT", &[]),
            Classification::AgencyBilled
        );
    }

    #[test]
    fn blue_education_name_before_marker() {
        assert_eq!(
            classify("Oscar Sun BAC Maths Tutoring", &[]),
            Classification::TitlePattern {
                kind: TitleKind::BlueEducation,
                name: Some("Oscar Sun".into()),
            }
        );
    }

    #[test]
    fn blue_education_too_few_tokens_fails_extraction() {
        // No guessing: marker-first and one-token titles extract nothing.
        assert_eq!(extract_blue_education_name("BAC Oscar Sun"), None);
        assert_eq!(extract_blue_education_name("Oscar BAC"), None);
    }

    #[test]
    fn bac_substring_without_standalone_token_fails_extraction() {
        // "BACKUP" triggers the substring classification rule but is not a
        // standalone token, so extraction fails rather than guessing.
        assert_eq!(
            classify("Weekly BACKUP call", &[]),
            Classification::TitlePattern {
                kind: TitleKind::BlueEducation,
                name: None,
            }
        );
    }

    #[test]
    fn in_person_name_is_remainder_after_prefix() {
        assert_eq!(
            classify("Tutoring Alice Johnson", &[]),
            Classification::TitlePattern {
                kind: TitleKind::InPerson,
                name: Some("Alice Johnson".into()),
            }
        );
    }

    #[test]
    fn in_person_only_first_prefix_consumed() {
        assert_eq!(
            extract_in_person_name("Tutoring Alice Johnson Smith"),
            Some("Alice Johnson Smith".into())
        );
        assert_eq!(
            extract_in_person_name("Tutoring Tutoring Club"),
            Some("Tutoring Club".into())
        );
    }

    #[test]
    fn in_person_name_is_trimmed_not_collapsed() {
        assert_eq!(extract_in_person_name("Tutoring   Bob  "), Some("Bob".into()));
        assert_eq!(
            extract_in_person_name("Tutoring  Mary  Jane "),
            Some("Mary  Jane".into())
        );
    }

    #[test]
    fn in_person_empty_remainder_fails_extraction() {
        assert_eq!(extract_in_person_name("Tutoring   "), None);
    }

    #[test]
    fn tutoring_must_be_a_prefix() {
        assert_eq!(
            classify("Weekly Tutoring Alice", &[]),
            Classification::Unrecognized
        );
    }

    #[test]
    fn unknown_title_is_unrecognized() {
        assert_eq!(classify("Dentist", &[]), Classification::Unrecognized);
    }
}

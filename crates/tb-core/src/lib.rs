//! Core domain logic for tutorbill.
//!
//! This crate reconciles calendar events against the client roster:
//! - Classification: mapping event titles and attendee lists to categories
//! - Name extraction: per-category parsing of student names
//! - Assembly: producing billable lesson records, with an auditable skip
//!   diagnostic for every event that cannot be billed

pub mod assemble;
pub mod classify;
pub mod event;
pub mod roster;

pub use assemble::{Assembly, Fault, Lesson, Skip, SkipReason, assemble_lessons};
pub use classify::{
    Classification, TitleKind, classify, extract_blue_education_name, extract_in_person_name,
};
pub use event::{Attendee, RawEvent};
pub use roster::{Roster, RosterEntry};

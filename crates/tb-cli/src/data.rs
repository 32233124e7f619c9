//! Loading and validation of the operator's JSON data files.
//!
//! Everything downstream assumes these records are well-formed, so this is
//! the one place that validates them. Validation failures are typed and name
//! the offending file and field.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use tb_calendar::AuthorizedUser;
use tb_core::{RawEvent, Roster, RosterEntry};

/// Client roster file, mapping student names to billing metadata.
pub const STUDENTS_FILE: &str = "students.json";
/// Payment details shown on invoices.
pub const BANK_DETAILS_FILE: &str = "bank_details.json";
/// Operator contact details shown on invoices.
pub const CONTACT_DETAILS_FILE: &str = "contact_details.json";
/// Stored OAuth token for the calendar API.
pub const TOKEN_FILE: &str = "token.json";

/// Placeholder in payment link and QR URLs, replaced with the amount owed.
pub const AMOUNT_PLACEHOLDER: &str = "amt";

static SORT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{2}-\d{2}$").unwrap());
static ACCOUNT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4} \d{4}$").unwrap());
static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d ]{10,}$").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

/// Data file loading/validation errors.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} has invalid format: {message}")]
    Invalid { path: PathBuf, message: String },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let body = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(path: &Path, message: impl Into<String>) -> DataError {
    DataError::Invalid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

#[derive(Debug, Deserialize)]
struct StudentRecord {
    client_type: String,
    rate: f64,
    #[serde(default)]
    emails: Vec<String>,
}

/// Loads and validates the roster from `students.json`.
///
/// The file maps student names to records. Rates must be positive and
/// emails well-formed; the email list may be empty for clients only ever
/// matched by title.
pub fn load_roster(data_dir: &Path) -> Result<Roster, DataError> {
    let path = data_dir.join(STUDENTS_FILE);
    let records: BTreeMap<String, StudentRecord> = read_json(&path)?;

    let mut entries = Vec::with_capacity(records.len());
    for (name, record) in records {
        if name.trim().is_empty() {
            return Err(invalid(&path, "student names cannot be empty"));
        }
        if record.client_type.is_empty() {
            return Err(invalid(&path, format!("{name}: client_type cannot be empty")));
        }
        if record.rate <= 0.0 || !record.rate.is_finite() {
            return Err(invalid(
                &path,
                format!("{name}: rate must be positive, got {}", record.rate),
            ));
        }
        for email in &record.emails {
            if !EMAIL_RE.is_match(email) {
                return Err(invalid(&path, format!("{name}: malformed email {email:?}")));
            }
        }
        entries.push(RosterEntry {
            name,
            client_type: record.client_type,
            rate: record.rate,
            emails: record.emails,
        });
    }

    tracing::info!(students = entries.len(), path = %path.display(), "loaded roster");
    Ok(Roster::new(entries))
}

/// Payment details rendered on invoices.
#[derive(Debug, Clone, Deserialize)]
pub struct BankDetails {
    /// Account holder name.
    pub name: String,
    /// Format: XX-XX-XX.
    pub sort_code: String,
    /// Format: XXXX XXXX.
    pub account_number: String,
    /// Bank name.
    pub bank: String,
    /// Payment link URL containing the `amt` placeholder.
    pub link: String,
    /// QR code image URL containing the `amt` placeholder.
    #[serde(rename = "QR_code")]
    pub qr_code: String,
}

/// Loads and validates `bank_details.json`.
pub fn load_bank_details(data_dir: &Path) -> Result<BankDetails, DataError> {
    let path = data_dir.join(BANK_DETAILS_FILE);
    let details: BankDetails = read_json(&path)?;

    if details.name.is_empty() || details.bank.is_empty() {
        return Err(invalid(&path, "name and bank cannot be empty"));
    }
    if !SORT_CODE_RE.is_match(&details.sort_code) {
        return Err(invalid(
            &path,
            format!("sort_code must match XX-XX-XX, got {:?}", details.sort_code),
        ));
    }
    if !ACCOUNT_NUMBER_RE.is_match(&details.account_number) {
        return Err(invalid(
            &path,
            format!(
                "account_number must match 'XXXX XXXX', got {:?}",
                details.account_number
            ),
        ));
    }
    for (field, value) in [("link", &details.link), ("QR_code", &details.qr_code)] {
        if !value.contains(AMOUNT_PLACEHOLDER) {
            return Err(invalid(
                &path,
                format!("{field} must contain the {AMOUNT_PLACEHOLDER:?} placeholder"),
            ));
        }
    }

    Ok(details)
}

/// Operator contact details rendered on invoices.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactDetails {
    pub mobile: String,
    pub email: String,
}

/// Loads and validates `contact_details.json`.
pub fn load_contact_details(data_dir: &Path) -> Result<ContactDetails, DataError> {
    let path = data_dir.join(CONTACT_DETAILS_FILE);
    let details: ContactDetails = read_json(&path)?;

    if !MOBILE_RE.is_match(&details.mobile) {
        return Err(invalid(
            &path,
            format!("mobile must be at least 10 digits/spaces, got {:?}", details.mobile),
        ));
    }
    if !EMAIL_RE.is_match(&details.email) {
        return Err(invalid(&path, format!("malformed email {:?}", details.email)));
    }

    Ok(details)
}

/// Loads events from a JSON file (an array of raw event records), as an
/// offline alternative to the calendar API.
pub fn load_events_file(path: &Path) -> Result<Vec<RawEvent>, DataError> {
    let events: Vec<RawEvent> = read_json(path)?;
    tracing::info!(events = events.len(), path = %path.display(), "loaded events file");
    Ok(events)
}

/// Loads the stored OAuth token from `token.json`.
pub fn load_token(data_dir: &Path) -> Result<AuthorizedUser, DataError> {
    read_json(&data_dir.join(TOKEN_FILE))
}

/// Persists a refreshed OAuth token back to `token.json`.
pub fn save_token(data_dir: &Path, auth: &AuthorizedUser) -> Result<(), DataError> {
    let path = data_dir.join(TOKEN_FILE);
    let body = serde_json::to_string_pretty(auth).map_err(|source| DataError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, body).map_err(|source| DataError::Io { path, source })
}

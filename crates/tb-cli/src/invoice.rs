//! Invoice rendering.
//!
//! Groups lessons by student, computes totals, and renders printable HTML
//! invoices: one file per private client, plus one combined file per agency
//! with each student's sessions on their own page.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};

use tb_core::Lesson;

use crate::data::{AMOUNT_PLACEHOLDER, BankDetails, ContactDetails};
use crate::dates::last_day_of_month;

/// Clients billed directly rather than through an agency.
pub const PRIVATE_CLIENT_TYPE: &str = "private";

/// The sessions kept for one student over the period, in input order.
#[derive(Debug)]
pub struct StudentInvoice<'a> {
    pub student: &'a str,
    pub client_type: &'a str,
    /// Hourly rate in GBP, denormalized onto every lesson at assembly time.
    pub rate: f64,
    pub lessons: Vec<&'a Lesson>,
}

impl StudentInvoice<'_> {
    /// Total tutoring time across the period.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.lessons
            .iter()
            .fold(Duration::zero(), |sum, lesson| sum + (lesson.end - lesson.start))
    }

    /// Amount owed in GBP.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "session seconds fit in f64 exactly")]
    pub fn total_charge(&self) -> f64 {
        let hours = self.total_duration().num_seconds() as f64 / 3600.0;
        hours * self.rate
    }
}

/// Groups lessons by student, preserving first-appearance order.
#[must_use]
pub fn group_by_student(lessons: &[Lesson]) -> Vec<StudentInvoice<'_>> {
    let mut invoices: Vec<StudentInvoice<'_>> = Vec::new();
    for lesson in lessons {
        match invoices
            .iter_mut()
            .find(|invoice| invoice.student == lesson.student)
        {
            Some(invoice) => invoice.lessons.push(lesson),
            None => invoices.push(StudentInvoice {
                student: &lesson.student,
                client_type: &lesson.client_type,
                rate: lesson.rate,
                lessons: vec![lesson],
            }),
        }
    }
    invoices
}

/// The period string shown in the invoice title.
///
/// An exact full month reads as "June 2024"; anything else as
/// "dd/mm/yyyy to dd/mm/yyyy", which suits short bursts of tutoring and
/// tax-year spans alike.
#[must_use]
pub fn invoice_period(start: NaiveDate, end: NaiveDate) -> String {
    if start.day() == 1 && end == last_day_of_month(start) {
        start.format("%B %Y").to_string()
    } else {
        format!("{} to {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y"))
    }
}

/// DD/MM/YYYY.
#[must_use]
pub fn format_british_date(dt: &DateTime<Local>) -> String {
    dt.format("%d/%m/%Y").to_string()
}

/// 24-hour wall-clock time, e.g. "15:00".
#[must_use]
pub fn format_24h_time(dt: &DateTime<Local>) -> String {
    dt.format("%H:%M").to_string()
}

/// Human-readable interval, e.g. "1 hour 30 mins".
#[must_use]
pub fn format_hours_minutes(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let hour_str = if hours == 1 { "hour" } else { "hours" };
    let minute_str = if minutes == 1 { "minute" } else { "mins" };

    match (hours, minutes) {
        (0, 0) => "0 hours".to_string(),
        (_, 0) => format!("{hours} {hour_str}"),
        (0, _) => format!("{minutes} {minute_str}"),
        _ => format!("{hours} {hour_str} {minutes} {minute_str}"),
    }
}

/// £x,xxx.xx.
#[must_use]
#[expect(clippy::cast_possible_truncation, reason = "invoice totals are far below i64 pence")]
pub fn format_currency(amount: f64) -> String {
    let total_pence = (amount * 100.0).round() as i64;
    let pounds = (total_pence / 100).to_string();
    let pence = total_pence % 100;

    let mut grouped = String::with_capacity(pounds.len() + pounds.len() / 3);
    for (i, ch) in pounds.chars().enumerate() {
        if i > 0 && (pounds.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("£{grouped}.{pence:02}")
}

/// Output filename for a client or agency invoice.
#[must_use]
pub fn invoice_filename(name: &str) -> String {
    format!("{}-invoice.html", name.to_lowercase().replace(' ', "-"))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the invoice body for one student as a container div.
#[must_use]
pub fn render_page(
    invoice: &StudentInvoice<'_>,
    period: &str,
    bank: &BankDetails,
    contact: &ContactDetails,
) -> String {
    let charge = invoice.total_charge();
    // Payment link and QR URL carry the amount owed: pounds in the link,
    // integer pence in the QR.
    #[expect(clippy::cast_possible_truncation, reason = "invoice totals are far below i64 pence")]
    let pence = (charge * 100.0).round() as i64;
    let link = bank.link.replace(AMOUNT_PLACEHOLDER, &format!("{charge:.2}"));
    let qr_code = bank.qr_code.replace(AMOUNT_PLACEHOLDER, &pence.to_string());

    let mut page = String::new();
    writeln!(page, "<div class=\"container\">").unwrap();
    writeln!(page, "  <h1>Invoice: {}</h1>", escape_html(invoice.student)).unwrap();
    writeln!(page, "  <p class=\"period\">{}</p>", escape_html(period)).unwrap();
    writeln!(page, "  <table class=\"sessions\">").unwrap();
    writeln!(
        page,
        "    <tr><th>Date</th><th>Start</th><th>End</th><th>Length</th></tr>"
    )
    .unwrap();
    for lesson in &invoice.lessons {
        let start = lesson.start.with_timezone(&Local);
        let end = lesson.end.with_timezone(&Local);
        writeln!(
            page,
            "    <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            format_british_date(&start),
            format_24h_time(&start),
            format_24h_time(&end),
            format_hours_minutes(lesson.end - lesson.start),
        )
        .unwrap();
    }
    writeln!(page, "  </table>").unwrap();
    writeln!(
        page,
        "  <p>Total: {} at {}/hour</p>",
        format_hours_minutes(invoice.total_duration()),
        format_currency(invoice.rate),
    )
    .unwrap();
    writeln!(
        page,
        "  <p class=\"total\">Amount owed: {}</p>",
        format_currency(charge)
    )
    .unwrap();
    writeln!(page, "  <div class=\"payment\">").unwrap();
    writeln!(
        page,
        "    <p>{} &middot; {} &middot; {}</p>",
        escape_html(&bank.name),
        escape_html(&bank.sort_code),
        escape_html(&bank.account_number),
    )
    .unwrap();
    writeln!(page, "    <p>{}</p>", escape_html(&bank.bank)).unwrap();
    writeln!(
        page,
        "    <p><a href=\"{}\">Pay online</a></p>",
        escape_html(&link)
    )
    .unwrap();
    writeln!(
        page,
        "    <img src=\"{}\" alt=\"payment QR code\">",
        escape_html(&qr_code)
    )
    .unwrap();
    writeln!(
        page,
        "    <p>{} &middot; {}</p>",
        escape_html(&contact.mobile),
        escape_html(&contact.email),
    )
    .unwrap();
    writeln!(page, "  </div>").unwrap();
    writeln!(page, "</div>").unwrap();
    page
}

fn render_document(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head lang=\"en\">\n\
         <meta charset=\"UTF-8\">\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         table.sessions {{ border-collapse: collapse; }}\n\
         table.sessions td, table.sessions th {{ padding: 0.3em 1em; border: 1px solid #ccc; }}\n\
         .total {{ font-weight: bold; }}\n\
         .page-break {{ page-break-after: always; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         {content}\n\
         </body>\n\
         </html>\n"
    )
}

/// Writes one invoice per private client and one combined invoice per
/// agency. Returns the paths written, private clients first.
pub fn write_invoices(
    output_dir: &Path,
    lessons: &[Lesson],
    period: &str,
    bank: &BankDetails,
    contact: &ContactDetails,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    // Agency pages keyed by agency name, in first-appearance order.
    let mut agency_pages: Vec<(String, Vec<String>)> = Vec::new();

    for invoice in group_by_student(lessons) {
        let page = render_page(&invoice, period, bank, contact);
        if invoice.client_type == PRIVATE_CLIENT_TYPE {
            let path = output_dir.join(invoice_filename(invoice.student));
            fs::write(&path, render_document(&page))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(student = invoice.student, "generated invoice");
            written.push(path);
        } else {
            match agency_pages
                .iter_mut()
                .find(|(agency, _)| agency == invoice.client_type)
            {
                Some((_, pages)) => pages.push(page),
                None => agency_pages.push((invoice.client_type.to_string(), vec![page])),
            }
        }
    }

    for (agency, pages) in agency_pages {
        let body = pages.join("<div class=\"page-break\"></div>\n");
        let path = output_dir.join(invoice_filename(&agency));
        fs::write(&path, render_document(&body))
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(agency, "generated combined invoice");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lesson(student: &str, client_type: &str, rate: f64, hour: u32, minutes: i64) -> Lesson {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap();
        Lesson {
            student: student.into(),
            start,
            end: start + Duration::minutes(minutes),
            rate,
            client_type: client_type.into(),
        }
    }

    #[test]
    fn period_for_exact_full_month() {
        assert_eq!(invoice_period(date(2024, 6, 1), date(2024, 6, 30)), "June 2024");
    }

    #[test]
    fn period_for_partial_month() {
        assert_eq!(
            invoice_period(date(2024, 6, 1), date(2024, 6, 15)),
            "01/06/2024 to 15/06/2024"
        );
    }

    #[test]
    fn period_spanning_months_is_a_range() {
        // 31 March is the last day of a month, but not of the start month.
        assert_eq!(
            invoice_period(date(2024, 1, 1), date(2024, 3, 31)),
            "01/01/2024 to 31/03/2024"
        );
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(50.0), "£50.00");
        assert_eq!(format_currency(1234.5), "£1,234.50");
        assert_eq!(format_currency(1_000_000.0), "£1,000,000.00");
        assert_eq!(format_currency(0.005), "£0.01");
    }

    #[test]
    fn hours_minutes_formatting() {
        assert_eq!(format_hours_minutes(Duration::minutes(60)), "1 hour");
        assert_eq!(format_hours_minutes(Duration::minutes(120)), "2 hours");
        assert_eq!(format_hours_minutes(Duration::minutes(45)), "45 mins");
        assert_eq!(format_hours_minutes(Duration::minutes(1)), "1 minute");
        assert_eq!(format_hours_minutes(Duration::minutes(90)), "1 hour 30 mins");
        assert_eq!(format_hours_minutes(Duration::zero()), "0 hours");
    }

    #[test]
    fn grouping_preserves_first_appearance_order() {
        let lessons = vec![
            lesson("Bob Jones", "private", 40.0, 9, 60),
            lesson("Alice Smith", "private", 50.0, 10, 60),
            lesson("Bob Jones", "private", 40.0, 14, 30),
        ];

        let invoices = group_by_student(&lessons);
        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].student, "Bob Jones");
        assert_eq!(invoices[0].lessons.len(), 2);
        assert_eq!(invoices[0].total_duration(), Duration::minutes(90));
        assert!((invoices[0].total_charge() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn filenames_are_lowercase_dashed() {
        assert_eq!(invoice_filename("Alice Smith"), "alice-smith-invoice.html");
        assert_eq!(invoice_filename("Blue Education"), "blue-education-invoice.html");
    }

    fn bank() -> BankDetails {
        BankDetails {
            name: "A Tutor".into(),
            sort_code: "12-34-56".into(),
            account_number: "1234 5678".into(),
            bank: "Example Bank".into(),
            link: "https://pay.example.com?amount=amt".into(),
            qr_code: "https://qr.example.com/amt.png".into(),
        }
    }

    fn contact() -> ContactDetails {
        ContactDetails {
            mobile: "07123 456789".into(),
            email: "tutor@example.com".into(),
        }
    }

    #[test]
    fn page_substitutes_amount_into_payment_urls() {
        let lessons = vec![lesson("Alice Smith", "private", 50.0, 10, 90)];
        let invoices = group_by_student(&lessons);

        let page = render_page(&invoices[0], "June 2025", &bank(), &contact());

        // 1.5 hours at £50: pounds in the link, pence in the QR.
        assert!(page.contains("https://pay.example.com?amount=75.00"));
        assert!(page.contains("https://qr.example.com/7500.png"));
        assert!(page.contains("Amount owed: £75.00"));
        assert!(!page.contains(">amt<"));
    }

    #[test]
    fn page_escapes_html_in_names() {
        let lessons = vec![lesson("Alice <Smith>", "private", 50.0, 10, 60)];
        let invoices = group_by_student(&lessons);

        let page = render_page(&invoices[0], "June 2025", &bank(), &contact());
        assert!(page.contains("Alice &lt;Smith&gt;"));
        assert!(!page.contains("<Smith>"));
    }

    #[test]
    fn write_invoices_splits_private_and_agency() {
        let dir = tempfile::tempdir().unwrap();
        let lessons = vec![
            lesson("Alice Smith", "private", 50.0, 10, 60),
            lesson("Oscar Sun", "Blue Education", 40.0, 12, 60),
            lesson("Mia Chen", "Blue Education", 40.0, 14, 60),
        ];

        let written =
            write_invoices(dir.path(), &lessons, "June 2025", &bank(), &contact()).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["alice-smith-invoice.html", "blue-education-invoice.html"]
        );

        // Both agency students share one document, split by page breaks.
        let combined = fs::read_to_string(dir.path().join("blue-education-invoice.html")).unwrap();
        assert!(combined.contains("Oscar Sun"));
        assert!(combined.contains("Mia Chen"));
        assert!(combined.contains("page-break"));
    }
}

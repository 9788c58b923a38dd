//! Metadata extraction: read the document-information dictionary through a
//! [`DocumentHandle`] and normalise it into a [`DocumentMetadata`] record.
//!
//! Each field defaults independently. PDF dates (`D:20240131120000+01'00'`)
//! are rewritten as RFC 3339; anything that does not parse is kept as-is.

use crate::output::{DocumentMetadata, NONE, UNKNOWN};
use crate::pipeline::reader::{DocumentHandle, InfoField};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

static PDF_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(?:(Z)|([+-])(\d{2})'?(\d{2})?'?)?$",
    )
    .expect("valid regex")
});

/// Build the metadata record for `filename` from an open document.
pub fn extract(handle: &dyn DocumentHandle, filename: &str) -> DocumentMetadata {
    let text = |field, default: &str| handle.info(field).unwrap_or_else(|| default.to_string());
    let date = |field| {
        handle
            .info(field)
            .map(|raw| normalize_pdf_date(&raw))
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    DocumentMetadata {
        filename: filename.to_string(),
        title: text(InfoField::Title, UNKNOWN),
        author: text(InfoField::Author, UNKNOWN),
        subject: text(InfoField::Subject, NONE),
        keywords: text(InfoField::Keywords, NONE),
        creation_date: date(InfoField::CreationDate),
        modification_date: date(InfoField::ModificationDate),
        producer: text(InfoField::Producer, UNKNOWN),
    }
}

/// Convert a PDF date string to RFC 3339. Returns the input unchanged when it
/// is not a valid PDF date.
pub fn normalize_pdf_date(raw: &str) -> String {
    parse_pdf_date(raw.trim())
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_pdf_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let caps = PDF_DATE.captures(raw)?;
    let num = |i: usize, default: u32| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2, 1)?, num(3, 1)?)?;
    let time = NaiveTime::from_hms_opt(num(4, 0)?, num(5, 0)?, num(6, 0)?)?;
    let naive = NaiveDateTime::new(date, time);

    let offset_secs = match caps.get(8) {
        Some(sign) => {
            let secs = (num(9, 0)? * 3600 + num(10, 0)? * 60) as i32;
            if sign.as_str() == "-" {
                -secs
            } else {
                secs
            }
        }
        None => 0,
    };
    let offset = FixedOffset::east_opt(offset_secs)?;
    offset.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use image::DynamicImage;
    use std::collections::HashMap;

    struct InfoOnly(HashMap<&'static str, &'static str>);

    impl DocumentHandle for InfoOnly {
        fn page_count(&self) -> usize {
            0
        }
        fn page_text(&self, _index: usize) -> Result<String, PipelineError> {
            Ok(String::new())
        }
        fn page_image(&self, _index: usize) -> Result<DynamicImage, PipelineError> {
            Ok(DynamicImage::new_luma8(1, 1))
        }
        fn info(&self, field: InfoField) -> Option<String> {
            let key = match field {
                InfoField::Title => "title",
                InfoField::Author => "author",
                InfoField::Subject => "subject",
                InfoField::Keywords => "keywords",
                InfoField::Creator => "creator",
                InfoField::Producer => "producer",
                InfoField::CreationDate => "created",
                InfoField::ModificationDate => "modified",
            };
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn every_field_defaults_independently() {
        let handle = InfoOnly(HashMap::from([("author", "Ada"), ("keywords", "tax, 2024")]));
        let m = extract(&handle, "sample.pdf");
        assert_eq!(m.filename, "sample.pdf");
        assert_eq!(m.title, "Unknown");
        assert_eq!(m.author, "Ada");
        assert_eq!(m.subject, "None");
        assert_eq!(m.keywords, "tax, 2024");
        assert_eq!(m.creation_date, "Unknown");
        assert_eq!(m.modification_date, "Unknown");
        assert_eq!(m.producer, "Unknown");
    }

    #[test]
    fn dates_are_normalised() {
        let handle = InfoOnly(HashMap::from([
            ("created", "D:20240131120000+01'00'"),
            ("modified", "yesterday"),
        ]));
        let m = extract(&handle, "a.pdf");
        assert_eq!(m.creation_date, "2024-01-31T12:00:00+01:00");
        assert_eq!(m.modification_date, "yesterday");
    }

    #[test]
    fn pdf_date_variants() {
        assert_eq!(normalize_pdf_date("D:20231105"), "2023-11-05T00:00:00+00:00");
        assert_eq!(normalize_pdf_date("D:20231105083000Z"), "2023-11-05T08:30:00+00:00");
        assert_eq!(
            normalize_pdf_date("D:20231105083000-05'30"),
            "2023-11-05T08:30:00-05:30"
        );
        assert_eq!(normalize_pdf_date("D:2023"), "2023-01-01T00:00:00+00:00");
    }

    #[test]
    fn invalid_dates_are_kept_verbatim() {
        assert_eq!(normalize_pdf_date("D:20231340"), "D:20231340");
        assert_eq!(normalize_pdf_date(""), "");
        assert_eq!(normalize_pdf_date("Tue Mar 5"), "Tue Mar 5");
    }
}

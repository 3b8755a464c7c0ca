//! Template keys.
//!
//! A template identifies one family of prerenderable pages. Parametrised
//! families (post-type archives, date archives) carry a subtype that is folded
//! into the storage type string by [`TemplateKey::storage_type`].

use std::fmt::{self, Display, Formatter};

use super::error::DomainError;

/// Built-in template kinds in registry priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Frontpage,
    PostTypeArchive,
    Term,
    Post,
    Author,
    DateArchive,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frontpage => "frontpage",
            Self::PostTypeArchive => "post_type_archive",
            Self::Term => "term",
            Self::Post => "post",
            Self::Author => "author",
            Self::DateArchive => "date_archive",
        }
    }

    /// All built-in kinds, in the order templates are matched against a
    /// request. First match wins.
    pub fn all() -> &'static [TemplateKind] {
        &[
            Self::Frontpage,
            Self::PostTypeArchive,
            Self::Term,
            Self::Post,
            Self::Author,
            Self::DateArchive,
        ]
    }
}

impl Display for TemplateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template name plus an optional subtype discriminator.
///
/// The storage layer keys entries by a single type string, so parametrised
/// template families encode their subtype into it (`date_archive_202403`,
/// `post_type_archive_product`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub name: String,
    pub subtype: Option<String>,
}

impl TemplateKey {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtype: None,
        }
    }

    pub fn with_subtype(name: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtype: Some(subtype.into()),
        }
    }

    /// The canonical type string stored in the entry table.
    pub fn storage_type(&self) -> String {
        match self.subtype.as_deref() {
            Some(subtype) => format!("{}_{subtype}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A leniently parsed date-archive identifier.
///
/// Accepts `YYYY`, `YYYYMM` and `YYYYMMDD`; missing month/day fields act as
/// wildcards selecting the whole year or month archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateId {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl DateId {
    pub fn of_year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn of_month(year: i32, month: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn of_day(year: i32, month: u8, day: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "date id `{raw}` must be numeric"
            )));
        }

        let digits = |range: std::ops::Range<usize>| -> u32 {
            raw[range].parse().unwrap_or(0)
        };

        let parsed = match raw.len() {
            4 => Self::of_year(digits(0..4) as i32),
            6 => Self::of_month(digits(0..4) as i32, digits(4..6) as u8),
            8 => Self::of_day(digits(0..4) as i32, digits(4..6) as u8, digits(6..8) as u8),
            _ => {
                return Err(DomainError::validation(format!(
                    "date id `{raw}` must be YYYY, YYYYMM or YYYYMMDD"
                )));
            }
        };

        if let Some(month) = parsed.month
            && !(1..=12).contains(&month)
        {
            return Err(DomainError::validation(format!(
                "date id `{raw}` has month {month} out of range"
            )));
        }
        if let Some(day) = parsed.day
            && !(1..=31).contains(&day)
        {
            return Err(DomainError::validation(format!(
                "date id `{raw}` has day {day} out of range"
            )));
        }

        Ok(parsed)
    }

    /// Compact `YYYY[MM[DD]]` form, as used in storage type strings.
    pub fn compact(&self) -> String {
        let mut out = format!("{:04}", self.year);
        if let Some(month) = self.month {
            out.push_str(&format!("{month:02}"));
            if let Some(day) = self.day {
                out.push_str(&format!("{day:02}"));
            }
        }
        out
    }

    /// Numeric mirror of [`DateId::compact`], stored as the entry object id so
    /// distinct dates never collide on a shared key.
    pub fn object_id(&self) -> i64 {
        self.compact().parse().unwrap_or(0)
    }
}

impl Display for DateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_only() {
        let date = DateId::parse("2024").expect("year id");
        assert_eq!(date.year, 2024);
        assert_eq!(date.month, None);
        assert_eq!(date.day, None);
    }

    #[test]
    fn parses_year_and_month() {
        let date = DateId::parse("202403").expect("month id");
        assert_eq!(date.year, 2024);
        assert_eq!(date.month, Some(3));
        assert_eq!(date.day, None);
    }

    #[test]
    fn parses_full_date() {
        let date = DateId::parse("20240315").expect("day id");
        assert_eq!((date.year, date.month, date.day), (2024, Some(3), Some(15)));
    }

    #[test]
    fn rejects_malformed_lengths() {
        assert!(DateId::parse("20245").is_err());
        assert!(DateId::parse("").is_err());
        assert!(DateId::parse("202403151").is_err());
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(DateId::parse("2o24").is_err());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(DateId::parse("202413").is_err());
        assert!(DateId::parse("20240300").is_err());
        assert!(DateId::parse("20240332").is_err());
    }

    #[test]
    fn compact_round_trip() {
        assert_eq!(DateId::of_year(2024).compact(), "2024");
        assert_eq!(DateId::of_month(2024, 3).compact(), "202403");
        assert_eq!(DateId::of_day(2024, 3, 15).compact(), "20240315");
    }

    #[test]
    fn object_id_mirrors_compact_form() {
        assert_eq!(DateId::of_year(2024).object_id(), 2024);
        assert_eq!(DateId::of_day(2024, 3, 15).object_id(), 20240315);
    }

    #[test]
    fn storage_type_folds_subtype_in() {
        assert_eq!(TemplateKey::plain("post").storage_type(), "post");
        assert_eq!(
            TemplateKey::with_subtype("date_archive", "202403").storage_type(),
            "date_archive_202403"
        );
        assert_eq!(
            TemplateKey::with_subtype("post_type_archive", "product").storage_type(),
            "post_type_archive_product"
        );
    }
}

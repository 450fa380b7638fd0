//! Typed source records and field normalization

use super::tabular::Record;
use super::DataFormatError;
use crate::graph::{PropertyMap, PropertyValue};
use regex::Regex;
use std::sync::OnceLock;

/// Cell values that stand for "no value"
const PLACEHOLDERS: [&str; 4] = ["", "nan", "missing", "none"];

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

/// Split a semicolon-joined cell, dropping placeholders
pub fn split_multi(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|v| !is_placeholder(v))
        .map(str::to_string)
        .collect()
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

fn name_punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII punctuation except '.' and '-'
    RE.get_or_init(|| Regex::new(r##"[!"#$%&'()*+,/:;<=>?@\[\\\]^_`{|}~]"##).expect("valid punctuation pattern"))
}

/// Collapse runs of whitespace and trim
pub fn collapse_whitespace(value: &str) -> String {
    whitespace().replace_all(value.trim(), " ").into_owned()
}

/// Keyphrase key form: lower-cased, whitespace collapsed
pub fn normalize_phrase(phrase: &str) -> String {
    collapse_whitespace(&phrase.to_lowercase())
}

/// Person key form: punctuation other than `.` and `-` removed, `-` read as a
/// space, whitespace collapsed. `None` when nothing is left.
pub fn clean_person_name(name: &str) -> Option<String> {
    let stripped = name_punctuation().replace_all(name, "");
    let cleaned = collapse_whitespace(&stripped.replace('-', " "));
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Parse a number that may use a comma as decimal separator.
///
/// When both `.` and `,` appear, the last one is the decimal separator and
/// the other groups thousands: `1.234,5` and `1,234.5` both read 1234.5.
pub fn parse_decimal(field: &str, value: &str) -> Result<f64, DataFormatError> {
    let trimmed = value.trim();
    if is_placeholder(trimmed) {
        return Err(DataFormatError::Placeholder {
            field: field.to_string(),
        });
    }
    let normalized = match (trimmed.rfind('.'), trimmed.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        _ => trimmed.replace(',', "."),
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataFormatError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Parse an integer key. Integral floats such as `"123.0"` are accepted.
pub fn parse_key(field: &str, value: &str) -> Result<i64, DataFormatError> {
    let trimmed = value.trim();
    if is_placeholder(trimmed) {
        return Err(DataFormatError::MissingField {
            field: field.to_string(),
        });
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(DataFormatError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn required<'r>(record: &'r Record, field: &str) -> Result<&'r str, DataFormatError> {
    record.get(field).ok_or_else(|| DataFormatError::MissingField {
        field: field.to_string(),
    })
}

/// Text field: missing columns and placeholders become `None`
fn optional_text(record: &Record, field: &str) -> Option<String> {
    record
        .get(field)
        .filter(|v| !is_placeholder(v))
        .map(|v| v.trim().to_string())
}

/// A row of the projects dump
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRecord {
    pub id: i64,
    pub acronym: Option<String>,
    pub call: Option<String>,
    pub status: Option<String>,
    pub programme: Option<String>,
    pub topics: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub url: Option<String>,
    pub total_cost: Option<f64>,
    pub ec_max_contribution: Option<f64>,
    pub funding_scheme: Option<String>,
    pub coordinator: Option<String>,
    pub participants: Vec<String>,
}

impl ProjectRecord {
    /// Convert a source row. Numeric fields that fail to parse are dropped and
    /// reported alongside the record.
    pub fn from_record(record: &Record) -> Result<(Self, Vec<DataFormatError>), DataFormatError> {
        let id = parse_key("id", required(record, "id")?)?;
        let mut issues = Vec::new();
        let mut decimal = |field: &str| -> Option<f64> {
            let value = record.get(field)?;
            if is_placeholder(value) {
                return None;
            }
            parse_decimal(field, value).map_err(|e| issues.push(e)).ok()
        };
        let total_cost = decimal("totalCost");
        let ec_max_contribution = decimal("ecMaxContribution");

        let project = ProjectRecord {
            id,
            acronym: optional_text(record, "acronym"),
            call: optional_text(record, "call"),
            status: optional_text(record, "status"),
            programme: optional_text(record, "programme"),
            topics: optional_text(record, "topics"),
            start_date: optional_text(record, "startDate"),
            end_date: optional_text(record, "endDate"),
            url: optional_text(record, "projectUrl").or_else(|| optional_text(record, "url")),
            total_cost,
            ec_max_contribution,
            funding_scheme: optional_text(record, "fundingScheme"),
            coordinator: optional_text(record, "coordinator").map(|c| collapse_whitespace(&c)),
            participants: record
                .get("participants")
                .map(split_multi)
                .unwrap_or_default()
                .iter()
                .map(|p| collapse_whitespace(p))
                .collect(),
        };
        Ok((project, issues))
    }

    /// Node properties, key excluded
    pub fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        let texts = [
            ("acronym", &self.acronym),
            ("call", &self.call),
            ("status", &self.status),
            ("programme", &self.programme),
            ("topics", &self.topics),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
            ("url", &self.url),
            ("fundingScheme", &self.funding_scheme),
        ];
        for (name, value) in texts {
            if let Some(v) = value {
                props.insert(name.to_string(), PropertyValue::String(v.clone()));
            }
        }
        if let Some(v) = self.total_cost {
            props.insert("totalCost".to_string(), PropertyValue::Float(v));
        }
        if let Some(v) = self.ec_max_contribution {
            props.insert("ecMaxContribution".to_string(), PropertyValue::Float(v));
        }
        props
    }
}

/// A row of the deliverables dump
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverableRecord {
    pub rcn: i64,
    pub project_id: i64,
    pub title: Option<String>,
    pub project_acronym: Option<String>,
    pub programme: Option<String>,
    pub deliverable_type: Option<String>,
    pub url: Option<String>,
}

impl DeliverableRecord {
    pub fn from_record(record: &Record) -> Result<Self, DataFormatError> {
        Ok(DeliverableRecord {
            rcn: parse_key("rcn", required(record, "rcn")?)?,
            project_id: parse_key("projectID", required(record, "projectID")?)?,
            title: optional_text(record, "title"),
            project_acronym: optional_text(record, "projectAcronym"),
            programme: optional_text(record, "programme"),
            deliverable_type: optional_text(record, "deliverableType"),
            url: optional_text(record, "url"),
        })
    }

    pub fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        let texts = [
            ("title", &self.title),
            ("projectAcronym", &self.project_acronym),
            ("programme", &self.programme),
            ("deliverableType", &self.deliverable_type),
            ("url", &self.url),
        ];
        for (name, value) in texts {
            if let Some(v) = value {
                props.insert(name.to_string(), PropertyValue::String(v.clone()));
            }
        }
        props
    }
}

/// Persons extracted from one deliverable document
#[derive(Debug, Clone, PartialEq)]
pub struct PersonsRecord {
    pub rcn: i64,
    pub persons: Vec<String>,
}

impl PersonsRecord {
    pub fn from_record(record: &Record) -> Result<Self, DataFormatError> {
        let rcn = parse_key("rcn", required(record, "rcn")?)?;
        let mut persons: Vec<String> = Vec::new();
        for name in split_multi(required(record, "persons")?) {
            if let Some(name) = clean_person_name(&name) {
                if !persons.contains(&name) {
                    persons.push(name);
                }
            }
        }
        Ok(PersonsRecord { rcn, persons })
    }
}

/// One row of a keyphrase interchange file: natural key plus phrases
#[derive(Debug, Clone, PartialEq)]
pub struct KeyphraseRecord {
    pub key: i64,
    pub phrases: Vec<String>,
}

impl KeyphraseRecord {
    /// The key is read from `key_field`, falling back to the first column
    pub fn from_record(record: &Record, key_field: &str) -> Result<Self, DataFormatError> {
        let key = match record.get(key_field) {
            Some(v) => v,
            None => record.first().map(|(_, v)| v).ok_or_else(|| DataFormatError::MissingField {
                field: key_field.to_string(),
            })?,
        };
        let mut phrases: Vec<String> = Vec::new();
        for phrase in split_multi(required(record, "keyphrases")?) {
            let phrase = normalize_phrase(&phrase);
            if !phrase.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }
        Ok(KeyphraseRecord {
            key: parse_key(key_field, key)?,
            phrases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert!(is_placeholder(""));
        assert!(is_placeholder(" NaN "));
        assert!(is_placeholder("Missing"));
        assert!(!is_placeholder("ACME"));
        assert_eq!(split_multi("A; nan ;;B;missing"), vec!["A", "B"]);
    }

    #[test]
    fn test_locale_decimals() {
        assert_eq!(parse_decimal("totalCost", "1234,5").unwrap(), 1234.5);
        assert_eq!(parse_decimal("totalCost", " 99 ").unwrap(), 99.0);
        assert_eq!(parse_decimal("totalCost", "1.234,5").unwrap(), 1234.5);
        assert_eq!(parse_decimal("totalCost", "2.500.000,75").unwrap(), 2500000.75);
        assert_eq!(parse_decimal("totalCost", "1,234.5").unwrap(), 1234.5);
        assert!(matches!(
            parse_decimal("totalCost", "12,5,0"),
            Err(DataFormatError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_decimal("totalCost", "nan"),
            Err(DataFormatError::Placeholder { .. })
        ));
    }

    #[test]
    fn test_integer_keys() {
        assert_eq!(parse_key("id", "190123").unwrap(), 190123);
        assert_eq!(parse_key("id", "190123.0").unwrap(), 190123);
        assert!(parse_key("id", "12.5").is_err());
        assert!(matches!(parse_key("id", ""), Err(DataFormatError::MissingField { .. })));
    }

    #[test]
    fn test_phrase_and_name_normalization() {
        assert_eq!(normalize_phrase("  Energy   Storage "), "energy storage");
        assert_eq!(clean_person_name("Jean-Luc  O'Brien,"), Some("Jean Luc OBrien".to_string()));
        assert_eq!(clean_person_name("J. R. R. Tolkien"), Some("J. R. R. Tolkien".to_string()));
        assert_eq!(clean_person_name(" ;; "), None);
    }

    #[test]
    fn test_project_record() {
        let record = Record::new([
            ("id", "42"),
            ("acronym", "GRID"),
            ("status", "nan"),
            ("projectUrl", "https://grid.eu"),
            ("totalCost", "1500,25"),
            ("ecMaxContribution", "abc"),
            ("coordinator", "ACME"),
            ("participants", "ACME;Beta  Labs;missing"),
        ]);
        let (project, issues) = ProjectRecord::from_record(&record).unwrap();
        assert_eq!(project.id, 42);
        assert_eq!(project.status, None);
        assert_eq!(project.url.as_deref(), Some("https://grid.eu"));
        assert_eq!(project.total_cost, Some(1500.25));
        assert_eq!(project.ec_max_contribution, None);
        assert_eq!(project.participants, vec!["ACME", "Beta Labs"]);
        assert_eq!(issues.len(), 1);

        let props = project.properties();
        assert_eq!(props.get("totalCost"), Some(&PropertyValue::Float(1500.25)));
        assert!(!props.contains_key("status"));
    }

    #[test]
    fn test_project_without_id_is_rejected() {
        let record = Record::new([("acronym", "GRID")]);
        assert!(matches!(
            ProjectRecord::from_record(&record),
            Err(DataFormatError::MissingField { .. })
        ));
    }

    #[test]
    fn test_persons_and_keyphrases() {
        let persons = PersonsRecord::from_record(&Record::new([
            ("rcn", "7"),
            ("persons", "Ann Lee;Ann-Lee;Bo Chen;nan"),
        ]))
        .unwrap();
        assert_eq!(persons.persons, vec!["Ann Lee", "Bo Chen"]);

        let keys = KeyphraseRecord::from_record(
            &Record::new([("id", "42"), ("keyphrases", "Energy;energy ; smart  grid")]),
            "id",
        )
        .unwrap();
        assert_eq!(keys.key, 42);
        assert_eq!(keys.phrases, vec!["energy", "smart grid"]);
    }
}

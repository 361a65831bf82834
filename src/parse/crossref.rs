use scraper::Html;
use serde::Deserialize;

use super::squash_whitespace;
use crate::cache::FetchRecord;
use crate::retry::RemoteError;

#[derive(Debug, Deserialize)]
struct WorksEnvelope {
    #[serde(default)]
    message: Option<Work>,
}

/// Crossref returns most text fields as arrays, a few as plain strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    One(String),
    Many(Vec<String>),
}

impl Text {
    fn joined(self) -> String {
        match self {
            Text::One(s) => s,
            Text::Many(parts) => parts.join(" "),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl DateParts {
    fn year_month(&self) -> Option<(i32, Option<u8>)> {
        let first = self.date_parts.first()?;
        let year = i32::try_from((*first.first()?)?).ok()?;
        let month = first
            .get(1)
            .copied()
            .flatten()
            .and_then(|m| u8::try_from(m).ok())
            .filter(|m| (1..=12).contains(m));
        Some((year, month))
    }
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    title: Option<Text>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<Text>,
    #[serde(rename = "published-print", default)]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online", default)]
    published_online: Option<DateParts>,
}

/// Drops markup (JATS tags in abstracts, HTML in titles) and normalizes whitespace.
fn markup_to_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    squash_whitespace(&fragment.root_element().text().collect::<String>())
}

fn non_empty(text: Option<Text>) -> Option<String> {
    text.map(|t| markup_to_text(&t.joined()))
        .filter(|t| !t.is_empty())
}

/// Turns a Crossref `works/{doi}` body into a record.
///
/// A body that is not a works envelope is a [`RemoteError::Validation`]. Missing title,
/// abstract or date keep whatever was found and list the gaps in `error`.
pub fn extract_crossref_work(body: &str) -> Result<FetchRecord, RemoteError> {
    let envelope: WorksEnvelope = serde_json::from_str(body)
        .map_err(|e| RemoteError::validation(format!("malformed Crossref response: {e}")))?;
    let work = envelope
        .message
        .ok_or_else(|| RemoteError::validation("Crossref response has no message"))?;

    let date = work
        .published_print
        .as_ref()
        .and_then(DateParts::year_month)
        .or_else(|| {
            work.published_online
                .as_ref()
                .and_then(DateParts::year_month)
        });

    let mut record = FetchRecord {
        title: non_empty(work.title),
        abstract_text: non_empty(work.abstract_text),
        pub_year: date.map(|(year, _)| year),
        pub_month: date.and_then(|(_, month)| month),
        error: None,
    };

    let missing: Vec<&str> = [
        ("title", record.title.is_none()),
        ("abstract", record.abstract_text.is_none()),
        ("publication date", record.pub_year.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();

    if !missing.is_empty() {
        record.error = Some(format!("missing {}", missing.join(", ")));
    }
    Ok(record)
}

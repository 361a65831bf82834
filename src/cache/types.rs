//! Cache keys and result records.

use rkyv::{Archive, Deserialize, Serialize};

use crate::constants::{SCORE_DECIMALS, SCORE_SUM_TOLERANCE};

/// Composite identity of one unit of remote work.
///
/// Single-identifier phases leave `secondary` empty; paired phases key on
/// `(article title, citing DOI)`.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub primary: String,
    pub secondary: Option<String>,
}

impl CacheKey {
    pub fn single(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
        }
    }

    pub fn pair(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: Some(secondary.into()),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.secondary {
            Some(secondary) => write!(f, "({}, {})", self.primary, secondary),
            None => write!(f, "{}", self.primary),
        }
    }
}

/// Citing DOIs harvested for one article.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct CitationRecord {
    /// DOIs in the order the export listed them; rejected entries are kept as `""`.
    pub dois: Vec<String>,
    pub error: Option<String>,
}

/// DOI and publication date scraped from an article's landing page.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ArticleRecord {
    pub doi: Option<String>,
    pub pub_year: Option<i32>,
    pub pub_month: Option<u8>,
    pub error: Option<String>,
}

/// Bibliographic metadata resolved for one citing work.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct FetchRecord {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub pub_year: Option<i32>,
    pub pub_month: Option<u8>,
    pub error: Option<String>,
}

/// NLI probabilities for one premise/hypothesis pair.
///
/// Each value is in `[0, 1]`, rounded to [`SCORE_DECIMALS`] places, and the three sum to
/// 1 within [`SCORE_SUM_TOLERANCE`].
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord {
    pub contradiction: f32,
    pub neutral: f32,
    pub entailment: f32,
}

impl ScoreRecord {
    /// Validates a raw probability triple and rounds it.
    pub fn from_probabilities(
        contradiction: f32,
        neutral: f32,
        entailment: f32,
    ) -> Result<Self, String> {
        for (label, value) in [
            ("contradiction", contradiction),
            ("neutral", neutral),
            ("entailment", entailment),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{label} probability {value} outside [0, 1]"));
            }
        }

        let sum = contradiction + neutral + entailment;
        if (sum - 1.0).abs() > SCORE_SUM_TOLERANCE {
            return Err(format!("probabilities sum to {sum}, expected 1"));
        }

        Ok(Self {
            contradiction: round_score(contradiction),
            neutral: round_score(neutral),
            entailment: round_score(entailment),
        })
    }

    pub fn sum(&self) -> f32 {
        self.contradiction + self.neutral + self.entailment
    }
}

fn round_score(value: f32) -> f32 {
    let scale = 10f32.powi(SCORE_DECIMALS);
    (value * scale).round() / scale
}

/// One cached result. A record carrying an error marks a terminal failure for that run.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ResultRecord {
    Citations(CitationRecord),
    Article(ArticleRecord),
    Fetch(FetchRecord),
    Score(ScoreRecord),
}

impl ResultRecord {
    pub fn error(&self) -> Option<&str> {
        match self {
            ResultRecord::Citations(r) => r.error.as_deref(),
            ResultRecord::Article(r) => r.error.as_deref(),
            ResultRecord::Fetch(r) => r.error.as_deref(),
            ResultRecord::Score(_) => None,
        }
    }

    /// Returns `true` if the record carries a non-empty error.
    pub fn is_error(&self) -> bool {
        self.error().is_some_and(|e| !e.is_empty())
    }

    pub fn as_citations(&self) -> Option<&CitationRecord> {
        match self {
            ResultRecord::Citations(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_article(&self) -> Option<&ArticleRecord> {
        match self {
            ResultRecord::Article(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_fetch(&self) -> Option<&FetchRecord> {
        match self {
            ResultRecord::Fetch(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_score(&self) -> Option<&ScoreRecord> {
        match self {
            ResultRecord::Score(r) => Some(r),
            _ => None,
        }
    }
}

impl From<CitationRecord> for ResultRecord {
    fn from(record: CitationRecord) -> Self {
        ResultRecord::Citations(record)
    }
}

impl From<ArticleRecord> for ResultRecord {
    fn from(record: ArticleRecord) -> Self {
        ResultRecord::Article(record)
    }
}

impl From<FetchRecord> for ResultRecord {
    fn from(record: FetchRecord) -> Self {
        ResultRecord::Fetch(record)
    }
}

impl From<ScoreRecord> for ResultRecord {
    fn from(record: ScoreRecord) -> Self {
        ResultRecord::Score(record)
    }
}

pub(crate) const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// On-disk layout of one cache instance.
#[derive(Archive, Deserialize, Serialize, Debug)]
pub(crate) struct CacheSnapshot {
    pub format_version: u32,
    pub name: String,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Archive, Deserialize, Serialize, Debug)]
pub(crate) struct SnapshotEntry {
    pub key: CacheKey,
    pub record: ResultRecord,
}

// ⭐ Review Entities - Entries, buckets and the per-item aggregate
//
// A ReviewEntry is written once and never touched again.
// The ReviewAggregate is the single rollup per bill; it only changes through
// ReviewMerger inside a store transaction.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::item::ItemIdentity;
use crate::error::ValidationError;

// ============================================================================
// REVIEWER CLASS
// ============================================================================

/// Which bucket a review lands in. Ratings are pooled across both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerClass {
    /// Individual account (regular or admin)
    User,

    /// Business account
    Business,
}

impl ReviewerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewerClass::User => "user",
            ReviewerClass::Business => "business",
        }
    }
}

impl std::fmt::Display for ReviewerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewerClass {
    type Err = ValidationError;

    /// Accepts the account type names too: "regular" and "admin" review as users.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "regular" | "admin" => Ok(ReviewerClass::User),
            "business" => Ok(ReviewerClass::Business),
            _ => Err(ValidationError::UnknownAccountClass(s.to_string())),
        }
    }
}

// ============================================================================
// REVIEW KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewKind {
    Good,
    Bad,
}

impl ReviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewKind::Good => "good",
            ReviewKind::Bad => "bad",
        }
    }
}

impl std::fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewKind {
    type Err = ValidationError;

    /// Accepts "good"/"bad" and the long form "Good review"/"Bad review".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.strip_suffix(" review").unwrap_or(lower.as_str()) {
            "good" => Ok(ReviewKind::Good),
            "bad" => Ok(ReviewKind::Bad),
            _ => Err(ValidationError::UnknownReviewKind(s.to_string())),
        }
    }
}

// ============================================================================
// REVIEW ENTRY
// ============================================================================

/// Where the submitter was when posting, as resolved by the geocoding layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "latt", default)]
    pub latitude: String,

    #[serde(rename = "longt", default)]
    pub longitude: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub country: String,
}

/// Good reviews carry a rating, bad ones carry defect labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Verdict {
    Good { rating: i64 },
    Bad { defects: Vec<String> },
}

impl Verdict {
    pub fn kind(&self) -> ReviewKind {
        match self {
            Verdict::Good { .. } => ReviewKind::Good,
            Verdict::Bad { .. } => ReviewKind::Bad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub submitter_id: String,

    #[serde(default)]
    pub location: Location,

    pub date: String,

    #[serde(default)]
    pub comment: String,

    pub verdict: Verdict,
}

impl ReviewEntry {
    pub fn good(submitter_id: impl Into<String>, date: impl Into<String>, rating: i64) -> Self {
        ReviewEntry {
            submitter_id: submitter_id.into(),
            location: Location::default(),
            date: date.into(),
            comment: String::new(),
            verdict: Verdict::Good { rating },
        }
    }

    pub fn bad<I, S>(submitter_id: impl Into<String>, date: impl Into<String>, defects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReviewEntry {
            submitter_id: submitter_id.into(),
            location: Location::default(),
            date: date.into(),
            comment: String::new(),
            verdict: Verdict::Bad {
                defects: defects.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn kind(&self) -> ReviewKind {
        self.verdict.kind()
    }

    /// Rating of a good review, None for bad ones
    pub fn rating(&self) -> Option<i64> {
        match &self.verdict {
            Verdict::Good { rating } => Some(*rating),
            Verdict::Bad { .. } => None,
        }
    }

    /// Defect labels of a bad review, empty for good ones
    pub fn defects(&self) -> &[String] {
        match &self.verdict {
            Verdict::Good { .. } => &[],
            Verdict::Bad { defects } => defects,
        }
    }
}

// ============================================================================
// REVIEW BUCKETS + AGGREGATE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBuckets {
    #[serde(default)]
    pub good: Vec<ReviewEntry>,

    #[serde(default)]
    pub bad: Vec<ReviewEntry>,
}

impl ReviewBuckets {
    pub fn of_kind(&self, kind: ReviewKind) -> &[ReviewEntry] {
        match kind {
            ReviewKind::Good => &self.good,
            ReviewKind::Bad => &self.bad,
        }
    }

    pub(crate) fn of_kind_mut(&mut self, kind: ReviewKind) -> &mut Vec<ReviewEntry> {
        match kind {
            ReviewKind::Good => &mut self.good,
            ReviewKind::Bad => &mut self.bad,
        }
    }

    pub fn has_review_from(&self, submitter_id: &str, kind: ReviewKind) -> bool {
        self.of_kind(kind)
            .iter()
            .any(|entry| entry.submitter_id == submitter_id)
    }
}

/// Rollup of every review ever posted for one bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAggregate {
    pub identity: ItemIdentity,

    #[serde(default)]
    pub user_reviews: ReviewBuckets,

    #[serde(default)]
    pub business_reviews: ReviewBuckets,

    /// Defects from all bad reviews, first-seen order, no duplicates
    #[serde(default)]
    pub union_defects: Vec<String>,

    #[serde(default)]
    pub rating_sum: i64,

    #[serde(default)]
    pub rating_count: i64,

    #[serde(default)]
    pub avg_rating: i64,
}

impl ReviewAggregate {
    /// Empty aggregate for a bill nobody reviewed yet
    pub fn empty(identity: ItemIdentity) -> Self {
        ReviewAggregate {
            identity,
            user_reviews: ReviewBuckets::default(),
            business_reviews: ReviewBuckets::default(),
            union_defects: Vec::new(),
            rating_sum: 0,
            rating_count: 0,
            avg_rating: 0,
        }
    }

    pub fn buckets(&self, class: ReviewerClass) -> &ReviewBuckets {
        match class {
            ReviewerClass::User => &self.user_reviews,
            ReviewerClass::Business => &self.business_reviews,
        }
    }

    pub(crate) fn buckets_mut(&mut self, class: ReviewerClass) -> &mut ReviewBuckets {
        match class {
            ReviewerClass::User => &mut self.user_reviews,
            ReviewerClass::Business => &mut self.business_reviews,
        }
    }

    pub fn good_count(&self) -> usize {
        self.user_reviews.good.len() + self.business_reviews.good.len()
    }

    pub fn bad_count(&self) -> usize {
        self.user_reviews.bad.len() + self.business_reviews.bad.len()
    }
}

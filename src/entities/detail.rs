// 📒 Detail Entities - Provenance notes of a bill changing hands
//
// A submitter records when a bill came in (from whom) and when it went out
// (to whom). Notes are paired positionally into a ledger that only grows.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The bill was received by the submitter
    Incoming,

    /// The bill was handed on by the submitter
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incoming" | "in" => Ok(Direction::Incoming),
            "outgoing" | "out" => Ok(Direction::Outgoing),
            _ => Err(ValidationError::UnknownDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailEntry {
    pub date: String,

    /// Who the bill came from / went to
    #[serde(rename = "involved", default)]
    pub counterparty: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub notes: String,

    pub direction: Direction,
}

impl DetailEntry {
    pub fn new(
        direction: Direction,
        date: impl Into<String>,
        counterparty: impl Into<String>,
    ) -> Self {
        DetailEntry {
            date: date.into(),
            counterparty: counterparty.into(),
            subject: String::new(),
            notes: String::new(),
            direction,
        }
    }

    pub fn incoming(date: impl Into<String>, counterparty: impl Into<String>) -> Self {
        Self::new(Direction::Incoming, date, counterparty)
    }

    pub fn outgoing(date: impl Into<String>, counterparty: impl Into<String>) -> Self {
        Self::new(Direction::Outgoing, date, counterparty)
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailPair {
    #[serde(rename = "in", default)]
    pub incoming: Option<DetailEntry>,

    #[serde(rename = "out", default)]
    pub outgoing: Option<DetailEntry>,
}

impl DetailPair {
    pub fn is_complete(&self) -> bool {
        self.incoming.is_some() && self.outgoing.is_some()
    }
}

/// One submitter's ledger for one bill, oldest pair first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailLedger {
    pub pairs: Vec<DetailPair>,
}

impl DetailLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetailPair> {
        self.pairs.iter()
    }
}

impl From<Vec<DetailPair>> for DetailLedger {
    fn from(pairs: Vec<DetailPair>) -> Self {
        DetailLedger { pairs }
    }
}

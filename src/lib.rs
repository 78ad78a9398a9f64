// Bill Review - Core Library
// Aggregation engine for bill reviews and provenance ledgers, backed by an
// embedded transactional key-value store.

pub mod error;
pub mod config;
pub mod entities;
pub mod codec;
pub mod store;
pub mod review_merge;
pub mod detail_pairing;
pub mod service;
pub mod accounts;

// Re-export commonly used types
pub use error::{ConflictError, Error, Result, StoreError, ValidationError};
pub use config::Config;
pub use entities::{
    Account, AccountType, DetailEntry, DetailLedger, DetailPair, Direction, ItemIdentity,
    Location, ReviewAggregate, ReviewBuckets, ReviewEntry, ReviewKind, ReviewerClass, Verdict,
};
pub use store::{Bucket, ReadSnapshot, RecordStore, WriteTxn};
pub use review_merge::ReviewMerger;
pub use detail_pairing::DetailPairMatcher;
pub use service::{AggregationService, ItemReport, ReviewPost, ReviewSummary};
pub use accounts::AccountRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

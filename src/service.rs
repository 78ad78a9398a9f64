// ⚙️ Aggregation Service - load → merge → store, one transaction per call
//
// The only place aggregates and ledgers are mutated. Each submission:
//   1. canonicalizes the identity and derives the key
//   2. opens the store-wide write transaction
//   3. decodes the current record (absent = empty) and re-derives its rating
//      fields from the stored entries
//   4. runs the pure merge
//   5. encodes, writes back and commits
// Any error before the commit rolls the whole transaction back.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::detail_pairing::DetailPairMatcher;
use crate::entities::item::check_submitter;
use crate::entities::{
    DetailEntry, DetailLedger, ItemIdentity, ReviewAggregate, ReviewBuckets, ReviewEntry,
    ReviewerClass,
};
use crate::error::{Error, Result};
use crate::review_merge::ReviewMerger;
use crate::store::{Bucket, ReadSnapshot, RecordStore, WriteTxn};

// ============================================================================
// REQUEST / RESPONSE RECORDS
// ============================================================================

/// A review as posted, optionally with a provenance note for the same bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPost {
    pub identity: ItemIdentity,
    pub review: ReviewEntry,
    pub class: ReviewerClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailEntry>,
}

/// What anyone may see about a bill: just the counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub identity: ItemIdentity,
    pub good_reviews: usize,
    pub bad_reviews: usize,
}

/// Full view for a signed-in viewer, including their own ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub identity: ItemIdentity,
    pub user_reviews: ReviewBuckets,
    pub business_reviews: ReviewBuckets,
    pub defects: Vec<String>,
    pub avg_rating: i64,
    pub details: DetailLedger,
    pub good_reviews: usize,
    pub bad_reviews: usize,
}

// ============================================================================
// AGGREGATION SERVICE
// ============================================================================

#[derive(Debug, Clone)]
pub struct AggregationService {
    store: RecordStore,
    merger: ReviewMerger,
    matcher: DetailPairMatcher,
}

impl AggregationService {
    pub fn new(store: RecordStore) -> Self {
        AggregationService {
            store,
            merger: ReviewMerger::new(),
            matcher: DetailPairMatcher::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Fold one review into the bill's aggregate
    pub fn submit_review(
        &self,
        identity: &ItemIdentity,
        entry: ReviewEntry,
        class: ReviewerClass,
    ) -> Result<ReviewAggregate> {
        check_submitter(&entry.submitter_id)?;
        let identity = identity.canonicalize()?;
        self.store.update(|txn| self.apply_review(txn, &identity, entry, class))
    }

    /// Append one provenance note to the submitter's ledger for the bill
    pub fn submit_detail(
        &self,
        submitter_id: &str,
        identity: &ItemIdentity,
        entry: DetailEntry,
    ) -> Result<DetailLedger> {
        let identity = identity.canonicalize()?;
        let key = identity.ledger_key(submitter_id)?;
        self.store.update(|txn| self.apply_detail(txn, &key, entry))
    }

    /// Review plus optional detail; both land or neither does
    pub fn submit_post(&self, post: ReviewPost) -> Result<ReviewAggregate> {
        check_submitter(&post.review.submitter_id)?;
        let identity = post.identity.canonicalize()?;
        let ledger_key = match &post.detail {
            Some(_) => Some(identity.ledger_key(&post.review.submitter_id)?),
            None => None,
        };

        self.store.update(|txn| {
            let aggregate = self.apply_review(txn, &identity, post.review, post.class)?;
            if let (Some(key), Some(detail)) = (ledger_key, post.detail) {
                self.apply_detail(txn, &key, detail)?;
            }
            Ok(aggregate)
        })
    }

    /// Current aggregate, None when nobody reviewed the bill yet
    pub fn get_aggregate(&self, identity: &ItemIdentity) -> Result<Option<ReviewAggregate>> {
        let key = identity.review_key()?;
        self.store.view(|snap| load_aggregate(snap, &key))
    }

    /// Like `get_aggregate`, but a missing aggregate is `NotFound`
    pub fn require_aggregate(&self, identity: &ItemIdentity) -> Result<ReviewAggregate> {
        let key = identity.review_key()?;
        self.get_aggregate(identity)?
            .ok_or_else(|| Error::not_found("review aggregate", key))
    }

    pub fn get_ledger(
        &self,
        submitter_id: &str,
        identity: &ItemIdentity,
    ) -> Result<Option<DetailLedger>> {
        let key = identity.ledger_key(submitter_id)?;
        self.store.view(|snap| load_ledger(snap, &key))
    }

    /// Public counts; zero when nothing was posted
    pub fn review_summary(&self, identity: &ItemIdentity) -> Result<ReviewSummary> {
        let identity = identity.canonicalize()?;
        let aggregate = self.get_aggregate(&identity)?;

        Ok(ReviewSummary {
            good_reviews: aggregate.as_ref().map_or(0, ReviewAggregate::good_count),
            bad_reviews: aggregate.as_ref().map_or(0, ReviewAggregate::bad_count),
            identity,
        })
    }

    /// Everything about the bill plus the viewer's own ledger, one snapshot
    pub fn item_report(&self, identity: &ItemIdentity, viewer_id: &str) -> Result<ItemReport> {
        let identity = identity.canonicalize()?;
        let review_key = identity.review_key()?;
        let ledger_key = identity.ledger_key(viewer_id)?;

        let (aggregate, ledger) = self.store.view(|snap| -> Result<_> {
            Ok((load_aggregate(snap, &review_key)?, load_ledger(snap, &ledger_key)?))
        })?;

        let aggregate = aggregate.unwrap_or_else(|| ReviewAggregate::empty(identity.clone()));
        Ok(ItemReport {
            good_reviews: aggregate.good_count(),
            bad_reviews: aggregate.bad_count(),
            identity,
            user_reviews: aggregate.user_reviews,
            business_reviews: aggregate.business_reviews,
            defects: aggregate.union_defects,
            avg_rating: aggregate.avg_rating,
            details: ledger.unwrap_or_default(),
        })
    }

    // ========================================================================
    // TRANSACTION STEPS
    // ========================================================================

    fn apply_review(
        &self,
        txn: &mut WriteTxn,
        identity: &ItemIdentity,
        entry: ReviewEntry,
        class: ReviewerClass,
    ) -> Result<ReviewAggregate> {
        let key = identity.review_key()?;

        let current = match txn.get(Bucket::Reviews, &key)? {
            Some(bytes) => decode_aggregate(&self.merger, &key, &bytes)?,
            None => ReviewAggregate::empty(identity.clone()),
        };

        let next = self.merger.merge(&current, entry, class)?;
        txn.put(Bucket::Reviews, &key, &codec::encode(&next)?)?;
        Ok(next)
    }

    fn apply_detail(
        &self,
        txn: &mut WriteTxn,
        key: &str,
        entry: DetailEntry,
    ) -> Result<DetailLedger> {
        let current: DetailLedger = match txn.get(Bucket::Details, key)? {
            Some(bytes) => codec::decode(Bucket::Details.as_str(), key, &bytes)?,
            None => DetailLedger::new(),
        };

        let next = self.matcher.append(&current, entry);
        txn.put(Bucket::Details, key, &codec::encode(&next)?)?;
        Ok(next)
    }
}

fn load_aggregate(snap: &ReadSnapshot, key: &str) -> Result<Option<ReviewAggregate>> {
    match snap.get(Bucket::Reviews, key)? {
        Some(bytes) => Ok(Some(decode_aggregate(&ReviewMerger::new(), key, &bytes)?)),
        None => Ok(None),
    }
}

/// Stored rating fields are never trusted; they are re-derived from the entries
fn decode_aggregate(merger: &ReviewMerger, key: &str, bytes: &[u8]) -> Result<ReviewAggregate> {
    let stored: ReviewAggregate = codec::decode(Bucket::Reviews.as_str(), key, bytes)?;
    merger.recompute(&stored)
}

fn load_ledger(snap: &ReadSnapshot, key: &str) -> Result<Option<DetailLedger>> {
    match snap.get(Bucket::Details, key)? {
        Some(bytes) => Ok(Some(codec::decode(Bucket::Details.as_str(), key, &bytes)?)),
        None => Ok(None),
    }
}

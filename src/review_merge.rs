// ⭐ Review Merger - Fold one review into a bill's aggregate
//
// Rules:
//   - one good and one bad review per (submitter, reviewer class)
//   - ratings pool across classes: avg = sum / count, truncated
//   - defect labels union into first-seen order
//
// Pure: the input aggregate is never touched, so a retried transaction can
// call it again on the freshly loaded record.

use crate::entities::{ReviewAggregate, ReviewEntry, ReviewKind, ReviewerClass, Verdict};
use crate::error::{ConflictError, Result, ValidationError};

// ============================================================================
// REVIEW MERGER
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewMerger;

impl ReviewMerger {
    pub fn new() -> Self {
        ReviewMerger
    }

    /// Merge `submission` into `aggregate`, returning the new aggregate.
    ///
    /// Fails with `ConflictError::DuplicateReview` when the submitter already
    /// has a review of the same kind in the same class bucket.
    pub fn merge(
        &self,
        aggregate: &ReviewAggregate,
        submission: ReviewEntry,
        class: ReviewerClass,
    ) -> Result<ReviewAggregate> {
        let kind = submission.kind();

        if aggregate
            .buckets(class)
            .has_review_from(&submission.submitter_id, kind)
        {
            return Err(ConflictError::DuplicateReview {
                submitter_id: submission.submitter_id,
                class,
                kind,
            }
            .into());
        }

        let mut next = aggregate.clone();

        match &submission.verdict {
            Verdict::Good { rating } => {
                next.rating_sum = next
                    .rating_sum
                    .checked_add(*rating)
                    .ok_or(ValidationError::RatingOverflow)?;
            }
            Verdict::Bad { defects } => {
                union_into(&mut next.union_defects, defects);
            }
        }

        next.buckets_mut(class).of_kind_mut(kind).push(submission);

        if kind == ReviewKind::Good {
            next.rating_count = next.good_count() as i64;
            next.avg_rating = average(next.rating_sum, next.rating_count);
        }

        Ok(next)
    }

    /// Re-derive sum, count and average from the stored good entries.
    ///
    /// Applied to every aggregate read back from the store, so a record whose
    /// derived fields drifted from its entries is healed before use. The defect
    /// union is left alone: its first-seen order spans both classes and cannot
    /// be rebuilt from the buckets.
    pub fn recompute(&self, aggregate: &ReviewAggregate) -> Result<ReviewAggregate> {
        let mut next = aggregate.clone();
        let mut sum = 0i64;
        for rating in next
            .user_reviews
            .good
            .iter()
            .chain(next.business_reviews.good.iter())
            .filter_map(ReviewEntry::rating)
        {
            sum = sum.checked_add(rating).ok_or(ValidationError::RatingOverflow)?;
        }

        next.rating_sum = sum;
        next.rating_count = next.good_count() as i64;
        next.avg_rating = average(next.rating_sum, next.rating_count);
        Ok(next)
    }
}

/// Truncating integer average; 0 for an empty set.
pub fn average(sum: i64, count: i64) -> i64 {
    if count == 0 {
        0
    } else {
        sum / count
    }
}

/// Append labels not yet present, keeping first-insertion order
fn union_into(union: &mut Vec<String>, labels: &[String]) {
    for label in labels {
        if !union.contains(label) {
            union.push(label.clone());
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

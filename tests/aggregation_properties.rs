// End-to-end behaviour of the aggregation engine against a real store file

use bill_review::{
    AccountRegistry, AccountType, AggregationService, Bucket, Config, DetailEntry, Error,
    ItemIdentity, RecordStore, ReviewEntry, ReviewerClass,
};
use std::time::Duration;
use tempfile::TempDir;

fn open(dir: &TempDir) -> AggregationService {
    AggregationService::new(RecordStore::open(&Config::in_dir(dir.path())).unwrap())
}

fn bill() -> ItemIdentity {
    ItemIdentity::new("L 0042 1337 A", "50", "2006").unwrap()
}

fn raw_review_blob(svc: &AggregationService, identity: &ItemIdentity) -> Option<Vec<u8>> {
    let key = identity.review_key().unwrap();
    svc.store()
        .view(|snap| snap.get(Bucket::Reviews, &key))
        .unwrap()
}

#[test]
fn test_read_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    svc.submit_review(&bill(), ReviewEntry::good("u1", "2020-02-02", 4), ReviewerClass::User)
        .unwrap();

    let first = svc.get_aggregate(&bill()).unwrap();
    let second = svc.get_aggregate(&bill()).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_leaves_aggregate_unchanged() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);

    svc.submit_review(&bill(), ReviewEntry::good("u1", "2020-02-02", 4), ReviewerClass::User)
        .unwrap();
    let before = svc.get_aggregate(&bill()).unwrap();
    let blob_before = raw_review_blob(&svc, &bill());

    let err = svc
        .submit_review(&bill(), ReviewEntry::good("u1", "2020-02-03", 1), ReviewerClass::User)
        .unwrap_err();
    assert!(err.is_conflict(), "got {:?}", err);

    assert_eq!(svc.get_aggregate(&bill()).unwrap(), before);
    assert_eq!(raw_review_blob(&svc, &bill()), blob_before, "persisted bytes untouched");
}

#[test]
fn test_rejected_merge_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);

    svc.submit_review(&bill(), ReviewEntry::good("u1", "d", i64::MAX), ReviewerClass::User)
        .unwrap();
    let blob_before = raw_review_blob(&svc, &bill());

    let err = svc
        .submit_review(&bill(), ReviewEntry::good("u2", "d", 1), ReviewerClass::User)
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(raw_review_blob(&svc, &bill()), blob_before);
}

#[test]
fn test_average_after_each_submission() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);

    let ratings = [5, 2, 1, 4, 4];
    let mut sum = 0;
    for (i, rating) in ratings.iter().enumerate() {
        sum += rating;
        let class = if i % 2 == 0 {
            ReviewerClass::User
        } else {
            ReviewerClass::Business
        };
        let aggregate = svc
            .submit_review(&bill(), ReviewEntry::good(format!("s{}", i), "d", *rating), class)
            .unwrap();

        let n = i as i64 + 1;
        assert_eq!(aggregate.rating_count, n);
        assert_eq!(aggregate.avg_rating, sum / n, "after {} ratings", n);
    }
}

#[test]
fn test_defect_union_through_store() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);

    svc.submit_review(
        &bill(),
        ReviewEntry::bad("u1", "d", ["cut", "cut", "tear"]),
        ReviewerClass::User,
    )
    .unwrap();
    svc.submit_review(&bill(), ReviewEntry::bad("u2", "d", ["tear", "stain"]), ReviewerClass::User)
        .unwrap();

    let aggregate = svc.get_aggregate(&bill()).unwrap().unwrap();
    assert_eq!(aggregate.union_defects, vec!["cut", "tear", "stain"]);
}

#[test]
fn test_detail_pairing_through_store() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);

    for entry in [
        DetailEntry::incoming("d1", "A"),
        DetailEntry::outgoing("d2", "B"),
        DetailEntry::outgoing("d3", "C"),
        DetailEntry::incoming("d4", "D"),
    ] {
        svc.submit_detail("u1", &bill(), entry).unwrap();
    }

    let ledger = svc.get_ledger("u1", &bill()).unwrap().unwrap();
    let shape: Vec<(Option<&str>, Option<&str>)> = ledger
        .iter()
        .map(|p| {
            (
                p.incoming.as_ref().map(|e| e.counterparty.as_str()),
                p.outgoing.as_ref().map(|e| e.counterparty.as_str()),
            )
        })
        .collect();

    assert_eq!(
        shape,
        vec![
            (Some("A"), Some("B")),
            (None, Some("C")),
            (Some("D"), None),
        ]
    );
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let svc = open(&dir);
        svc.submit_review(&bill(), ReviewEntry::good("u1", "d", 3), ReviewerClass::User)
            .unwrap();
        svc.submit_detail("u1", &bill(), DetailEntry::incoming("d", "A"))
            .unwrap();
    }

    let svc = open(&dir);
    assert_eq!(svc.get_aggregate(&bill()).unwrap().unwrap().avg_rating, 3);
    assert_eq!(svc.get_ledger("u1", &bill()).unwrap().unwrap().len(), 1);
}

#[test]
fn test_concurrent_submitters_all_land() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(
        &Config::in_dir(dir.path()).with_lock_timeout(Duration::from_secs(10)),
    )
    .unwrap();
    let svc = AggregationService::new(store);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let svc = svc.clone();
            scope.spawn(move || {
                svc.submit_review(
                    &bill(),
                    ReviewEntry::good(format!("user-{}", i), "d", 4),
                    ReviewerClass::User,
                )
                .unwrap();
                svc.submit_detail(&format!("user-{}", i), &bill(), DetailEntry::incoming("d", "x"))
                    .unwrap();
            });
        }
    });

    let aggregate = svc.get_aggregate(&bill()).unwrap().unwrap();
    assert_eq!(aggregate.rating_count, 8);
    assert_eq!(aggregate.user_reviews.good.len(), 8);
    assert_eq!(aggregate.avg_rating, 4);
}

#[test]
fn test_write_blocked_by_held_lock_times_out() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let impatient =
        AggregationService::new(svc.store().with_lock_timeout(Duration::from_millis(50)));

    let held = svc.store().begin_write().unwrap();
    let err = impatient
        .submit_review(&bill(), ReviewEntry::good("u1", "d", 4), ReviewerClass::User)
        .unwrap_err();
    assert!(matches!(err, Error::Store(ref e) if e.is_timeout()), "got {:?}", err);

    // Readers are not blocked by the writer
    assert_eq!(impatient.get_aggregate(&bill()).unwrap(), None);
    drop(held);

    impatient
        .submit_review(&bill(), ReviewEntry::good("u1", "d", 4), ReviewerClass::User)
        .unwrap();
}

#[test]
fn test_account_class_routes_reviews() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(&Config::in_dir(dir.path())).unwrap();
    let accounts = AccountRegistry::new(store.clone());
    let svc = AggregationService::new(store);

    let shop = accounts
        .create_account("corner-shop", "hash", AccountType::Business)
        .unwrap();
    let admin = accounts.create_account("root", "hash", AccountType::Admin).unwrap();

    svc.submit_review(&bill(), ReviewEntry::good(&shop.id, "d", 5), shop.reviewer_class())
        .unwrap();
    svc.submit_review(&bill(), ReviewEntry::good(&admin.id, "d", 2), admin.reviewer_class())
        .unwrap();

    let aggregate = svc.get_aggregate(&bill()).unwrap().unwrap();
    assert_eq!(aggregate.business_reviews.good[0].submitter_id, shop.id);
    assert_eq!(aggregate.user_reviews.good[0].submitter_id, admin.id);
    assert_eq!(aggregate.avg_rating, 3);
}

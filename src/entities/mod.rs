// Entity Models
//
// Plain data records: serializable, no store handles, no framework types.
// Every change to an aggregate or ledger goes through the merge engines.

pub mod item;
pub mod review;
pub mod detail;
pub mod account;

pub use item::{ItemIdentity, KEY_SEPARATOR};
pub use review::{
    Location, ReviewAggregate, ReviewBuckets, ReviewEntry, ReviewKind, ReviewerClass, Verdict,
};
pub use detail::{DetailEntry, DetailLedger, DetailPair, Direction};
pub use account::{Account, AccountType};

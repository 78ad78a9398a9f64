// 🔁 Detail Pair Matcher - Positional in/out pairing of provenance notes
//
// State machine over the ledger's last pair:
//   Incoming  → always opens a new pair {in: entry}
//   Outgoing  → fills the last pair's empty `out` slot,
//               or opens {out: entry} when the ledger is empty
//               or the last pair already has an `out`
// Pairs are never reordered or removed.

use crate::entities::{DetailEntry, DetailLedger, DetailPair, Direction};

#[derive(Debug, Clone, Copy, Default)]
pub struct DetailPairMatcher;

impl DetailPairMatcher {
    pub fn new() -> Self {
        DetailPairMatcher
    }

    /// Return `ledger` with `entry` appended
    pub fn append(&self, ledger: &DetailLedger, entry: DetailEntry) -> DetailLedger {
        let mut next = ledger.clone();
        self.append_in_place(&mut next, entry);
        next
    }

    fn append_in_place(&self, ledger: &mut DetailLedger, entry: DetailEntry) {
        match entry.direction {
            Direction::Incoming => ledger.pairs.push(DetailPair {
                incoming: Some(entry),
                outgoing: None,
            }),
            Direction::Outgoing => match ledger.pairs.last_mut() {
                Some(last) if last.outgoing.is_none() => last.outgoing = Some(entry),
                _ => ledger.pairs.push(DetailPair {
                    incoming: None,
                    outgoing: Some(entry),
                }),
            },
        }
    }
}

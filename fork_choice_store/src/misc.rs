use core::cmp::Ordering;
use std::sync::Arc;

use anyhow::{ensure, Result};
use types::{
    phase0::{
        containers::BeaconBlock,
        primitives::{Slot, H256},
    },
    preset::Preset,
};

use crate::error::Error;

pub const BLOCK_KEY_PREFIX: &[u8] = b"block/";
pub const STATE_KEY_PREFIX: &[u8] = b"state/";

/// An unprocessed block ordered by slot and then by arrival.
///
/// [`BinaryHeap`](std::collections::BinaryHeap) is a max-heap, so the ordering is reversed to put
/// the earliest block on top.
pub struct QueuedBlock<P: Preset> {
    pub slot: Slot,
    pub sequence: u64,
    pub block: Arc<BeaconBlock<P>>,
}

impl<P: Preset> PartialEq for QueuedBlock<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl<P: Preset> Eq for QueuedBlock<P> {}

impl<P: Preset> PartialOrd for QueuedBlock<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Preset> Ord for QueuedBlock<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.slot, other.sequence).cmp(&(self.slot, self.sequence))
    }
}

pub fn database_key(prefix: &[u8], root: H256) -> Vec<u8> {
    [prefix, root.as_bytes()].concat()
}

pub fn root_from_database_key(prefix: &[u8], key: &[u8]) -> Result<H256> {
    let root_bytes = key.strip_prefix(prefix).unwrap_or(key);

    ensure!(
        root_bytes.len() == H256::len_bytes(),
        Error::MalformedDatabaseKey { key: key.to_vec() },
    );

    Ok(H256::from_slice(root_bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use types::preset::Minimal;

    use super::*;

    fn queued(slot: Slot, sequence: u64) -> QueuedBlock<Minimal> {
        QueuedBlock {
            slot,
            sequence,
            block: Arc::default(),
        }
    }

    #[test]
    fn heap_yields_lowest_slot_then_earliest_arrival() {
        let mut heap = [queued(5, 0), queued(2, 1), queued(8, 2), queued(2, 3)]
            .into_iter()
            .collect::<BinaryHeap<_>>();

        let mut order = vec![];

        while let Some(QueuedBlock { slot, sequence, .. }) = heap.pop() {
            order.push((slot, sequence));
        }

        assert_eq!(order, [(2, 1), (2, 3), (5, 0), (8, 2)]);
    }

    #[test]
    fn database_keys_round_trip_roots() -> Result<()> {
        let root = H256::repeat_byte(7);
        let key = database_key(STATE_KEY_PREFIX, root);

        assert_eq!(root_from_database_key(STATE_KEY_PREFIX, &key)?, root);
        assert!(root_from_database_key(STATE_KEY_PREFIX, b"state/short").is_err());

        Ok(())
    }
}

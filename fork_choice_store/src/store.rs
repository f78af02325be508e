use std::{
    collections::{BinaryHeap, HashMap as StdHashMap, VecDeque},
    sync::Arc,
};

use anyhow::Result;
use database::Database;
use helper_functions::{accessors, predicates, verifier::Verifier};
use im::HashMap;
use itertools::Itertools as _;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use ssz::{SszHash as _, SszReadExt as _, SszWrite as _};
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, BeaconBlock, BeaconBlockHeader},
        primitives::{Epoch, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{
    misc::{self, QueuedBlock, BLOCK_KEY_PREFIX, STATE_KEY_PREFIX},
    store_config::StoreConfig,
};

/// The record of every block, state and attestation the node has seen.
///
/// Blocks and attestations are split into unprocessed ones (received but not yet applied) and
/// processed ones (applied to a state that is also stored here). The store also holds the head and
/// finalized pointers chosen by the fork choice rule, which lives outside of it.
///
/// Every collection has its own lock. Operations that scan a collection and then mutate it hold
/// that collection's lock for the whole scan. Updates spanning several collections are not atomic.
pub struct Store<P: Preset> {
    store_config: StoreConfig,
    database: Option<Arc<dyn Database>>,
    // Keyed by whatever root the caller passes to `Store::add_processed_block`.
    // Attestations and `Store::parent` look blocks up by block root.
    processed_blocks: RwLock<HashMap<H256, Arc<BeaconBlock<P>>>>,
    unprocessed_blocks: Mutex<UnprocessedBlocks<P>>,
    unprocessed_block_lookup: RwLock<HashMap<H256, Arc<BeaconBlock<P>>>>,
    states: RwLock<HashMap<H256, Arc<BeaconState<P>>>>,
    processed_attestations: RwLock<HashMap<H256, Arc<Attestation<P>>>>,
    unprocessed_attestations: Mutex<VecDeque<Arc<Attestation<P>>>>,
    unprocessed_attestation_lookup: RwLock<HashMap<H256, Arc<Attestation<P>>>>,
    latest_attestations: RwLock<StdHashMap<ValidatorIndex, Arc<Attestation<P>>>>,
    validator_block_headers: RwLock<StdHashMap<ValidatorIndex, Vec<BeaconBlockHeader>>>,
    best_block: RwLock<Option<(H256, Slot)>>,
    finalized_block: RwLock<Option<(H256, Epoch)>>,
}

struct UnprocessedBlocks<P: Preset> {
    heap: BinaryHeap<QueuedBlock<P>>,
    next_sequence: u64,
}

impl<P: Preset> Default for UnprocessedBlocks<P> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }
}

impl<P: Preset> Default for Store<P> {
    fn default() -> Self {
        Self::new(StoreConfig::for_preset::<P>())
    }
}

impl<P: Preset> Store<P> {
    #[must_use]
    pub fn new(store_config: StoreConfig) -> Self {
        Self {
            store_config,
            database: None,
            processed_blocks: RwLock::default(),
            unprocessed_blocks: Mutex::default(),
            unprocessed_block_lookup: RwLock::default(),
            states: RwLock::default(),
            processed_attestations: RwLock::default(),
            unprocessed_attestations: Mutex::default(),
            unprocessed_attestation_lookup: RwLock::default(),
            latest_attestations: RwLock::default(),
            validator_block_headers: RwLock::default(),
            best_block: RwLock::default(),
            finalized_block: RwLock::default(),
        }
    }

    /// Creates a store that also writes processed blocks and states to `database`.
    ///
    /// Blocks must be added under their own roots for [`Store::load_processed_block`] and
    /// [`Store::rehydrate`] to accept them.
    #[must_use]
    pub fn with_database(store_config: StoreConfig, database: Arc<dyn Database>) -> Self {
        Self {
            database: Some(database),
            ..Self::new(store_config)
        }
    }

    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        self.store_config
    }

    pub fn on_new_unprocessed_block(&self, block: Arc<BeaconBlock<P>>) {
        debug!(
            "new unprocessed block (slot: {}, state_root: {:?})",
            block.slot, block.state_root,
        );

        self.add_unprocessed_block(block);
    }

    pub fn add_unprocessed_block(&self, block: Arc<BeaconBlock<P>>) {
        let block_root = block.hash_tree_root();

        self.unprocessed_block_lookup
            .write()
            .insert(block_root, Arc::clone(&block));

        let mut queue = self.unprocessed_blocks.lock();
        let sequence = queue.next_sequence;

        queue.next_sequence += 1;
        queue.heap.push(QueuedBlock {
            slot: block.slot,
            sequence,
            block,
        });
    }

    pub fn add_processed_block(&self, root: H256, block: Arc<BeaconBlock<P>>) -> Result<()> {
        if let Some(database) = &self.database {
            database.put(&misc::database_key(BLOCK_KEY_PREFIX, root), &block.to_ssz()?)?;
        }

        self.processed_blocks.write().insert(root, block);

        Ok(())
    }

    pub fn add_state(&self, state_root: H256, state: Arc<BeaconState<P>>) -> Result<()> {
        if let Some(database) = &self.database {
            database.put(&misc::database_key(STATE_KEY_PREFIX, state_root), &state.to_ssz()?)?;
        }

        self.states.write().insert(state_root, state);

        Ok(())
    }

    pub fn add_processed_attestation(&self, attestation: Arc<Attestation<P>>) {
        self.processed_attestations
            .write()
            .insert(attestation.hash_tree_root(), attestation);
    }

    pub fn add_unprocessed_attestation(&self, attestation: Arc<Attestation<P>>) {
        self.unprocessed_attestation_lookup
            .write()
            .insert(attestation.hash_tree_root(), Arc::clone(&attestation));

        self.unprocessed_attestations.lock().push_back(attestation);
    }

    /// Records `header` as proposed by `validator_index`.
    ///
    /// Headers are kept until they are pruned by [`Store::prune_block_headers`] or until the
    /// validator has more than [`StoreConfig::block_header_retention`] of them.
    pub fn add_block_header(&self, validator_index: ValidatorIndex, header: BeaconBlockHeader) {
        let retention = self.store_config.block_header_retention;
        let mut headers_by_validator = self.validator_block_headers.write();
        let headers = headers_by_validator.entry(validator_index).or_default();

        headers.push(header);

        if headers.len() > retention {
            headers.drain(..headers.len() - retention);
        }
    }

    /// Drops headers at or below `finalized_slot`. They can no longer be used for slashing.
    pub fn prune_block_headers(&self, finalized_slot: Slot) {
        let mut headers_by_validator = self.validator_block_headers.write();

        headers_by_validator.retain(|_, headers| {
            headers.retain(|header| header.slot > finalized_slot);
            !headers.is_empty()
        });
    }

    /// Drops lookup entries for unprocessed blocks and attestations at or below `finalized_slot`.
    ///
    /// Queued items are not affected. Their lookup entries stop resolving once pruned.
    pub fn prune_unprocessed_lookups(&self, finalized_slot: Slot) {
        let mut block_lookup = self.unprocessed_block_lookup.write();
        let blocks_before = block_lookup.len();

        block_lookup.retain(|_, block| block.slot > finalized_slot);

        let pruned_blocks = blocks_before - block_lookup.len();

        drop(block_lookup);

        let mut attestation_lookup = self.unprocessed_attestation_lookup.write();
        let attestations_before = attestation_lookup.len();

        attestation_lookup.retain(|_, attestation| {
            accessors::get_attestation_data_slot(&attestation.data) > finalized_slot
        });

        let pruned_attestations = attestations_before - attestation_lookup.len();

        drop(attestation_lookup);

        debug!(
            "pruned unprocessed lookups up to slot {finalized_slot} \
             (blocks: {pruned_blocks}, attestations: {pruned_attestations})",
        );
    }

    pub fn update_best_block(&self, root: H256, slot: Slot) {
        info!("best block updated (root: {root:?}, slot: {slot})");
        *self.best_block.write() = Some((root, slot));
    }

    pub fn update_latest_finalized_block(&self, root: H256, epoch: Epoch) {
        info!("finalized block updated (root: {root:?}, epoch: {epoch})");
        *self.finalized_block.write() = Some((root, epoch));
    }

    /// Removes and returns queued blocks with slots up to and including `slot`.
    ///
    /// Blocks are returned in ascending slot order. Blocks with equal slots are returned in the
    /// order they were added.
    pub fn get_unprocessed_blocks_until_slot(&self, slot: Slot) -> Vec<Arc<BeaconBlock<P>>> {
        let mut queue = self.unprocessed_blocks.lock();
        let mut blocks = vec![];

        while queue
            .heap
            .peek()
            .is_some_and(|queued_block| queued_block.slot <= slot)
        {
            if let Some(queued_block) = queue.heap.pop() {
                blocks.push(queued_block.block);
            }
        }

        drop(queue);

        debug!("drained {} unprocessed blocks up to slot {slot}", blocks.len());

        blocks
    }

    /// Removes and returns queued attestations for slots up to and including `slot`.
    ///
    /// Attestations are taken in arrival order. Taking stops at the first attestation for a later
    /// slot or once [`StoreConfig::max_attestations_per_drain`] have been collected. Attestations
    /// that were already processed are removed from the queue without being returned.
    pub fn get_unprocessed_attestations_until_slot(
        &self,
        state: &BeaconState<P>,
        slot: Slot,
    ) -> Vec<Arc<Attestation<P>>> {
        let maximum = self.store_config.max_attestations_per_drain;
        let mut queue = self.unprocessed_attestations.lock();
        let mut attestations = vec![];
        let mut skipped = 0_usize;

        while attestations.len() < maximum
            && queue.front().is_some_and(|attestation| {
                accessors::get_attestation_data_slot(&attestation.data) <= slot
            })
        {
            let Some(attestation) = queue.pop_front() else {
                break;
            };

            let root = attestation.hash_tree_root();

            if self.processed_attestations.read().contains_key(&root) {
                skipped += 1;
            } else {
                attestations.push(attestation);
            }
        }

        drop(queue);

        debug!(
            "drained {} unprocessed attestations up to slot {slot} \
             (state slot: {}, already processed: {skipped})",
            attestations.len(),
            state.slot,
        );

        attestations
    }

    /// Queues `attestation` and counts it toward the latest messages of its attesters.
    ///
    /// Latest messages are only updated if the attested block has been processed and its state
    /// is known. A validator's latest message is only replaced by an attestation for a strictly
    /// later slot.
    ///
    /// Store locks are not held while `verifier` runs.
    pub fn on_new_unprocessed_attestation(
        &self,
        attestation: Arc<Attestation<P>>,
        verifier: impl Verifier,
    ) -> Result<()> {
        let block_root = attestation.data.beacon_block_root;

        debug!("new unprocessed attestation (beacon_block_root: {block_root:?})");

        self.add_unprocessed_attestation(Arc::clone(&attestation));

        let Some(block) = self.processed_block(block_root) else {
            return Ok(());
        };

        let Some(state) = self.state(block.state_root) else {
            warn!(
                "state of attested block is missing \
                 (beacon_block_root: {block_root:?}, state_root: {:?})",
                block.state_root,
            );
            return Ok(());
        };

        let attesting_indices = match Self::verify_attestation(&state, &attestation, verifier) {
            Ok(attesting_indices) => attesting_indices,
            Err(error) => {
                warn!("attestation failed verification: {error}");
                return Err(error);
            }
        };

        let new_slot = accessors::get_attestation_data_slot(&attestation.data);
        let mut latest_attestations = self.latest_attestations.write();

        for validator_index in attesting_indices {
            let replace = latest_attestations
                .get(&validator_index)
                .map_or(true, |latest| {
                    new_slot > accessors::get_attestation_data_slot(&latest.data)
                });

            if replace {
                latest_attestations.insert(validator_index, Arc::clone(&attestation));
            }
        }

        Ok(())
    }

    fn verify_attestation(
        state: &BeaconState<P>,
        attestation: &Attestation<P>,
        verifier: impl Verifier,
    ) -> Result<Vec<ValidatorIndex>> {
        let indexed_attestation = accessors::get_indexed_attestation(state, attestation)?;

        predicates::validate_indexed_attestation(state, &indexed_attestation, verifier)?;

        Ok(indexed_attestation.attesting_indices.to_vec())
    }

    #[must_use]
    pub fn get_latest_attestation(
        &self,
        validator_index: ValidatorIndex,
    ) -> Option<Arc<Attestation<P>>> {
        self.latest_attestations.read().get(&validator_index).cloned()
    }

    #[must_use]
    pub fn processed_block(&self, root: H256) -> Option<Arc<BeaconBlock<P>>> {
        self.processed_blocks.read().get(&root).cloned()
    }

    /// Looks up the processed block stored under `block.parent_root`.
    #[must_use]
    pub fn parent(&self, block: &BeaconBlock<P>) -> Option<Arc<BeaconBlock<P>>> {
        self.processed_block(block.parent_root)
    }

    #[must_use]
    pub fn state(&self, state_root: H256) -> Option<Arc<BeaconState<P>>> {
        self.states.read().get(&state_root).cloned()
    }

    #[must_use]
    pub fn unprocessed_block(&self, block_root: H256) -> Option<Arc<BeaconBlock<P>>> {
        self.unprocessed_block_lookup.read().get(&block_root).cloned()
    }

    /// Returns the unprocessed attestation with `root` unless it has since been processed.
    #[must_use]
    pub fn unprocessed_attestation(&self, root: H256) -> Option<Arc<Attestation<P>>> {
        if self.processed_attestations.read().contains_key(&root) {
            return None;
        }

        self.unprocessed_attestation_lookup.read().get(&root).cloned()
    }

    /// Returns a copy of the unprocessed block queue in the order it would be drained in.
    #[must_use]
    pub fn unprocessed_blocks(&self) -> Vec<Arc<BeaconBlock<P>>> {
        self.unprocessed_blocks
            .lock()
            .heap
            .iter()
            .sorted_by_key(|queued_block| (queued_block.slot, queued_block.sequence))
            .map(|queued_block| Arc::clone(&queued_block.block))
            .collect()
    }

    #[must_use]
    pub fn block_headers(&self, validator_index: ValidatorIndex) -> Vec<BeaconBlockHeader> {
        self.validator_block_headers
            .read()
            .get(&validator_index)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a snapshot of processed blocks. Later changes to the store do not affect it.
    #[must_use]
    pub fn processed_blocks(&self) -> HashMap<H256, Arc<BeaconBlock<P>>> {
        self.processed_blocks.read().clone()
    }

    #[must_use]
    pub fn best_block_root(&self) -> Option<H256> {
        self.best_block.read().map(|(root, _)| root)
    }

    #[must_use]
    pub fn best_slot(&self) -> Option<Slot> {
        self.best_block.read().map(|(_, slot)| slot)
    }

    #[must_use]
    pub fn finalized_block_root(&self) -> Option<H256> {
        self.finalized_block.read().map(|(root, _)| root)
    }

    #[must_use]
    pub fn finalized_epoch(&self) -> Option<Epoch> {
        self.finalized_block.read().map(|(_, epoch)| epoch)
    }

    /// Looks up a state in memory and then in the database.
    ///
    /// States loaded from the database are checked against `state_root` and cached in memory.
    pub fn load_state(&self, state_root: H256) -> Result<Option<Arc<BeaconState<P>>>> {
        if let Some(state) = self.state(state_root) {
            return Ok(Some(state));
        }

        let Some(bytes) = self.load_bytes(STATE_KEY_PREFIX, state_root)? else {
            return Ok(None);
        };

        let state = Arc::new(BeaconState::from_ssz_with_root(bytes, state_root)?);

        self.states.write().insert(state_root, Arc::clone(&state));

        Ok(Some(state))
    }

    /// Looks up a processed block in memory and then in the database.
    ///
    /// Blocks loaded from the database are checked against `block_root` and cached in memory.
    pub fn load_processed_block(&self, block_root: H256) -> Result<Option<Arc<BeaconBlock<P>>>> {
        if let Some(block) = self.processed_block(block_root) {
            return Ok(Some(block));
        }

        let Some(bytes) = self.load_bytes(BLOCK_KEY_PREFIX, block_root)? else {
            return Ok(None);
        };

        let block = Arc::new(BeaconBlock::from_ssz_with_root(bytes, block_root)?);

        self.processed_blocks
            .write()
            .insert(block_root, Arc::clone(&block));

        Ok(Some(block))
    }

    /// Loads every processed block and state from the database into memory.
    ///
    /// Does nothing if the store has no database.
    pub fn rehydrate(&self) -> Result<()> {
        let Some(database) = &self.database else {
            return Ok(());
        };

        let blocks = database
            .pairs_with_prefix(BLOCK_KEY_PREFIX)?
            .into_iter()
            .map(|(key, bytes)| {
                let root = misc::root_from_database_key(BLOCK_KEY_PREFIX, &key)?;
                let block = BeaconBlock::from_ssz_with_root(bytes, root)?;
                Ok((root, Arc::new(block)))
            })
            .collect::<Result<Vec<_>>>()?;

        let states = database
            .pairs_with_prefix(STATE_KEY_PREFIX)?
            .into_iter()
            .map(|(key, bytes)| {
                let root = misc::root_from_database_key(STATE_KEY_PREFIX, &key)?;
                let state = BeaconState::from_ssz_with_root(bytes, root)?;
                Ok((root, Arc::new(state)))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "rehydrated store from database ({} blocks, {} states)",
            blocks.len(),
            states.len(),
        );

        self.processed_blocks.write().extend(blocks);
        self.states.write().extend(states);

        Ok(())
    }

    fn load_bytes(&self, prefix: &[u8], root: H256) -> Result<Option<Vec<u8>>> {
        match &self.database {
            Some(database) => database.get(&misc::database_key(prefix, root)),
            None => Ok(None),
        }
    }
}

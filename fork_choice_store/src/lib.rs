//! The chain index: an in-memory record of blocks, states and attestations.
//!
//! Objects are split into two partitions:
//! - Unprocessed objects have been received but not yet applied to a state.
//!   Blocks wait in a queue ordered by slot. Attestations wait in a FIFO queue.
//! - Processed objects have been validated. Processed blocks are stored along with the states
//!   they produced.
//!
//! A block moves through the store like this:
//! received → unprocessed → applied with `transition_functions::apply_block` → processed.
//! Blocks that fail the state transition are dropped by the caller and never become processed.
//!
//! The store also records each validator's latest attestation along with the best and finalized
//! blocks. It does not implement the fork choice rule itself. The rule is expected to call
//! [`Store::update_best_block`] and [`Store::update_latest_finalized_block`] with its decisions.
//!
//! Processed blocks and states can optionally be written through to a [`database::Database`].

pub use crate::{error::Error, store::Store, store_config::StoreConfig};

mod error;
mod misc;
mod store;
mod store_config;

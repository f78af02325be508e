//! State transition functions for Phase 0.
//!
//! [`apply_block`] is the entry point. Everything else is public to allow processing parts of a
//! block or epoch separately.

pub use error::Error;
pub use state_transition::{apply_block, state_transition, verify_block_signature, StateRootPolicy};

pub mod block_processing;
pub mod epoch_processing;
pub mod slot_processing;

mod epoch_intermediates;
mod error;
mod state_transition;

#[cfg(test)]
mod test_utils;

use core::sync::atomic::{AtomicU64, Ordering};

// IDs are written to the header as signed 64-bit BSON integers.
const LAST_ID: u64 = i64::MAX.unsigned_abs();

/// Hands out request IDs. IDs start at 1 and wrap back to 1 after [`i64::MAX`].
pub struct RequestCounter(AtomicU64);

impl Default for RequestCounter {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl RequestCounter {
    #[must_use]
    pub const fn starting_at(first_id: u64) -> Self {
        Self(AtomicU64::new(first_id))
    }

    pub fn next(&self) -> u64 {
        // The closure always returns `Some`, so both variants hold the previous value.
        self.0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(id.checked_add(1).filter(|next| *next <= LAST_ID).unwrap_or(1))
            })
            .unwrap_or_else(core::convert::identity)
    }
}

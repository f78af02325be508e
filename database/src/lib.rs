//! Key-value storage that the chain index can persist its records to.
//!
//! Values are compressed with Snappy before they are stored.
//! Keys are stored as given and iterated in lexicographic order.

use std::sync::Arc;

use anyhow::Result;
use im::OrdMap;
use log::debug;
use parking_lot::Mutex;
use snap::raw::{Decoder, Encoder};
use tap::Pipe as _;

/// A durable store for opaque byte strings.
///
/// Implementations must keep keys in ascending lexicographic order and must apply each batch
/// atomically with respect to readers.
pub trait Database: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn contains_key(&self, key: &[u8]) -> Result<bool>;

    fn put_batch(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Returns every pair whose key starts with `prefix`, in ascending key order.
    fn pairs_with_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_batch(vec![(key.to_vec(), value.to_vec())])
    }
}

#[derive(Default)]
pub struct InMemoryDatabase {
    // Methods of `OrdMap` clone its elements, so they should be cheaply cloneable.
    map: Mutex<InMemoryMap>,
}

type InMemoryMap = OrdMap<Arc<[u8]>, Arc<[u8]>>;

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

impl Database for InMemoryDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.map
            .lock()
            .get(key)
            .map(|compressed| decompress(compressed))
            .transpose()
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        self.map.lock().contains_key(key).pipe(Ok)
    }

    fn put_batch(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        let pair_count = pairs.len();

        // Compress everything before taking the lock so that a failure leaves the map untouched.
        let compressed_pairs = pairs
            .into_iter()
            .map(|(key, value)| Ok((Arc::from(key), Arc::from(compress(&value)?))))
            .collect::<Result<Vec<_>>>()?;

        let mut map = self.map.lock();
        let mut new_map = map.clone();

        for (key, value) in compressed_pairs {
            new_map.insert(key, value);
        }

        *map = new_map;

        debug!("stored {pair_count} pairs in in-memory database");

        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.lock().remove(key);
        Ok(())
    }

    fn pairs_with_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        // Cloning an `OrdMap` is cheap. Decompression happens without holding the lock.
        let map = self.map.lock().clone();
        let start_pair = map
            .get_key_value(prefix)
            .map(|(key, value)| (key.clone(), value.clone()));
        let (_, above) = map.split(prefix);

        start_pair
            .into_iter()
            .chain(above)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| Ok((key.to_vec(), decompress(&value)?)))
            .collect()
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().compress_vec(data).map_err(Into::into)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    Decoder::new().decompress_vec(data).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn populated_database() -> Result<InMemoryDatabase> {
        let database = InMemoryDatabase::new();

        // This indirectly tests `Database::put` and `Database::put_batch`.
        database.put_batch(vec![
            (b"block_A".to_vec(), b"1".to_vec()),
            (b"block_B".to_vec(), b"2".to_vec()),
            (b"state_A".to_vec(), b"3".to_vec()),
        ])?;
        database.put(b"state_C", b"4")?;

        Ok(database)
    }

    fn to_string_pairs(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<Vec<(String, String)>> {
        pairs
            .into_iter()
            .map(|(key, value)| Ok((String::from_utf8(key)?, String::from_utf8(value)?)))
            .collect()
    }

    #[test]
    fn values_are_returned_decompressed() -> Result<()> {
        let database = populated_database()?;

        assert_eq!(database.get(b"block_B")?, Some(b"2".to_vec()));
        assert_eq!(database.get(b"block_C")?, None);
        assert_eq!(database.len(), 4);

        Ok(())
    }

    #[test]
    fn later_writes_to_the_same_key_win() -> Result<()> {
        let database = InMemoryDatabase::new();

        database.put_batch(vec![
            (b"A".to_vec(), b"1".to_vec()),
            (b"A".to_vec(), b"2".to_vec()),
            (b"A".to_vec(), b"3".to_vec()),
        ])?;

        assert_eq!(database.get(b"A")?, Some(b"3".to_vec()));
        assert_eq!(database.len(), 1);

        Ok(())
    }

    #[test]
    fn delete_removes_only_the_given_key() -> Result<()> {
        let database = populated_database()?;

        database.delete(b"block_A")?;
        database.delete(b"missing")?;

        assert!(!database.contains_key(b"block_A")?);
        assert!(database.contains_key(b"block_B")?);
        assert_eq!(database.len(), 3);

        Ok(())
    }

    #[test_case(b"block_", &[("block_A", "1"), ("block_B", "2")])]
    #[test_case(b"state_", &[("state_A", "3"), ("state_C", "4")])]
    #[test_case(b"state_B", &[])]
    #[test_case(b"", &[("block_A", "1"), ("block_B", "2"), ("state_A", "3"), ("state_C", "4")])]
    fn pairs_with_prefix_are_ascending(prefix: &[u8], expected: &[(&str, &str)]) -> Result<()> {
        let database = populated_database()?;
        let actual = to_string_pairs(database.pairs_with_prefix(prefix)?)?;

        let expected = expected
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect::<Vec<_>>();

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() -> Result<()> {
        let database = populated_database()?;
        let snapshot = database.pairs_with_prefix(b"block_")?;

        database.delete(b"block_A")?;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(database.pairs_with_prefix(b"block_")?.len(), 1);

        Ok(())
    }
}

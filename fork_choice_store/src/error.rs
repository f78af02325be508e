use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database key does not end with a 32 byte root: {key:?}")]
    MalformedDatabaseKey { key: Vec<u8> },
}

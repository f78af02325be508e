use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request line is malformed: {line:?}")]
    MalformedRequestLine { line: String },
    #[error("request line is longer than {maximum} bytes")]
    RequestLineTooLong { maximum: usize },
    #[error(
        "message is longer than {maximum} bytes (header: {header_length}, body: {body_length})"
    )]
    MessageTooLong {
        header_length: usize,
        body_length: usize,
        maximum: usize,
    },
    #[error("unknown RPC method code: {code}")]
    UnknownMethod { code: u16 },
}

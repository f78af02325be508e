//! Framing for requests exchanged between two peers.
//!
//! Every message consists of a request line followed by a BSON header and a BSON body:
//!
//! ```text
//! EWP 0.2 RPC <header length> <body length>\n<header><body>
//! ```
//!
//! The header holds the method code and the request ID. The body wraps the payload in an object
//! with a single `body` field. Payloads are opaque to this crate.
//!
//! Request lines longer than [`MAX_REQUEST_LINE_LENGTH`] and messages that declare more than
//! [`MAX_MESSAGE_LENGTH`] bytes are rejected before their contents are buffered.

pub use crate::{
    codec::{
        decode, decode_with_limit, encode, goodbye, RpcCodec, RpcMessage, MAX_MESSAGE_LENGTH,
        MAX_REQUEST_LINE_LENGTH, VERSION,
    },
    counter::RequestCounter,
    error::Error,
    method::RpcMethod,
};

mod codec;
mod counter;
mod error;
mod method;

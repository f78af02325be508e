use anyhow::{ensure, Result};
use bson::{Bson, Document};
use bytes::{Buf as _, BufMut as _, BytesMut};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::{counter::RequestCounter, error::Error, method::RpcMethod};

pub const VERSION: &str = "0.2";

/// Longest request line accepted, not counting the trailing newline.
pub const MAX_REQUEST_LINE_LENGTH: usize = 64;

/// Largest combined length of a header and a body.
pub const MAX_MESSAGE_LENGTH: usize = 1 << 20;

const PREAMBLE: &str = "EWP";
const PROTOCOL: &str = "RPC";

#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct Header {
    method_id: u16,
    id: u64,
}

#[derive(Deserialize, Serialize)]
struct Body<T> {
    body: T,
}

#[derive(Clone, PartialEq, Debug)]
pub struct RpcMessage {
    pub id: u64,
    pub method: RpcMethod,
    pub body: Bson,
}

/// Fails if `id` does not fit in a signed 64-bit BSON integer.
pub fn encode(method: RpcMethod, body: &impl Serialize, id: u64) -> Result<Vec<u8>> {
    let header = bson::to_vec(&Header {
        method_id: method.code(),
        id,
    })?;

    let body = bson::to_vec(&Body { body })?;

    let request_line = format!(
        "{PREAMBLE} {VERSION} {PROTOCOL} {} {}\n",
        header.len(),
        body.len(),
    );

    let mut bytes = request_line.into_bytes();
    bytes.extend(header);
    bytes.extend(body);
    Ok(bytes)
}

/// Returns the first message in `bytes` along with the number of bytes it occupies.
///
/// Returns `Ok(None)` if `bytes` does not contain a complete message yet.
pub fn decode(bytes: &[u8]) -> Result<Option<(RpcMessage, usize)>> {
    decode_with_limit(bytes, MAX_MESSAGE_LENGTH)
}

/// Like [`decode`], but with a custom limit on the combined length of the header and the body.
pub fn decode_with_limit(
    bytes: &[u8],
    max_message_length: usize,
) -> Result<Option<(RpcMessage, usize)>> {
    let Some(newline_position) = bytes
        .iter()
        .take(MAX_REQUEST_LINE_LENGTH.saturating_add(1))
        .position(|byte| *byte == b'\n')
    else {
        ensure!(
            bytes.len() <= MAX_REQUEST_LINE_LENGTH,
            Error::RequestLineTooLong {
                maximum: MAX_REQUEST_LINE_LENGTH,
            },
        );

        return Ok(None);
    };

    let (line, rest) = bytes.split_at(newline_position);
    let line = core::str::from_utf8(line)?;
    let (header_length, body_length) = parse_request_line(line)?;

    let too_long = Error::MessageTooLong {
        header_length,
        body_length,
        maximum: max_message_length,
    };

    let message_length = header_length
        .checked_add(body_length)
        .filter(|length| *length <= max_message_length)
        .ok_or(too_long)?;

    let Some(rest) = rest.get(1..) else {
        return Ok(None);
    };

    if rest.len() < message_length {
        return Ok(None);
    }

    let (header, rest) = rest.split_at(header_length);
    let (body, _) = rest.split_at(body_length);

    let Header { method_id, id } = bson::from_slice(header)?;
    let method = RpcMethod::try_from(method_id)?;
    let Body { body } = bson::from_slice(body)?;

    // Cannot overflow because the request line is shorter than `MAX_REQUEST_LINE_LENGTH`.
    let consumed = newline_position
        .saturating_add(1)
        .saturating_add(message_length);

    debug!("decoded {method} message (id: {id}, length: {consumed})");

    Ok(Some((RpcMessage { id, method, body }, consumed)))
}

/// Builds a `Goodbye` message with an empty body.
pub fn goodbye(counter: &RequestCounter) -> Result<Vec<u8>> {
    encode(RpcMethod::Goodbye, &Document::new(), counter.next())
}

fn parse_request_line(line: &str) -> Result<(usize, usize)> {
    let malformed = || Error::MalformedRequestLine {
        line: line.to_owned(),
    };

    let mut parts = line.split(' ');

    let (Some(preamble), Some(_version), Some(protocol), Some(header_length), Some(body_length)) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(malformed().into());
    };

    ensure!(
        preamble == PREAMBLE && protocol == PROTOCOL && parts.next().is_none(),
        malformed(),
    );

    let header_length = header_length.parse().map_err(|_| malformed())?;
    let body_length = body_length.parse().map_err(|_| malformed())?;

    Ok((header_length, body_length))
}

/// Adapts [`encode`] and [`decode`] to [`tokio_util::codec`].
pub struct RpcCodec {
    max_message_length: usize,
}

impl Default for RpcCodec {
    fn default() -> Self {
        Self::with_max_message_length(MAX_MESSAGE_LENGTH)
    }
}

impl RpcCodec {
    #[must_use]
    pub const fn with_max_message_length(max_message_length: usize) -> Self {
        Self { max_message_length }
    }
}

impl Decoder for RpcCodec {
    type Item = RpcMessage;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some((message, length)) = decode_with_limit(src, self.max_message_length)? else {
            return Ok(None);
        };

        src.advance(length);

        Ok(Some(message))
    }
}

impl Encoder<RpcMessage> for RpcCodec {
    type Error = anyhow::Error;

    fn encode(&mut self, item: RpcMessage, dst: &mut BytesMut) -> Result<()> {
        let RpcMessage { id, method, body } = item;
        dst.put_slice(encode(method, &body, id)?.as_slice());
        Ok(())
    }
}

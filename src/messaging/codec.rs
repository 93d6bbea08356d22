// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Broker frame codec.
//!
//! Frames carry a small header block (`command`, `destination`,
//! `content-length`) terminated by a blank line, followed by exactly
//! `content-length` body bytes. Both `\r\n\r\n` and `\n\n` terminate the
//! header block.

use crate::engine_core::constants::{limits, messaging};
use crate::messaging::transport::TransportError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub destination: String,
    pub body: Bytes,
}

impl Frame {
    pub fn send(destination: impl Into<String>, body: Bytes) -> Self {
        Self {
            command: messaging::COMMAND_SEND.to_string(),
            destination: destination.into(),
            body,
        }
    }

    pub fn subscribe(destination: impl Into<String>) -> Self {
        Self {
            command: messaging::COMMAND_SUBSCRIBE.to_string(),
            destination: destination.into(),
            body: Bytes::new(),
        }
    }
}

// State machine for the header block
#[derive(Debug, Clone, PartialEq, Eq)]
enum DecodeState {
    Head,
    Body {
        len: usize,
        command: String,
        destination: String,
    },
}

pub struct FrameCodec {
    state: DecodeState,
}

impl FrameCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecodeState::Head,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn codec_error(msg: impl Into<String>) -> TransportError {
    TransportError::Codec(msg.into())
}

/// Index just past the blank line ending the header block, if present.
fn find_header_end(src: &[u8]) -> Option<usize> {
    for i in 0..src.len() {
        if src[i] != b'\n' {
            continue;
        }
        if i >= 1 && src[i - 1] == b'\n' {
            return Some(i + 1);
        }
        if i >= 3 && src[i - 1] == b'\r' && src[i - 2] == b'\n' && src[i - 3] == b'\r' {
            return Some(i + 1);
        }
    }
    None
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, TransportError> {
        loop {
            match &self.state {
                DecodeState::Head => {
                    let Some(end) = find_header_end(src) else {
                        if src.len() > limits::MAX_HEADER_SIZE_BYTES {
                            return Err(codec_error("Header too large"));
                        }
                        return Ok(None);
                    };

                    let header_bytes = src.split_to(end);
                    let header_str = std::str::from_utf8(&header_bytes)
                        .map_err(|_| codec_error("Invalid UTF-8 in headers"))?;

                    let mut len = None;
                    let mut command = None;
                    let mut destination = None;
                    for line in header_str.lines() {
                        let Some((key, value)) = line.split_once(':') else {
                            continue;
                        };
                        let value = value.trim();
                        match key.trim().to_ascii_lowercase().as_str() {
                            messaging::HEADER_CONTENT_LENGTH => {
                                len = Some(value.parse::<usize>().map_err(|_| {
                                    codec_error("Invalid content-length value")
                                })?);
                            }
                            messaging::HEADER_COMMAND => command = Some(value.to_string()),
                            messaging::HEADER_DESTINATION => destination = Some(value.to_string()),
                            _ => {}
                        }
                    }

                    let len = len.ok_or_else(|| codec_error("Missing content-length header"))?;
                    if len as u64 > limits::MAX_MESSAGE_SIZE_BYTES {
                        return Err(codec_error(format!(
                            "Message length {} exceeds max limit",
                            len
                        )));
                    }
                    let command = command.ok_or_else(|| codec_error("Missing command header"))?;
                    let destination =
                        destination.ok_or_else(|| codec_error("Missing destination header"))?;

                    trace!(%command, %destination, len, "Decoded frame header");
                    self.state = DecodeState::Body {
                        len,
                        command,
                        destination,
                    };
                }
                DecodeState::Body { len, .. } => {
                    let len = *len;
                    if src.len() < len {
                        return Ok(None);
                    }
                    if let DecodeState::Body {
                        command,
                        destination,
                        ..
                    } = std::mem::replace(&mut self.state, DecodeState::Head)
                    {
                        let body = src.split_to(len).freeze();
                        return Ok(Some(Frame {
                            command,
                            destination,
                            body,
                        }));
                    }
                }
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), TransportError> {
        if item.destination.contains(['\r', '\n']) || item.command.contains(['\r', '\n']) {
            return Err(codec_error("Header values must not contain line breaks"));
        }
        let header = format!(
            "{}: {}\r\n{}: {}\r\n{}: {}\r\n\r\n",
            messaging::HEADER_COMMAND,
            item.command,
            messaging::HEADER_DESTINATION,
            item.destination,
            messaging::HEADER_CONTENT_LENGTH,
            item.body.len()
        );
        dst.reserve(header.len() + item.body.len());
        dst.extend_from_slice(header.as_bytes());
        dst.extend_from_slice(&item.body);
        Ok(())
    }
}

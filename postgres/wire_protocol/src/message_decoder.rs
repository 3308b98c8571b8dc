// Copyright 2025 - present Mallard Project Developers
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

use crate::{cursor::Cursor, messages::FrontendMessage, Error, Result};
use std::mem;

/// Represents a status of a `MessageDecoder` stage
#[derive(Debug, PartialEq)]
pub enum Status {
    /// `MessageDecoder` requests buffer with specified size
    Requesting(usize),
    /// `MessageDecoder` is in a process of decoding and decoded front message
    /// will be available after the next stage
    Decoding,
    /// `MessageDecoder` has decoded a message and returns its content
    Done(FrontendMessage),
}

#[derive(Debug)]
enum State {
    RequestingTag,
    RequestingLen,
    RequestingPayload,
    Decoding(Vec<u8>),
}

/// Decodes post-startup messages from a client. Every message is framed as
/// `{type:1 byte}{length:u32 including itself}{payload}`; the decoder always
/// requests the full payload so that unsupported messages cannot leave the
/// connection misaligned.
#[derive(Debug)]
pub struct MessageDecoder {
    state: State,
    tag: u8,
}

impl Default for MessageDecoder {
    fn default() -> MessageDecoder {
        MessageDecoder::new()
    }
}

impl MessageDecoder {
    /// Creates new `MessageDecoder`
    pub fn new() -> MessageDecoder {
        MessageDecoder {
            state: State::RequestingTag,
            tag: 0,
        }
    }

    /// Proceed to the next stage of decoding received message
    pub fn next_stage(&mut self, payload: Option<&[u8]>) -> Result<Status> {
        let payload = payload.unwrap_or(&[]);
        match mem::replace(&mut self.state, State::RequestingTag) {
            State::RequestingTag => {
                if payload.is_empty() {
                    Ok(Status::Requesting(1))
                } else {
                    self.tag = payload[0];
                    self.state = State::RequestingLen;
                    Ok(Status::Requesting(4))
                }
            }
            State::RequestingLen => {
                let len = Cursor::from(payload).read_i32()?;
                if len < 4 {
                    return Err(Error::InvalidMessageLength);
                }
                self.state = State::RequestingPayload;
                Ok(Status::Requesting(len as usize - 4))
            }
            State::RequestingPayload => {
                self.state = State::Decoding(payload.to_vec());
                Ok(Status::Decoding)
            }
            State::Decoding(data) => {
                let message = FrontendMessage::decode(self.tag, &data)?;
                Ok(Status::Done(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{QUERY, TERMINATE};

    const QUERY_STRING: &str = "select * from t\0";
    const QUERY_BYTES: &[u8] = QUERY_STRING.as_bytes();
    const LEN: i32 = QUERY_STRING.len() as i32 + 4;

    #[test]
    fn request_message_tag() {
        let mut decoder = MessageDecoder::new();

        assert_eq!(decoder.next_stage(None), Ok(Status::Requesting(1)));
    }

    #[test]
    fn request_message_len() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        assert_eq!(decoder.next_stage(Some(&[QUERY])), Ok(Status::Requesting(4)));
    }

    #[test]
    fn request_message_payload() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[QUERY])).expect("proceed to the next stage");
        assert_eq!(
            decoder.next_stage(Some(&LEN.to_be_bytes())),
            Ok(Status::Requesting((LEN - 4) as usize))
        );
    }

    #[test]
    fn decoding_message() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[QUERY])).expect("proceed to the next stage");
        decoder
            .next_stage(Some(&LEN.to_be_bytes()))
            .expect("proceed to the next stage");

        assert_eq!(decoder.next_stage(Some(QUERY_BYTES)), Ok(Status::Decoding));
    }

    #[test]
    fn decoded_query_message() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[QUERY])).expect("proceed to the next stage");
        decoder
            .next_stage(Some(&LEN.to_be_bytes()))
            .expect("proceed to the next stage");
        decoder.next_stage(Some(QUERY_BYTES)).expect("proceed to the next stage");

        assert_eq!(
            decoder.next_stage(None),
            Ok(Status::Done(FrontendMessage::Query {
                sql: "select * from t".to_owned()
            }))
        );
    }

    #[test]
    fn full_cycle() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[QUERY])).expect("proceed to the next stage");
        decoder
            .next_stage(Some(&LEN.to_be_bytes()))
            .expect("proceed to the next stage");
        decoder.next_stage(Some(QUERY_BYTES)).expect("proceed to the next stage");
        decoder.next_stage(None).expect("proceed to the next stage");

        assert_eq!(decoder.next_stage(None), Ok(Status::Requesting(1)));
    }

    #[test]
    fn terminate_message_has_empty_payload() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[TERMINATE])).expect("proceed to the next stage");
        assert_eq!(decoder.next_stage(Some(&4i32.to_be_bytes())), Ok(Status::Requesting(0)));
        assert_eq!(decoder.next_stage(Some(&[])), Ok(Status::Decoding));
        assert_eq!(decoder.next_stage(None), Ok(Status::Done(FrontendMessage::Terminate)));
    }

    #[test]
    fn unsupported_message_body_is_drained() {
        let mut decoder = MessageDecoder::new();
        let body = b"portal\0statement\0";

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[b'B'])).expect("proceed to the next stage");
        assert_eq!(
            decoder.next_stage(Some(&(body.len() as i32 + 4).to_be_bytes())),
            Ok(Status::Requesting(body.len()))
        );
        decoder.next_stage(Some(body)).expect("proceed to the next stage");
        assert_eq!(
            decoder.next_stage(None),
            Ok(Status::Done(FrontendMessage::Skipped { tag: b'B' }))
        );

        // the decoder is aligned on the next message boundary
        assert_eq!(decoder.next_stage(None), Ok(Status::Requesting(1)));
    }

    #[test]
    fn message_len_below_minimum() {
        let mut decoder = MessageDecoder::new();

        decoder.next_stage(None).expect("proceed to the next stage");
        decoder.next_stage(Some(&[QUERY])).expect("proceed to the next stage");
        assert_eq!(decoder.next_stage(Some(&3i32.to_be_bytes())), Err(Error::InvalidMessageLength));
    }
}

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

use crate::{
    cursor::Cursor, ConnId, ConnSecretKey, Error, Result, CANCEL_REQUEST_CODE, SSL_REQUEST_CODE, VERSION_1_CODE,
    VERSION_2_CODE, VERSION_3_CODE,
};

/// Connection key-value params
pub type Props = Vec<(String, String)>;

/// What the hand-shake process needs from its driver to continue
#[derive(Debug, PartialEq)]
pub enum Request {
    /// Read exactly this many bytes from the socket
    Buffer(usize),
    /// The client sent an `SSLRequest`. The driver has to answer it (this
    /// gateway always declines with [`REJECT_SSL`](crate::REJECT_SSL)) and
    /// resume the process; the startup message that follows is framed from
    /// scratch, no bytes of it are consumed here.
    UpgradeToSsl,
}

/// Represents a status of the hand-shake process
#[derive(Debug, PartialEq)]
pub enum Status {
    /// Hand-shake process requesting additional data or action to proceed
    /// further
    Requesting(Request),
    /// Hand-shake is finished. Contains the protocol version word and the
    /// startup parameters sent by a client
    Done(i32, Props),
    /// Hand-shake resulted in a request to cancel a query that is running on
    /// another connection
    Cancel(ConnId, ConnSecretKey),
}

#[derive(Debug, PartialEq)]
enum State {
    MessageLen,
    SetupMessage,
}

/// Startup phase of a PostgreSQL connection. The process does no I/O itself:
/// it asks its driver for exact byte counts until the startup message (or a
/// cancel request) is complete. During this phase inbound messages carry no
/// type byte.
#[derive(Debug)]
pub struct Process {
    state: State,
}

impl Process {
    /// Creates a new process in its initial state
    pub fn start() -> Process {
        Process { state: State::MessageLen }
    }

    /// Proceed to the next stage of the hand-shake with the bytes requested
    /// by the previous stage
    pub fn next_stage(&mut self, payload: Option<&[u8]>) -> Result<Status> {
        match self.state {
            State::MessageLen => match payload {
                None => Ok(Status::Requesting(Request::Buffer(4))),
                Some(buf) => {
                    let len = Cursor::from(buf).read_i32()?;
                    if len < 8 {
                        return Err(Error::InvalidMessageLength);
                    }
                    self.state = State::SetupMessage;
                    Ok(Status::Requesting(Request::Buffer(len as usize - 4)))
                }
            },
            State::SetupMessage => {
                let buf = payload.ok_or(Error::InvalidMessageLength)?;
                let mut cursor = Cursor::from(buf);
                let code = cursor.read_i32()?;
                log::trace!("connection code {:#x}", code);
                match code {
                    VERSION_1_CODE | VERSION_2_CODE => Err(Error::UnsupportedVersion),
                    VERSION_3_CODE => {
                        let mut props = vec![];
                        loop {
                            if cursor.is_empty() {
                                break;
                            }
                            let key = cursor.read_cstr()?;
                            if key.is_empty() {
                                break;
                            }
                            let value = cursor.read_cstr()?;
                            props.push((key, value));
                        }
                        Ok(Status::Done(code, props))
                    }
                    CANCEL_REQUEST_CODE => {
                        let conn_id = cursor.read_i32()?;
                        let secret_key = cursor.read_i32()?;
                        Ok(Status::Cancel(conn_id, secret_key))
                    }
                    SSL_REQUEST_CODE => {
                        self.state = State::MessageLen;
                        Ok(Status::Requesting(Request::UpgradeToSsl))
                    }
                    _ => Err(Error::UnsupportedRequest),
                }
            }
        }
    }
}

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

use crate::{ColumnDescription, ConnId, ConnSecretKey, Error, Result};
use std::str;

pub(crate) const QUERY: u8 = b'Q';
pub(crate) const TERMINATE: u8 = b'X';

const AUTHENTICATION: u8 = b'R';
const PARAMETER_STATUS: u8 = b'S';
const BACKEND_KEY_DATA: u8 = b'K';
const READY_FOR_QUERY: u8 = b'Z';
const ROW_DESCRIPTION: u8 = b'T';
const DATA_ROW: u8 = b'D';
const COMMAND_COMPLETE: u8 = b'C';
const EMPTY_QUERY_RESPONSE: u8 = b'I';
const ERROR_RESPONSE: u8 = b'E';
const SEVERITY: u8 = b'S';
const CODE: u8 = b'C';
const MESSAGE: u8 = b'M';
const IDLE: u8 = b'I';

/// Frontend PostgreSQL Wire Protocol messages decoded after the startup phase
#[derive(Debug, PartialEq)]
pub enum FrontendMessage {
    /// Client commands to execute a `Query`
    Query {
        /// The SQL to execute.
        sql: String,
    },
    /// Client commands to terminate current connection
    Terminate,
    /// Any other message. Its body has already been consumed so that the
    /// framer stays aligned on the next message boundary.
    Skipped {
        /// The type byte of the message
        tag: u8,
    },
}

impl FrontendMessage {
    pub(crate) fn decode(tag: u8, body: &[u8]) -> Result<FrontendMessage> {
        match tag {
            QUERY => {
                let body = match body.last() {
                    Some(0) => &body[..body.len() - 1],
                    _ => body,
                };
                match str::from_utf8(body) {
                    Ok(sql) => Ok(FrontendMessage::Query { sql: sql.to_owned() }),
                    Err(_) => Err(Error::QueryIsNotValidUtfString),
                }
            }
            TERMINATE => Ok(FrontendMessage::Terminate),
            _ => Ok(FrontendMessage::Skipped { tag }),
        }
    }
}

/// Backend PostgreSQL Wire Protocol messages
/// see https://www.postgresql.org/docs/12/protocol-message-formats.html
#[derive(Clone, Debug, PartialEq)]
pub enum BackendMessage {
    /// The authentication exchange is successfully completed.
    AuthenticationOk,
    /// This message informs the frontend about the current (initial) setting
    /// of backend parameters, such as client_encoding or DateStyle
    ParameterStatus(String, String),
    /// Cancellation key data. The frontend must save these values if it
    /// wishes to be able to issue CancelRequest messages later.
    BackendKeyData(ConnId, ConnSecretKey),
    /// Start-up is completed. The frontend can now issue commands.
    ReadyForQuery,
    /// Indicates that rows are about to be returned in response to a SELECT
    /// query. The contents of this message describe the column layout of the
    /// rows. This will be followed by a DataRow message for each row being
    /// returned to the frontend.
    RowDescription(Vec<ColumnDescription>),
    /// One of the set of rows returned by a SELECT query. `None` fields are
    /// SQL NULL and encoded with length `-1` so that a client can tell them
    /// from empty strings.
    DataRow(Vec<Option<String>>),
    /// An SQL command completed normally.
    CommandComplete(String),
    /// An empty query string was recognized.
    EmptyQueryResponse,
    /// An error has occurred. Contains (`Severity`, `SQLSTATE code`,
    /// `Error Message`).
    ErrorResponse(&'static str, &'static str, String),
}

impl BackendMessage {
    /// returns binary representation of a backend message
    pub fn as_vec(&self) -> Vec<u8> {
        match self {
            BackendMessage::AuthenticationOk => vec![AUTHENTICATION, 0, 0, 0, 8, 0, 0, 0, 0],
            BackendMessage::ReadyForQuery => vec![READY_FOR_QUERY, 0, 0, 0, 5, IDLE],
            BackendMessage::EmptyQueryResponse => vec![EMPTY_QUERY_RESPONSE, 0, 0, 0, 4],
            BackendMessage::ParameterStatus(name, value) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(name.as_bytes());
                payload.push(0);
                payload.extend_from_slice(value.as_bytes());
                payload.push(0);
                frame(PARAMETER_STATUS, payload)
            }
            BackendMessage::BackendKeyData(conn_id, secret_key) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(&conn_id.to_be_bytes());
                payload.extend_from_slice(&secret_key.to_be_bytes());
                frame(BACKEND_KEY_DATA, payload)
            }
            BackendMessage::RowDescription(description) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(&(description.len() as i16).to_be_bytes());
                for column in description {
                    payload.extend_from_slice(column.name.as_bytes());
                    payload.push(0); // end of c string
                    payload.extend_from_slice(&0u32.to_be_bytes()); // table oid
                    payload.extend_from_slice(&column.column_number.to_be_bytes());
                    payload.extend_from_slice(&column.type_oid.to_be_bytes());
                    payload.extend_from_slice(&column.type_len.to_be_bytes());
                    payload.extend_from_slice(&(-1i32).to_be_bytes()); // type modifier
                    payload.extend_from_slice(&0i16.to_be_bytes()); // text format
                }
                frame(ROW_DESCRIPTION, payload)
            }
            BackendMessage::DataRow(row) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(&(row.len() as i16).to_be_bytes());
                for field in row {
                    match field {
                        None => payload.extend_from_slice(&(-1i32).to_be_bytes()),
                        Some(value) => {
                            payload.extend_from_slice(&(value.len() as i32).to_be_bytes());
                            payload.extend_from_slice(value.as_bytes());
                        }
                    }
                }
                frame(DATA_ROW, payload)
            }
            BackendMessage::CommandComplete(tag) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(tag.as_bytes());
                payload.push(0);
                frame(COMMAND_COMPLETE, payload)
            }
            BackendMessage::ErrorResponse(severity, code, message) => {
                let mut payload = Vec::new();
                payload.push(SEVERITY);
                payload.extend_from_slice(severity.as_bytes());
                payload.push(0);
                payload.push(CODE);
                payload.extend_from_slice(code.as_bytes());
                payload.push(0);
                payload.push(MESSAGE);
                payload.extend_from_slice(message.as_bytes());
                payload.push(0);
                payload.push(0); // end of the field list
                frame(ERROR_RESPONSE, payload)
            }
        }
    }
}

// the length is computed after payload assembly and includes itself
fn frame(tag: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut buff = Vec::with_capacity(payload.len() + 5);
    buff.push(tag);
    buff.extend_from_slice(&(payload.len() as i32 + 4).to_be_bytes());
    buff.extend_from_slice(&payload);
    buff
}


#[cfg(test)]
mod serialized_messages {
    use super::*;

    #[test]
    fn authentication_ok() {
        assert_eq!(
            BackendMessage::AuthenticationOk.as_vec(),
            vec![AUTHENTICATION, 0, 0, 0, 8, 0, 0, 0, 0]
        )
    }

    #[test]
    fn parameter_status() {
        assert_eq!(
            BackendMessage::ParameterStatus("client_encoding".to_owned(), "UTF8".to_owned()).as_vec(),
            vec![
                PARAMETER_STATUS,
                0,
                0,
                0,
                25,
                99,
                108,
                105,
                101,
                110,
                116,
                95,
                101,
                110,
                99,
                111,
                100,
                105,
                110,
                103,
                0,
                85,
                84,
                70,
                56,
                0
            ]
        )
    }

    #[test]
    fn backend_key_data() {
        assert_eq!(
            BackendMessage::BackendKeyData(1, 2).as_vec(),
            vec![BACKEND_KEY_DATA, 0, 0, 0, 12, 0, 0, 0, 1, 0, 0, 0, 2]
        )
    }

    #[test]
    fn ready_for_query() {
        assert_eq!(
            BackendMessage::ReadyForQuery.as_vec(),
            vec![READY_FOR_QUERY, 0, 0, 0, 5, IDLE]
        )
    }

    #[test]
    fn row_description() {
        assert_eq!(
            BackendMessage::RowDescription(vec![ColumnDescription::new("c1", crate::INT, 1)]).as_vec(),
            vec![
                ROW_DESCRIPTION,
                0,
                0,
                0,
                27,
                0,
                1,
                99,
                49,
                0,
                0,
                0,
                0,
                0,
                0,
                1,
                0,
                0,
                0,
                23,
                0,
                4,
                255,
                255,
                255,
                255,
                0,
                0
            ]
        );
    }

    #[test]
    fn data_row() {
        assert_eq!(
            BackendMessage::DataRow(vec![
                Some("1".to_owned()),
                Some("2".to_owned()),
                Some("3".to_owned())
            ])
            .as_vec(),
            vec![DATA_ROW, 0, 0, 0, 21, 0, 3, 0, 0, 0, 1, 49, 0, 0, 0, 1, 50, 0, 0, 0, 1, 51]
        )
    }

    #[test]
    fn data_row_with_null_field() {
        // NULL is the special length -1, an empty string is length 0
        assert_eq!(
            BackendMessage::DataRow(vec![None, Some("".to_owned())]).as_vec(),
            vec![DATA_ROW, 0, 0, 0, 14, 0, 2, 255, 255, 255, 255, 0, 0, 0, 0]
        )
    }

    #[test]
    fn command_complete() {
        assert_eq!(
            BackendMessage::CommandComplete("SELECT".to_owned()).as_vec(),
            vec![COMMAND_COMPLETE, 0, 0, 0, 11, 83, 69, 76, 69, 67, 84, 0]
        )
    }

    #[test]
    fn empty_query_response() {
        assert_eq!(
            BackendMessage::EmptyQueryResponse.as_vec(),
            vec![EMPTY_QUERY_RESPONSE, 0, 0, 0, 4]
        )
    }

    #[test]
    fn error_response() {
        assert_eq!(
            BackendMessage::ErrorResponse("ERROR", "42000", "nope".to_owned()).as_vec(),
            vec![
                ERROR_RESPONSE,
                0,
                0,
                0,
                25,
                SEVERITY,
                69,
                82,
                82,
                79,
                82,
                0,
                CODE,
                52,
                50,
                48,
                48,
                48,
                0,
                MESSAGE,
                110,
                111,
                112,
                101,
                0,
                0
            ]
        )
    }
}

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

//! Server-side building blocks for the PostgreSQL Wire Protocol: the frame
//! codec, the startup hand-shake process, the frontend message decoder and
//! the connection id supervisor.

mod conn_supervisor;
mod cursor;
/// Module contains the resumable startup hand-shake state machine
pub mod hand_shake;
/// Module contains the resumable frontend message decoder
pub mod message_decoder;
/// Module contains frontend and backend protocol messages
pub mod messages;

pub use conn_supervisor::ConnSupervisor;
pub use messages::{BackendMessage, FrontendMessage};

/// Protocol operation result
pub type Result<T> = std::result::Result<T, Error>;

/// Connection ID
pub type ConnId = i32;
/// Connection secret key
pub type ConnSecretKey = i32;

/// Version 1 of the protocol
pub const VERSION_1_CODE: i32 = 0x0001_0000;
/// Version 2 of the protocol
pub const VERSION_2_CODE: i32 = 0x0002_0000;
/// Version 3 of the protocol
pub const VERSION_3_CODE: i32 = 0x0003_0000;
/// Client initiates a cancel of a running query
pub const CANCEL_REQUEST_CODE: i32 = (1234 << 16) + 5678;
/// Client initiates an `ssl` encrypted connection
pub const SSL_REQUEST_CODE: i32 = (1234 << 16) + 5679;

/// Single byte answer declining an `SSLRequest`
pub const REJECT_SSL: u8 = b'N';

// type oids
pub const BOOL: u32 = 16;
pub const BYTEA: u32 = 17;
pub const BIGINT: u32 = 20;
pub const SMALLINT: u32 = 21;
pub const INT: u32 = 23;
pub const FLOAT4: u32 = 700;
pub const FLOAT8: u32 = 701;
pub const CHAR: u32 = 1042;
pub const VARCHAR: u32 = 1043;
pub const DATE: u32 = 1082;
pub const TIME: u32 = 1083;
pub const TIMESTAMP: u32 = 1114;
pub const NUMERIC: u32 = 1700;

/// Returns the wire length of a PostgreSQL type, `-1` for variable length
pub fn type_len(oid: u32) -> i16 {
    match oid {
        BOOL => 1,
        SMALLINT => 2,
        INT | FLOAT4 | DATE => 4,
        BIGINT | FLOAT8 | TIME | TIMESTAMP => 8,
        _ => -1,
    }
}

/// `Error` type in protocol `Result`. Indicates that something went not well
#[derive(Debug, PartialEq)]
pub enum Error {
    /// Indicates that incoming query can't be parsed as UTF-8 string
    QueryIsNotValidUtfString,
    /// Indicates that protocol version is not supported
    UnsupportedVersion,
    /// Indicates that client request is not supported
    UnsupportedRequest,
    /// Indicates that a message declared a length its payload can't have
    InvalidMessageLength,
    /// Indicates that a cancel request carried a secret key that does not
    /// match the targeted connection
    VerificationFailed,
    /// Indicates that there is no free connection id left
    ConnectionIdExhausted,
}

/// Struct description of metadata that describes how client should interpret
/// outgoing selected data
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescription {
    /// name of the column that was specified in query
    pub name: String,
    /// PostgreSQL data type id
    pub type_oid: u32,
    /// 1-based attribute number of the column in the result set
    pub column_number: u16,
    /// PostgreSQL data type size, `-1` for variable length
    pub type_len: i16,
}

impl ColumnDescription {
    /// Creates new column metadata with the wire length of `type_oid`
    pub fn new(name: &str, type_oid: u32, column_number: u16) -> ColumnDescription {
        ColumnDescription {
            name: name.to_owned(),
            type_oid,
            column_number,
            type_len: type_len(type_oid),
        }
    }
}

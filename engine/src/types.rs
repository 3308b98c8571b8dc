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

use duckdb::types::Type;

/// Engine column types the gateway can advertise to PostgreSQL clients.
/// Anything the engine produces beyond this set is served as `Varchar` in
/// its text rendering.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Varchar,
    Char,
    Date,
    Time,
    Timestamp,
    Blob,
    Decimal,
}

impl SqlType {
    /// Maps a column type of an executed statement onto the advertised type
    pub(crate) fn of_column(column_type: &Type) -> SqlType {
        match column_type {
            Type::Boolean => SqlType::Boolean,
            Type::TinyInt => SqlType::TinyInt,
            Type::SmallInt | Type::UTinyInt => SqlType::SmallInt,
            Type::Int | Type::USmallInt => SqlType::Integer,
            Type::BigInt | Type::UInt => SqlType::BigInt,
            Type::HugeInt | Type::UBigInt | Type::Decimal => SqlType::Decimal,
            Type::Float => SqlType::Float,
            Type::Double => SqlType::Double,
            Type::Text => SqlType::Varchar,
            Type::Blob => SqlType::Blob,
            Type::Date32 => SqlType::Date,
            Type::Time64 => SqlType::Time,
            Type::Timestamp => SqlType::Timestamp,
            _ => SqlType::Varchar,
        }
    }

    /// PostgreSQL object id of the type
    pub fn pg_oid(&self) -> u32 {
        match self {
            SqlType::Boolean => wire_protocol::BOOL,
            SqlType::TinyInt | SqlType::SmallInt => wire_protocol::SMALLINT,
            SqlType::Integer => wire_protocol::INT,
            SqlType::BigInt => wire_protocol::BIGINT,
            SqlType::Float => wire_protocol::FLOAT4,
            SqlType::Double => wire_protocol::FLOAT8,
            SqlType::Varchar => wire_protocol::VARCHAR,
            SqlType::Char => wire_protocol::CHAR,
            SqlType::Date => wire_protocol::DATE,
            SqlType::Time => wire_protocol::TIME,
            SqlType::Timestamp => wire_protocol::TIMESTAMP,
            SqlType::Blob => wire_protocol::BYTEA,
            SqlType::Decimal => wire_protocol::NUMERIC,
        }
    }
}

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

//! Thin facade around the embedded analytic engine. A process holds a single
//! [`Engine`]; every client session draws a dedicated [`EngineConnection`]
//! from it so that `ATTACH` and `USE` establish per-session database context
//! without cross-talk. Queries are materialized into [`QueryOutcome`]s whose
//! values are already rendered for the text protocol.

mod outcome;
mod types;
mod value;

pub use outcome::{Column, DataChunk, QueryOutcome, StatementKind};
pub use types::SqlType;

use duckdb::types::Value;
use std::fmt::{self, Display, Formatter};

/// Rows per materialized chunk, matching the engine's vector size
const CHUNK_CAPACITY: usize = 2048;

/// Error reported by the embedded engine
#[derive(Debug, PartialEq, Clone)]
pub struct EngineError(String);

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<duckdb::Error> for EngineError {
    fn from(error: duckdb::Error) -> EngineError {
        EngineError(error.to_string())
    }
}

/// Process-wide handle to the embedded database. Created before the acceptor
/// starts and dropped after the last session is gone.
pub struct Engine {
    connection: duckdb::Connection,
}

impl Engine {
    /// Opens an in-memory database. Session databases are attached on disk
    /// later, one per `database` startup parameter.
    pub fn in_memory() -> Result<Engine, EngineError> {
        Ok(Engine {
            connection: duckdb::Connection::open_in_memory()?,
        })
    }

    /// Draws a dedicated connection for a session
    pub fn connection(&self) -> Result<EngineConnection, EngineError> {
        Ok(EngineConnection {
            connection: self.connection.try_clone()?,
        })
    }
}

/// A session's own connection into the shared database. All calls block and
/// must be confined to the worker pool.
pub struct EngineConnection {
    connection: duckdb::Connection,
}

impl EngineConnection {
    /// Attaches `<data_dir>/<name>.db` and makes it the session's current
    /// database
    pub fn attach_database(&self, data_dir: &str, name: &str) -> Result<(), EngineError> {
        self.connection
            .execute_batch(&format!("ATTACH '{}/{}.db';", data_dir, name))?;
        self.connection.execute_batch(&format!("USE {};", name))?;
        Ok(())
    }

    /// Runs a single statement and materializes its full result
    pub fn run(&self, sql: &str) -> Result<QueryOutcome, EngineError> {
        let kind = StatementKind::classify(sql);
        let mut statement = self.connection.prepare(sql)?;
        let mut rows = statement.query([])?;

        let columns: Vec<Column> = match rows.as_ref() {
            Some(executed) => {
                let names = executed.column_names();
                names
                    .into_iter()
                    .enumerate()
                    .map(|(index, name)| {
                        Column::new(name, SqlType::of_column(&duckdb::types::Type::from(&executed.column_type(index))))
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let mut chunks = Vec::new();
        let mut current: Vec<Vec<Option<String>>> = Vec::new();
        let mut row_count = 0;
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let field: Value = row.get(index)?;
                fields.push(value::text_of(&field));
            }
            current.push(fields);
            row_count += 1;
            if current.len() == CHUNK_CAPACITY {
                chunks.push(DataChunk::new(std::mem::take(&mut current)));
            }
        }
        if !current.is_empty() {
            chunks.push(DataChunk::new(current));
        }

        log::trace!("materialized {} row(s) of {:?} statement", row_count, kind);
        Ok(QueryOutcome::new(kind, columns, chunks, row_count))
    }
}

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

use crate::SqlType;
use std::collections::VecDeque;

/// The engine's classification of an executed statement. The gateway derives
/// it from the leading keyword since it never parses SQL itself.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Explain,
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str) -> StatementKind {
        let keyword: String = sql
            .trim_start()
            .trim_start_matches('(')
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        match keyword.to_ascii_uppercase().as_str() {
            // common table expressions and the engine's FROM-first syntax
            // both produce result sets
            "SELECT" | "WITH" | "FROM" => StatementKind::Select,
            "INSERT" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "EXPLAIN" => StatementKind::Explain,
            _ => StatementKind::Other,
        }
    }
}

/// Selected column of a materialized result
#[derive(Debug, PartialEq, Clone)]
pub struct Column {
    name: String,
    sql_type: SqlType,
}

impl Column {
    pub fn new(name: String, sql_type: SqlType) -> Column {
        Column { name, sql_type }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }
}

/// A batch of rows with values already rendered for the text protocol.
/// `None` is SQL NULL.
#[derive(Debug, PartialEq)]
pub struct DataChunk {
    rows: Vec<Vec<Option<String>>>,
}

impl DataChunk {
    pub(crate) fn new(rows: Vec<Vec<Option<String>>>) -> DataChunk {
        DataChunk { rows }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn into_rows(self) -> Vec<Vec<Option<String>>> {
        self.rows
    }
}

/// Fully materialized result of a statement
#[derive(Debug, PartialEq)]
pub struct QueryOutcome {
    kind: StatementKind,
    columns: Vec<Column>,
    chunks: VecDeque<DataChunk>,
    row_count: usize,
}

impl QueryOutcome {
    pub(crate) fn new(
        kind: StatementKind,
        columns: Vec<Column>,
        chunks: Vec<DataChunk>,
        row_count: usize,
    ) -> QueryOutcome {
        QueryOutcome {
            kind,
            columns,
            chunks: chunks.into(),
            row_count,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total number of materialized rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Pops the next batch of rows, front to back
    pub fn fetch(&mut self) -> Option<DataChunk> {
        self.chunks.pop_front()
    }
}

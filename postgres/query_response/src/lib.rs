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

//! Events and errors produced while serving a query, and their mapping onto
//! backend wire messages and command tags.

use std::fmt::{self, Display, Formatter};
use wire_protocol::{BackendMessage, ColumnDescription};

/// Result of serving a single step of a query
pub type QueryResult = std::result::Result<QueryEvent, QueryError>;

/// Represents successful events that can happen in server backend
#[derive(Clone, Debug, PartialEq)]
pub enum QueryEvent {
    /// Row description information
    RowDescription(Vec<ColumnDescription>),
    /// Row data
    DataRow(Vec<Option<String>>),
    /// Records selected from the database, with the row count when known
    RecordsSelected(Option<usize>),
    /// Number of records inserted into a table. The engine reports the count
    /// in its changes result; `None` means it reported nothing.
    RecordsInserted(Option<usize>),
    /// Number of records updated in a table
    RecordsUpdated(Option<usize>),
    /// Number of records deleted from a table
    RecordsDeleted(Option<usize>),
    /// A query plan was described
    Explained,
    /// A statement without a dedicated completion tag finished
    StatementCompleted,
    /// An empty query string was recognized
    EmptyQuery,
    /// Processing of the query is complete
    QueryComplete,
}

impl From<QueryEvent> for BackendMessage {
    fn from(event: QueryEvent) -> BackendMessage {
        fn tag_with_count(tag: &str, records: Option<usize>) -> BackendMessage {
            match records {
                Some(records) => BackendMessage::CommandComplete(format!("{} {}", tag, records)),
                None => BackendMessage::CommandComplete(format!("{} ", tag)),
            }
        }

        match event {
            QueryEvent::RowDescription(description) => BackendMessage::RowDescription(description),
            QueryEvent::DataRow(row) => BackendMessage::DataRow(row),
            QueryEvent::RecordsSelected(Some(records)) => {
                BackendMessage::CommandComplete(format!("SELECT {}", records))
            }
            QueryEvent::RecordsSelected(None) => BackendMessage::CommandComplete("SELECT".to_owned()),
            QueryEvent::RecordsInserted(records) => tag_with_count("INSERT 0", records),
            QueryEvent::RecordsUpdated(records) => tag_with_count("UPDATE", records),
            QueryEvent::RecordsDeleted(records) => tag_with_count("DELETE", records),
            QueryEvent::Explained => BackendMessage::CommandComplete("EXPLAIN".to_owned()),
            QueryEvent::StatementCompleted => BackendMessage::CommandComplete("COMMAND COMPLETE".to_owned()),
            QueryEvent::EmptyQuery => BackendMessage::EmptyQueryResponse,
            QueryEvent::QueryComplete => BackendMessage::ReadyForQuery,
        }
    }
}

/// Message severities
/// Reference: defined in https://www.postgresql.org/docs/12/protocol-error-fields.html
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Severity {
    Error,
    Fatal,
}

impl From<Severity> for &'static str {
    fn from(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
enum QueryErrorKind {
    EngineFailure(String),
    DatabaseUnavailable(String),
    ProtocolViolation(String),
    QueryCancelled,
}

impl QueryErrorKind {
    fn code(&self) -> &'static str {
        match self {
            QueryErrorKind::EngineFailure(_) => "42000",
            QueryErrorKind::DatabaseUnavailable(_) => "3D000",
            QueryErrorKind::ProtocolViolation(_) => "08P01",
            QueryErrorKind::QueryCancelled => "57014",
        }
    }
}

impl Display for QueryErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::EngineFailure(message) => write!(f, "{}", message),
            QueryErrorKind::DatabaseUnavailable(message) => write!(f, "{}", message),
            QueryErrorKind::ProtocolViolation(message) => write!(f, "{}", message),
            QueryErrorKind::QueryCancelled => write!(f, "canceling statement due to user request"),
        }
    }
}

/// Represents error during query execution
#[derive(Debug, PartialEq, Clone)]
pub struct QueryError {
    severity: Severity,
    kind: QueryErrorKind,
}

impl QueryError {
    fn code(&self) -> &'static str {
        self.kind.code()
    }

    fn severity(&self) -> &'static str {
        self.severity.into()
    }

    fn message(&self) -> String {
        format!("{}", self.kind)
    }

    /// the engine rejected or failed to execute a statement
    pub fn engine_failure<S: ToString>(message: S) -> QueryError {
        QueryError {
            severity: Severity::Error,
            kind: QueryErrorKind::EngineFailure(message.to_string()),
        }
    }

    /// the session database could not be attached
    pub fn database_unavailable<S: ToString>(message: S) -> QueryError {
        QueryError {
            severity: Severity::Fatal,
            kind: QueryErrorKind::DatabaseUnavailable(message.to_string()),
        }
    }

    /// protocol violation error constructor
    pub fn protocol_violation<S: ToString>(message: S) -> QueryError {
        QueryError {
            severity: Severity::Error,
            kind: QueryErrorKind::ProtocolViolation(message.to_string()),
        }
    }

    /// a running statement was aborted on client request
    pub fn query_cancelled() -> QueryError {
        QueryError {
            severity: Severity::Error,
            kind: QueryErrorKind::QueryCancelled,
        }
    }
}

impl From<QueryError> for BackendMessage {
    fn from(error: QueryError) -> BackendMessage {
        BackendMessage::ErrorResponse(error.severity(), error.code(), error.message())
    }
}


#[cfg(test)]
mod error_responses {
    use super::*;

    #[test]
    fn engine_failure() {
        let message: BackendMessage = QueryError::engine_failure("table does not exist").into();
        assert_eq!(
            message,
            BackendMessage::ErrorResponse("ERROR", "42000", "table does not exist".to_owned())
        );
    }

    #[test]
    fn database_unavailable() {
        let message: BackendMessage = QueryError::database_unavailable("cannot attach").into();
        assert_eq!(
            message,
            BackendMessage::ErrorResponse("FATAL", "3D000", "cannot attach".to_owned())
        );
    }

    #[test]
    fn protocol_violation() {
        let message: BackendMessage = QueryError::protocol_violation("unexpected message").into();
        assert_eq!(
            message,
            BackendMessage::ErrorResponse("ERROR", "08P01", "unexpected message".to_owned())
        );
    }

    #[test]
    fn query_cancelled() {
        let message: BackendMessage = QueryError::query_cancelled().into();
        assert_eq!(
            message,
            BackendMessage::ErrorResponse(
                "ERROR",
                "57014",
                "canceling statement due to user request".to_owned()
            )
        );
    }
}

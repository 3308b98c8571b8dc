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


use engine::{EngineConnection, QueryOutcome, StatementKind};
use query_response::{QueryError, QueryEvent, QueryResult};
use std::sync::Arc;
use wire_protocol::{BackendMessage, ColumnDescription, VARCHAR};

/// Some clients probe for this exact text before issuing real queries; the
/// gateway answers it itself, the engine has no pg_settings catalog.
const COMPATIBILITY_PROBE: &str = "SELECT reset_val FROM pg_settings WHERE name='polar_compatibility_mode';";

/// Trait to handle server to client query results for PostgreSQL Wire
/// Protocol connection
pub(crate) trait Sender: Send + Sync {
    /// Sends response messages to client. Most of the time it is a single
    /// message, select result is one of the exceptional situations
    fn send(&self, query_result: QueryResult);
}

/// Encodes query results and queues them for the session's writer task. The
/// writer drains the queue in order, which keeps a response's frames
/// contiguous on the socket.
pub(crate) struct FrameSender {
    frames: async_channel::Sender<Vec<u8>>,
}

impl FrameSender {
    pub(crate) fn new(frames: async_channel::Sender<Vec<u8>>) -> FrameSender {
        FrameSender { frames }
    }
}

impl Sender for FrameSender {
    fn send(&self, query_result: QueryResult) {
        let message: BackendMessage = match query_result {
            Ok(event) => event.into(),
            Err(error) => error.into(),
        };
        log::trace!("response message {:?}", message);
        if self.frames.try_send(message.as_vec()).is_err() {
            log::debug!("response dropped, connection is gone");
        }
    }
}

/// Serves one session's queries against its dedicated engine connection and
/// translates materialized results into response events.
pub(crate) struct QueryEngine {
    engine_connection: EngineConnection,
    sender: Arc<dyn Sender>,
}

impl QueryEngine {
    pub(crate) fn new(engine_connection: EngineConnection, sender: Arc<dyn Sender>) -> QueryEngine {
        QueryEngine {
            engine_connection,
            sender,
        }
    }

    /// Attaches the database named in the startup parameters and reports the
    /// session ready. Returns `false` when the session cannot be served; an
    /// error response has been sent in that case.
    pub(crate) fn initialize(&self, props: &[(String, String)], data_dir: &str) -> bool {
        let database = props
            .iter()
            .find(|(key, _)| key == "database")
            .map(|(_, value)| value.as_str())
            .unwrap_or_default();
        match self.engine_connection.attach_database(data_dir, database) {
            Ok(()) => {
                log::debug!("attached database '{}'", database);
                self.sender.send(Ok(QueryEvent::QueryComplete));
                true
            }
            Err(error) => {
                log::warn!("cannot attach database '{}': {}", database, error);
                self.sender.send(Err(QueryError::database_unavailable(error)));
                false
            }
        }
    }

    /// Runs a single simple-protocol query and emits its complete response
    /// followed by `ReadyForQuery`
    pub(crate) fn execute(&self, sql: &str) {
        log::debug!("received query: {}", sql);
        if sql.trim().is_empty() {
            self.sender.send(Ok(QueryEvent::EmptyQuery));
        } else if sql == COMPATIBILITY_PROBE {
            self.sender
                .send(Ok(QueryEvent::RowDescription(vec![ColumnDescription::new(
                    "reset_val",
                    VARCHAR,
                    1,
                )])));
            self.sender.send(Ok(QueryEvent::DataRow(vec![Some("pg".to_owned())])));
            self.sender.send(Ok(QueryEvent::RecordsSelected(None)));
        } else {
            match self.engine_connection.run(sql) {
                Ok(outcome) => self.process_outcome(outcome),
                Err(error) => self.sender.send(Err(QueryError::engine_failure(error))),
            }
        }
        self.sender.send(Ok(QueryEvent::QueryComplete));
    }

    fn process_outcome(&self, mut outcome: QueryOutcome) {
        match outcome.kind() {
            StatementKind::Select => self.process_select(outcome),
            StatementKind::Insert => self
                .sender
                .send(Ok(QueryEvent::RecordsInserted(changes_count(&mut outcome)))),
            StatementKind::Update => self
                .sender
                .send(Ok(QueryEvent::RecordsUpdated(changes_count(&mut outcome)))),
            StatementKind::Delete => self
                .sender
                .send(Ok(QueryEvent::RecordsDeleted(changes_count(&mut outcome)))),
            StatementKind::Explain => self.process_explain(outcome),
            StatementKind::Other => self.sender.send(Ok(QueryEvent::StatementCompleted)),
        }
    }

    fn process_select(&self, mut outcome: QueryOutcome) {
        let description = outcome
            .columns()
            .iter()
            .enumerate()
            .map(|(index, column)| {
                ColumnDescription::new(column.name(), column.sql_type().pg_oid(), index as u16 + 1)
            })
            .collect();
        self.sender.send(Ok(QueryEvent::RowDescription(description)));

        let selected = outcome.row_count();
        while let Some(chunk) = outcome.fetch() {
            for row in chunk.into_rows() {
                self.sender.send(Ok(QueryEvent::DataRow(row)));
            }
        }
        self.sender.send(Ok(QueryEvent::RecordsSelected(Some(selected))));
    }

    fn process_explain(&self, mut outcome: QueryOutcome) {
        self.sender
            .send(Ok(QueryEvent::RowDescription(vec![ColumnDescription::new(
                "QUERY PLAN",
                VARCHAR,
                1,
            )])));

        while let Some(chunk) = outcome.fetch() {
            for mut row in chunk.into_rows() {
                // the engine labels each plan in field 0 and renders it in
                // field 1
                let plan = if row.len() > 1 {
                    row.swap_remove(1)
                } else {
                    row.pop().flatten()
                };
                self.sender.send(Ok(QueryEvent::DataRow(vec![plan])));
            }
        }
        self.sender.send(Ok(QueryEvent::Explained));
    }
}

/// The engine reports rows affected by a data modification as the first
/// field of the first chunk of its changes result
fn changes_count(outcome: &mut QueryOutcome) -> Option<usize> {
    outcome
        .fetch()
        .and_then(|chunk| chunk.into_rows().into_iter().next())
        .and_then(|row| row.into_iter().next())
        .flatten()
        .and_then(|value| value.parse().ok())
}

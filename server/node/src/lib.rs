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

//! The gateway node: accepts PostgreSQL clients, performs the startup
//! exchange and serves their queries from the embedded engine.
//!
//! Every connection is split into three cooperating tasks. A reader decodes
//! frontend messages and queues query texts; an executor owns the session's
//! engine connection, runs queries FIFO and queues response frames; a writer
//! owns the socket's outbound half. Socket futures run on a single network
//! executor, executors with their blocking engine calls run on a fixed pool
//! of worker threads, so responses leave in request order while the reader
//! is already framing the next request.

mod config;
mod connection;
mod query_engine;

pub use config::NodeConfig;

use crate::{
    connection::{accept_client_request, ClientRequest},
    query_engine::{FrameSender, QueryEngine},
};
use async_dup::Arc as AsyncArc;
use async_executor::Executor;
use async_io::Async;
use engine::Engine;
use futures_lite::{future, AsyncWriteExt};
use query_response::QueryError;
use std::{io, net::TcpListener, panic, sync::Arc, thread};
use wire_protocol::{BackendMessage, ConnSupervisor, FrontendMessage};

const HOST: [u8; 4] = [0, 0, 0, 0];

const MIN_CONN_ID: i32 = 1;
const MAX_CONN_ID: i32 = 1 << 16;

/// Number of threads executing blocking engine calls. Bounds the engine
/// concurrency across all sessions.
const WORKER_POOL_SIZE: usize = 4;

/// Starts the gateway and serves clients until the process exits. Returns
/// early only when the listening socket or the embedded database cannot be
/// created.
pub fn start(config: NodeConfig) -> io::Result<()> {
    static NETWORK: Executor<'_> = Executor::new();
    static WORKER: Executor<'_> = Executor::new();

    thread::Builder::new()
        .name("network-thread".into())
        .spawn(|| loop {
            panic::catch_unwind(|| future::block_on(NETWORK.run(future::pending::<()>()))).ok();
        })
        .expect("cannot spawn executor thread");

    for thread_id in 0..WORKER_POOL_SIZE {
        thread::Builder::new()
            .name(format!("worker-{}-thread", thread_id))
            .spawn(|| loop {
                panic::catch_unwind(|| future::block_on(WORKER.run(future::pending::<()>()))).ok();
            })
            .expect("cannot spawn executor thread");
    }

    let engine = Engine::in_memory().map_err(|error| io::Error::new(io::ErrorKind::Other, error.to_string()))?;
    let conn_supervisor = ConnSupervisor::new(MIN_CONN_ID, MAX_CONN_ID);

    async_io::block_on(async move {
        let listener = Async::<TcpListener>::bind((HOST, config.port()))?;
        log::info!("server started on port {}", config.port());

        loop {
            let (tcp_stream, address) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(io_error) => {
                    log::error!("accept error {:?}", io_error);
                    continue;
                }
            };
            log::info!("new connection from {}", address);

            let shutdown_handle = match tcp_stream.get_ref().try_clone() {
                Ok(handle) => handle,
                Err(io_error) => {
                    log::error!("cannot duplicate socket handle {:?}", io_error);
                    continue;
                }
            };
            let channel = AsyncArc::new(tcp_stream);

            match accept_client_request(channel.clone(), &conn_supervisor).await {
                Err(io_error) => log::error!("IO error {:?}", io_error),
                Ok(Err(protocol_error)) => {
                    log::error!("protocol error {:?}", protocol_error);
                    let error: BackendMessage =
                        QueryError::protocol_violation(format!("{:?}", protocol_error)).into();
                    let mut socket = channel;
                    let _ = socket.write_all(error.as_vec().as_slice()).await;
                }
                Ok(Ok(ClientRequest::QueryCancellation(conn_id))) => {
                    // the registry knows the session but aborting a running
                    // statement is not wired up yet
                    log::debug!("cancel request of connection-{}", conn_id);
                }
                Ok(Ok(ClientRequest::Connection(mut receiver, props))) => {
                    let engine_connection = match engine.connection() {
                        Ok(engine_connection) => engine_connection,
                        Err(error) => {
                            log::error!("cannot draw engine connection {}", error);
                            continue;
                        }
                    };

                    let (frame_tx, frame_rx) = async_channel::unbounded();
                    let (sql_tx, sql_rx) = async_channel::unbounded::<String>();

                    NETWORK
                        .spawn(connection::pump_frames(channel, shutdown_handle, frame_rx))
                        .detach();

                    let data_dir = config.data_dir().to_owned();
                    WORKER
                        .spawn(async move {
                            let query_engine =
                                QueryEngine::new(engine_connection, Arc::new(FrameSender::new(frame_tx)));
                            if !query_engine.initialize(&props, &data_dir) {
                                return;
                            }
                            while let Ok(sql) = sql_rx.recv().await {
                                query_engine.execute(&sql);
                            }
                        })
                        .detach();

                    NETWORK
                        .spawn(async move {
                            loop {
                                match receiver.receive().await {
                                    Err(io_error) => {
                                        log::debug!("connection closed {:?}", io_error);
                                        break;
                                    }
                                    Ok(Err(protocol_error)) => {
                                        log::error!("protocol error {:?}", protocol_error);
                                        break;
                                    }
                                    Ok(Ok(FrontendMessage::Query { sql })) => {
                                        if sql_tx.send(sql).await.is_err() {
                                            break;
                                        }
                                    }
                                    Ok(Ok(FrontendMessage::Terminate)) => {
                                        log::debug!("closing connection with client");
                                        break;
                                    }
                                    Ok(Ok(FrontendMessage::Skipped { tag })) => {
                                        log::debug!("ignoring unsupported message '{}'", tag as char);
                                    }
                                }
                            }
                        })
                        .detach();
                }
            }
        }
    })
}

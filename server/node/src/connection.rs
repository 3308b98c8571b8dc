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

use async_dup::Arc as AsyncArc;
use async_io::Async;
use futures_lite::{AsyncReadExt, AsyncWriteExt};
use std::{
    io,
    net::{Shutdown, TcpStream},
};
use wire_protocol::{
    hand_shake,
    message_decoder::{MessageDecoder, Status},
    BackendMessage, ConnId, ConnSupervisor, Error, FrontendMessage, Result, REJECT_SSL,
};

/// Both halves of an accepted socket; clones share the underlying stream
pub(crate) type Channel = AsyncArc<Async<TcpStream>>;

/// Connection startup parameters, including the synthetic `version`
pub(crate) type Props = Vec<(String, String)>;

/// Client request accepted from a client
pub(crate) enum ClientRequest {
    /// Connection to perform queries
    Connection(RequestReceiver, Props),
    /// Connection to cancel a query of another client
    QueryCancellation(ConnId),
}

/// Performs the startup phase of the PostgreSQL Wire Protocol on `channel`:
/// declines an `SSLRequest`, parses the startup message, trusts the peer with
/// `AuthenticationOk` and advertises the session parameters and backend key
/// data. The first `ReadyForQuery` is deliberately not sent here; it follows
/// once the session database is attached.
pub(crate) async fn accept_client_request(
    channel: Channel,
    conn_supervisor: &ConnSupervisor,
) -> io::Result<Result<ClientRequest>> {
    let mut socket = channel.clone();
    let mut process = hand_shake::Process::start();
    let mut current: Option<Vec<u8>> = None;
    loop {
        match process.next_stage(current.as_deref()) {
            Ok(hand_shake::Status::Requesting(hand_shake::Request::Buffer(len))) => {
                let mut local = vec![0; len];
                socket.read_exact(&mut local).await?;
                current = Some(local);
            }
            Ok(hand_shake::Status::Requesting(hand_shake::Request::UpgradeToSsl)) => {
                // cleartext only; the client is expected to retry its
                // startup message after this answer
                socket.write_all(&[REJECT_SSL]).await?;
                current = None;
            }
            Ok(hand_shake::Status::Cancel(conn_id, secret_key)) => {
                return if conn_supervisor.verify(conn_id, secret_key) {
                    Ok(Ok(ClientRequest::QueryCancellation(conn_id)))
                } else {
                    Ok(Err(Error::VerificationFailed))
                };
            }
            Ok(hand_shake::Status::Done(version, mut props)) => {
                props.push((
                    "version".to_owned(),
                    format!("{}.{}", version >> 16, version & 0xffff),
                ));
                log::debug!("startup parameters {:?}", props);

                socket
                    .write_all(BackendMessage::AuthenticationOk.as_vec().as_slice())
                    .await?;
                socket
                    .write_all(
                        BackendMessage::ParameterStatus("client_encoding".to_owned(), "UTF8".to_owned())
                            .as_vec()
                            .as_slice(),
                    )
                    .await?;
                socket
                    .write_all(
                        BackendMessage::ParameterStatus("DateStyle".to_owned(), "ISO".to_owned())
                            .as_vec()
                            .as_slice(),
                    )
                    .await?;

                let (conn_id, secret_key) = match conn_supervisor.alloc() {
                    Ok(allocated) => allocated,
                    Err(error) => return Ok(Err(error)),
                };
                log::debug!("start service on connection-{}", conn_id);
                socket
                    .write_all(BackendMessage::BackendKeyData(conn_id, secret_key).as_vec().as_slice())
                    .await?;
                socket.flush().await?;

                return Ok(Ok(ClientRequest::Connection(
                    RequestReceiver::new(conn_id, channel, conn_supervisor.clone()),
                    props,
                )));
            }
            Err(error) => return Ok(Err(error)),
        }
    }
}

/// Reads frontend messages off a session's socket, one at a time
pub(crate) struct RequestReceiver {
    conn_id: ConnId,
    channel: Channel,
    conn_supervisor: ConnSupervisor,
    message_decoder: MessageDecoder,
}

impl RequestReceiver {
    fn new(conn_id: ConnId, channel: Channel, conn_supervisor: ConnSupervisor) -> RequestReceiver {
        RequestReceiver {
            conn_id,
            channel,
            conn_supervisor,
            message_decoder: MessageDecoder::new(),
        }
    }

    /// Receives and decodes the next frontend message
    pub(crate) async fn receive(&mut self) -> io::Result<Result<FrontendMessage>> {
        let mut current: Option<Vec<u8>> = None;
        loop {
            match self.message_decoder.next_stage(current.take().as_deref()) {
                Ok(Status::Requesting(len)) => {
                    let mut buffer = vec![0; len];
                    match self.channel.read_exact(&mut buffer).await {
                        Ok(()) => {}
                        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                            // Client disconnected the socket immediately
                            // without sending a Terminate message. Considers
                            // it as a client Terminate to save resource and
                            // exit smoothly.
                            log::debug!("client disconnected immediately");
                            return Ok(Ok(FrontendMessage::Terminate));
                        }
                        Err(error) => return Err(error),
                    }
                    current = Some(buffer);
                }
                Ok(Status::Decoding) => {}
                Ok(Status::Done(message)) => {
                    log::debug!("client request message {:?}", message);
                    return Ok(Ok(message));
                }
                Err(error) => return Ok(Err(error)),
            }
        }
    }
}

impl Drop for RequestReceiver {
    fn drop(&mut self) {
        self.conn_supervisor.free(self.conn_id);
        log::debug!("stop service of connection-{}", self.conn_id);
    }
}

/// Writes encoded frames to the socket in the order they were queued and
/// shuts the socket down when the session's executor is done with it. Write
/// failures end the session; the frames still queued are dropped.
pub(crate) async fn pump_frames(
    channel: Channel,
    shutdown_handle: TcpStream,
    frames: async_channel::Receiver<Vec<u8>>,
) {
    let mut socket = channel;
    while let Ok(frame) = frames.recv().await {
        if let Err(error) = socket.write_all(frame.as_slice()).await {
            log::debug!("write failed, closing connection {:?}", error);
            break;
        }
    }
    let _ = socket.flush().await;
    if let Err(error) = shutdown_handle.shutdown(Shutdown::Both) {
        log::trace!("socket already gone {:?}", error);
    }
}

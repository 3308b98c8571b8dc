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

//! Drives the gateway over a real TCP socket the way a PostgreSQL client
//! frames its messages.

use node::NodeConfig;
use std::{
    io::{Read, Write},
    net::TcpStream,
    thread,
    time::Duration,
};

const PORT: u16 = 56432;

fn startup_message(params: &[(&str, &str)]) -> Vec<u8> {
    let mut payload = vec![];
    payload.extend_from_slice(&0x0003_0000i32.to_be_bytes());
    for (key, value) in params {
        payload.extend_from_slice(key.as_bytes());
        payload.push(0);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
    }
    payload.push(0);
    let mut message = vec![];
    message.extend_from_slice(&(payload.len() as i32 + 4).to_be_bytes());
    message.extend_from_slice(&payload);
    message
}

fn query_message(sql: &str) -> Vec<u8> {
    let mut message = vec![b'Q'];
    message.extend_from_slice(&(sql.len() as i32 + 4 + 1).to_be_bytes());
    message.extend_from_slice(sql.as_bytes());
    message.push(0);
    message
}

fn read_message(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut tag = [0u8; 1];
    stream.read_exact(&mut tag).expect("message tag");
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).expect("message length");
    let len = i32::from_be_bytes(len) as usize - 4;
    let mut payload = vec![0; len];
    stream.read_exact(&mut payload).expect("message payload");
    (tag[0], payload)
}

fn command_tag(payload: &[u8]) -> String {
    String::from_utf8(payload[..payload.len() - 1].to_vec()).expect("command tag is utf-8")
}

fn connect() -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", PORT)) {
            stream
                .set_read_timeout(Some(Duration::from_secs(30)))
                .expect("read timeout set");
            return stream;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("server did not start listening on port {}", PORT);
}

fn perform_hand_shake(stream: &mut TcpStream, database: &str) {
    stream
        .write_all(&startup_message(&[("user", "u"), ("database", database)]))
        .expect("startup message sent");

    let (tag, payload) = read_message(stream);
    assert_eq!((tag, payload), (b'R', vec![0, 0, 0, 0]), "authentication ok");

    let (tag, payload) = read_message(stream);
    assert_eq!(tag, b'S');
    assert_eq!(payload, b"client_encoding\0UTF8\0");

    let (tag, payload) = read_message(stream);
    assert_eq!(tag, b'S');
    assert_eq!(payload, b"DateStyle\0ISO\0");

    let (tag, payload) = read_message(stream);
    assert_eq!(tag, b'K');
    assert_eq!(payload.len(), 8, "connection id and secret key");

    let (tag, payload) = read_message(stream);
    assert_eq!((tag, payload), (b'Z', vec![b'I']), "ready for query");
}

#[test]
fn simple_query_session() {
    let data_dir = tempfile::tempdir().expect("temporary directory");
    let config = NodeConfig::new(PORT, data_dir.path().to_str().expect("utf-8 path"));
    thread::spawn(move || node::start(config).expect("server started"));

    let mut stream = connect();

    // the ssl probe is answered with a single 'N' and startup continues in
    // cleartext
    stream
        .write_all(&[0, 0, 0, 8, 0x04, 0xd2, 0x16, 0x2f])
        .expect("ssl request sent");
    let mut answer = [0u8; 1];
    stream.read_exact(&mut answer).expect("ssl answer");
    assert_eq!(answer, [b'N']);

    perform_hand_shake(&mut stream, "network_test");

    // trivial select
    stream.write_all(&query_message("SELECT 1;")).expect("query sent");
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'T');
    assert_eq!(payload[..2], [0, 1], "one field described");
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'D');
    assert_eq!(payload, vec![0, 1, 0, 0, 0, 1, b'1']);
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'C');
    assert_eq!(command_tag(&payload), "SELECT 1");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'Z');

    // responses to pipelined statements come back in request order
    stream
        .write_all(&query_message("CREATE TABLE t (x INTEGER);"))
        .expect("query sent");
    stream
        .write_all(&query_message("INSERT INTO t VALUES (1), (2), (3);"))
        .expect("query sent");
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'C');
    assert_eq!(command_tag(&payload), "COMMAND COMPLETE");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'Z');
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'C');
    assert_eq!(command_tag(&payload), "INSERT 0 3");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'Z');

    // NULL travels as the special length -1
    stream
        .write_all(&query_message("SELECT NULL::INTEGER;"))
        .expect("query sent");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'T');
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'D');
    assert_eq!(payload, vec![0, 1, 255, 255, 255, 255]);
    let (tag, payload) = read_message(&mut stream);
    assert_eq!(tag, b'C');
    assert_eq!(command_tag(&payload), "SELECT 1");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'Z');

    // an engine error is an error response and the session survives it
    stream
        .write_all(&query_message("SELECT * FROM does_not_exist;"))
        .expect("query sent");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'E');
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'Z');
    stream.write_all(&query_message("SELECT 1;")).expect("query sent");
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'T');
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'D');
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'C');
    let (tag, _) = read_message(&mut stream);
    assert_eq!(tag, b'Z');

    // terminate closes the socket with no further bytes
    stream.write_all(&[b'X', 0, 0, 0, 4]).expect("terminate sent");
    let mut rest = vec![];
    stream.read_to_end(&mut rest).expect("socket drained");
    assert_eq!(rest, Vec::<u8>::new());

    // a fresh connection is served by the same acceptor
    let mut second = connect();
    perform_hand_shake(&mut second, "second_test");
    second
        .write_all(&query_message(
            "SELECT reset_val FROM pg_settings WHERE name='polar_compatibility_mode';",
        ))
        .expect("query sent");
    let (tag, payload) = read_message(&mut second);
    assert_eq!(tag, b'T');
    assert!(payload.starts_with(&[0, 1]));
    let (tag, payload) = read_message(&mut second);
    assert_eq!(tag, b'D');
    assert_eq!(payload, vec![0, 1, 0, 0, 0, 2, b'p', b'g']);
    let (tag, payload) = read_message(&mut second);
    assert_eq!(tag, b'C');
    assert_eq!(command_tag(&payload), "SELECT");
    let (tag, _) = read_message(&mut second);
    assert_eq!(tag, b'Z');
}

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

use crate::{ConnId, ConnSecretKey, Error, Result};
use rand::Rng;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

/// Manages allocation of Connection IDs and secret keys. Every session
/// advertises its pair in `BackendKeyData` so that a `CancelRequest` can be
/// matched against a live connection.
#[derive(Clone)]
pub struct ConnSupervisor {
    inner: Arc<Mutex<Inner>>,
}

impl ConnSupervisor {
    /// Creates a new Connection Supervisor.
    pub fn new(min_id: ConnId, max_id: ConnId) -> ConnSupervisor {
        ConnSupervisor {
            inner: Arc::new(Mutex::new(Inner::new(min_id, max_id))),
        }
    }

    /// Allocates a new Connection ID and its secret key.
    pub fn alloc(&self) -> Result<(ConnId, ConnSecretKey)> {
        self.inner.lock().unwrap().alloc()
    }

    /// Releases a Connection ID back to the pool.
    pub fn free(&self, conn_id: ConnId) {
        self.inner.lock().unwrap().free(conn_id);
    }

    /// Validates whether the secret key matches the specified Connection ID.
    pub fn verify(&self, conn_id: ConnId, secret_key: ConnSecretKey) -> bool {
        self.inner.lock().unwrap().verify(conn_id, secret_key)
    }
}

struct Inner {
    next_id: ConnId,
    max_id: ConnId,
    free_ids: VecDeque<ConnId>,
    current_mapping: HashMap<ConnId, ConnSecretKey>,
}

impl Inner {
    fn new(min_id: ConnId, max_id: ConnId) -> Inner {
        Inner {
            next_id: min_id,
            max_id,
            free_ids: VecDeque::new(),
            current_mapping: HashMap::new(),
        }
    }

    fn alloc(&mut self) -> Result<(ConnId, ConnSecretKey)> {
        let conn_id = self.generate_conn_id()?;
        let secret_key = rand::thread_rng().gen();
        self.current_mapping.insert(conn_id, secret_key);
        Ok((conn_id, secret_key))
    }

    fn free(&mut self, conn_id: ConnId) {
        if self.current_mapping.remove(&conn_id).is_some() {
            self.free_ids.push_back(conn_id);
        }
    }

    fn verify(&self, conn_id: ConnId, secret_key: ConnSecretKey) -> bool {
        match self.current_mapping.get(&conn_id) {
            Some(secret) => *secret == secret_key,
            None => false,
        }
    }

    fn generate_conn_id(&mut self) -> Result<ConnId> {
        match self.free_ids.pop_front() {
            Some(id) => Ok(id),
            None => {
                let id = self.next_id;
                if id > self.max_id {
                    return Err(Error::ConnectionIdExhausted);
                }
                self.next_id += 1;
                Ok(id)
            }
        }
    }
}

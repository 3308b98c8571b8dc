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

const DEFAULT_PORT: u16 = 5432;

/// Process-wide settings, fixed at startup
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    port: u16,
    data_dir: String,
}

impl NodeConfig {
    /// Creates settings for a node listening on `port` with database files
    /// under `data_dir`
    pub fn new(port: u16, data_dir: &str) -> NodeConfig {
        let mut data_dir = data_dir.to_owned();
        if data_dir.ends_with('/') {
            data_dir.pop();
        }
        NodeConfig { port, data_dir }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Directory holding `<database>.db` files, without a trailing slash
    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }
}

impl Default for NodeConfig {
    fn default() -> NodeConfig {
        NodeConfig::new(DEFAULT_PORT, ".")
    }
}

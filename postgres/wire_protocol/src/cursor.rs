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

use crate::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian};

/// Decoding view over a received payload. All integers are big-endian,
/// strings are NUL-terminated.
pub(crate) struct Cursor<'a>(&'a [u8]);

impl<'a> From<&'a [u8]> for Cursor<'a> {
    fn from(buf: &'a [u8]) -> Cursor<'a> {
        Cursor(buf)
    }
}

impl<'a> Cursor<'a> {
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        if self.0.len() < 4 {
            return Err(Error::InvalidMessageLength);
        }
        let value = NetworkEndian::read_i32(self.0);
        self.0 = &self.0[4..];
        Ok(value)
    }

    /// Reads a NUL-terminated string, replacing invalid UTF-8 sequences
    pub(crate) fn read_cstr(&mut self) -> Result<String> {
        match self.0.iter().position(|b| *b == 0) {
            Some(pos) => {
                let value = String::from_utf8_lossy(&self.0[..pos]).into_owned();
                self.0 = &self.0[pos + 1..];
                Ok(value)
            }
            None => Err(Error::InvalidMessageLength),
        }
    }
}

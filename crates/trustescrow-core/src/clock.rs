// Copyright [2026] [Joseph Verdicchio]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Joseph Verdicchio and TrustEscrow Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Block clock.
///
/// Protocol-visible time only moves forward. Every entry point reads it once,
/// at call time, so expiration and mediation deadlines are re-checked on each
/// fresh call rather than observed from a stale read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockClock {
    now: Timestamp,
    height: u64,
}

impl BlockClock {
    pub fn new(genesis_time: Timestamp) -> Self {
        Self {
            now: genesis_time,
            height: 0,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn advance(&mut self, secs: u64) -> Timestamp {
        self.now = self.now.saturating_add(secs);
        self.height = self.height.saturating_add(1);
        self.now
    }

    pub fn set(&mut self, ts: Timestamp) -> TrustEscrowResult<Timestamp> {
        if ts < self.now {
            return Err(TrustEscrowError::InvalidArgument(format!(
                "clock cannot move backwards ({ts} < {})",
                self.now
            )));
        }
        self.now = ts;
        self.height = self.height.saturating_add(1);
        Ok(self.now)
    }
}

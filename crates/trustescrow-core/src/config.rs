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

use crate::chain::Chain;
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const GENESIS_TIME_ENV: &str = "TRUSTESCROW_GENESIS_TIME";

/// Genesis parameters for an in-process chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(default)]
    pub genesis_time: Timestamp,
    /// Address (hex) to initial balance.
    #[serde(default)]
    pub balances: BTreeMap<Address, Amount>,
}

impl ChainConfig {
    pub fn from_json_slice(bytes: &[u8]) -> TrustEscrowResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| TrustEscrowError::InvalidArgument(format!("chain config: {e}")))
    }

    pub fn load(path: &Path) -> TrustEscrowResult<Self> {
        let payload = fs::read(path).map_err(|e| {
            TrustEscrowError::InvalidArgument(format!("read {}: {e}", path.display()))
        })?;
        Self::from_json_slice(&payload)
    }

    /// Applies `TRUSTESCROW_GENESIS_TIME` when it is set.
    pub fn apply_env(self) -> TrustEscrowResult<Self> {
        let value = std::env::var(GENESIS_TIME_ENV).ok();
        self.with_genesis_override(value.as_deref())
    }

    pub fn with_genesis_override(mut self, value: Option<&str>) -> TrustEscrowResult<Self> {
        if let Some(raw) = value {
            self.genesis_time = raw.trim().parse().map_err(|_| {
                TrustEscrowError::InvalidArgument(format!("{GENESIS_TIME_ENV}={raw:?} is not a timestamp"))
            })?;
        }
        Ok(self)
    }

    pub fn build_chain(&self) -> TrustEscrowResult<Chain> {
        let mut chain = Chain::new(self.genesis_time);
        for (address, amount) in &self.balances {
            chain.fund(*address, *amount)?;
        }
        tracing::debug!(
            genesis_time = self.genesis_time,
            accounts = self.balances.len(),
            "chain built from config"
        );
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_keyed_balances() {
        let cfg = ChainConfig::from_json_slice(
            br#"{"genesis_time": 1700000000, "balances": {"0x0101010101010101010101010101010101010101": 25}}"#,
        )
        .unwrap();
        assert_eq!(cfg.genesis_time, 1_700_000_000);
        let chain = cfg.build_chain().unwrap();
        assert_eq!(chain.balance_of(&Address([1; 20])), 25);
        assert_eq!(chain.now(), 1_700_000_000);
    }

    #[test]
    fn missing_fields_default() {
        assert_eq!(ChainConfig::from_json_slice(b"{}").unwrap(), ChainConfig::default());
        assert!(ChainConfig::from_json_slice(br#"{"genesis":1}"#).is_err());
    }

    #[test]
    fn genesis_override() {
        let cfg = ChainConfig::default();
        assert_eq!(
            cfg.clone().with_genesis_override(Some(" 42 ")).unwrap().genesis_time,
            42
        );
        assert_eq!(cfg.clone().with_genesis_override(None).unwrap(), cfg);
        assert!(cfg.with_genesis_override(Some("soon")).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ChainConfig::load(Path::new("/nonexistent/trustescrow.json")).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}

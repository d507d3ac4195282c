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
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Native value, in the smallest indivisible unit.
pub type Amount = u128;

/// Seconds since the unix epoch, as reported by the block clock.
pub type Timestamp = u64;

pub type Hash32 = [u8; 32];

macro_rules! hex_bytes_newtype {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const ZERO: Self = Self([0u8; $len]);

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = TrustEscrowError;

            fn from_str(s: &str) -> TrustEscrowResult<Self> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw).map_err(|e| {
                    TrustEscrowError::InvalidArgument(format!(
                        "{}: invalid hex: {e}",
                        stringify!($name)
                    ))
                })?;
                let arr: [u8; $len] = bytes.as_slice().try_into().map_err(|_| {
                    TrustEscrowError::InvalidArgument(format!(
                        "{} must be {} bytes",
                        stringify!($name),
                        $len
                    ))
                })?;
                Ok(Self(arr))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes_newtype!(Address, 20);
hex_bytes_newtype!(DataHash, 32);
hex_bytes_newtype!(EventHash, 32);

impl From<Hash32> for DataHash {
    fn from(value: Hash32) -> Self {
        Self(value)
    }
}

/// Registry-assigned agent identifier. Zero is never assigned.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl AgentId {
    pub const NONE: Self = Self(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EscrowId(pub u64);

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow#{}", self.0)
    }
}

/// Validation score in `0..=100`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MAX_VALUE: u8 = 100;
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(Self::MAX_VALUE);

    pub fn new(value: u8) -> TrustEscrowResult<Self> {
        if value > Self::MAX_VALUE {
            return Err(TrustEscrowError::ScoreOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn meets(self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl TryFrom<u8> for Score {
    type Error = TrustEscrowError;

    fn try_from(value: u8) -> TrustEscrowResult<Self> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_hex_roundtrip_accepts_optional_prefix() {
        let a: Address = "0x0101010101010101010101010101010101010101".parse().unwrap();
        let b: Address = "0101010101010101010101010101010101010101".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Address([1; 20]));
        assert_eq!(a.to_string(), format!("0x{}", "01".repeat(20)));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(
            "0xabcd".parse::<DataHash>(),
            Err(TrustEscrowError::InvalidArgument(_))
        ));
        assert!("zz".repeat(20).parse::<Address>().is_err());
    }

    #[test]
    fn score_bounds() {
        assert!(Score::new(100).is_ok());
        assert_eq!(Score::new(101), Err(TrustEscrowError::ScoreOutOfRange(101)));
        assert!(Score::new(50).unwrap().meets(50));
        assert!(!Score::new(49).unwrap().meets(50));
        assert!(Score::ZERO.meets(0));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let h = DataHash([0xab; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
        let back: DataHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert!(serde_json::from_str::<Score>("101").is_err());
    }
}

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

//! trustescrow-core
//!
//! A conditional-payment protocol: an escrower locks value against a
//! deliverable, and release to the claimant is gated by a pluggable validator
//! rather than by agreement between the two parties.
//!
//! This crate implements:
//! - the escrow settlement engine (deposit, claim, reclaim after expiration)
//! - the validator contract plus deterministic-check, optimistic-mediation and
//!   rubric validators
//! - in-memory agent directory and validation ledger collaborators
//! - an atomic in-process execution substrate with an auditable event log

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod artifacts;
pub mod bank;
pub mod chain;
pub mod clock;
pub mod config;
pub mod demand;
pub mod digest;
pub mod directory;
pub mod engine;
pub mod error;
pub mod events;
pub mod journal;
pub mod types;
pub mod validation;
pub mod validator;

pub use crate::error::{TrustEscrowError, TrustEscrowResult};

pub use crate::chain::{Chain, SharedChain};
pub use crate::config::ChainConfig;
pub use crate::demand::{Demand, RubricDemand};
pub use crate::engine::{DepositParams, Escrow};
pub use crate::types::{
    Address, AgentId, Amount, DataHash, EscrowId, EventHash, Score, Timestamp,
};
pub use crate::validator::{
    DeterministicCheckValidator, MediationDecision, OptimisticMediationValidator, RubricValidator,
    Validator,
};

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

//! Built-in walkthrough: three agents, three validators, four escrows.
//!
//! Alice serves market analysis, Bob validates and mediates, Charlie pays.

use crate::scenario::{self, Scenario, ScenarioReport};
use serde_json::{json, Value};
use trustescrow_core::{TrustEscrowError, TrustEscrowResult};

pub const GENESIS_TIME: u64 = 1_700_000_000;

fn analysis_package() -> Value {
    json!({
        "symbol": "BTC",
        "timeframe": "1d",
        "agent_id": 1,
        "timestamp": GENESIS_TIME,
        "analysis": "Trend: higher highs on the daily. Support near 60k, resistance at 72k. \
                     Risk: funding is elevated. Recommendation: accumulate on dips.",
    })
}

pub fn scenario() -> TrustEscrowResult<Scenario> {
    let package = analysis_package();
    let value = json!({
        "config": { "genesis_time": GENESIS_TIME },
        "funds": { "charlie": 10 },
        "steps": [
            { "op": "deploy_validator", "name": "checker", "kind": "deterministic_check" },
            { "op": "deploy_validator", "name": "mediation", "kind": "optimistic_mediation" },
            { "op": "deploy_validator", "name": "rubric", "kind": "rubric" },
            { "op": "register_agent", "actor": "alice", "domain": "alice.example.com" },
            { "op": "register_agent", "actor": "bob", "domain": "bob.example.com" },
            { "op": "register_agent", "actor": "charlie", "domain": "charlie.example.com" },
            { "op": "register_agent", "actor": "checker", "domain": "checker.bob.example.com" },
            { "op": "register_agent", "actor": "mediation", "domain": "mediation.bob.example.com" },
            { "op": "register_agent", "actor": "rubric", "domain": "rubric.bob.example.com" },

            { "op": "deposit", "caller": "charlie", "escrow": "hello", "validator": "checker",
              "server": "alice", "amount": 1, "expires_in": 3600, "min_validation": 50,
              "demand": { "kind": "content", "text": "Hello, World!" } },
            { "op": "request_validation", "caller": "alice", "validator": "checker",
              "server": "alice", "data": { "text": "Hello, World!" } },
            { "op": "request_validation", "caller": "alice", "validator": "checker",
              "server": "alice", "data": { "text": "Wrong Data" } },
            { "op": "claim", "caller": "alice", "escrow": "hello",
              "data": { "text": "Wrong Data" }, "expect": "invalid_validation" },
            { "op": "claim", "caller": "alice", "escrow": "hello",
              "data": { "text": "Hello, World!" } },

            { "op": "deposit", "caller": "charlie", "escrow": "mediated", "validator": "mediation",
              "server": "alice", "amount": 1, "expires_in": 3600, "min_validation": 50,
              "demand": { "kind": "mediation", "mediator": "bob", "deadline_in": 300 } },
            { "op": "request_validation", "caller": "alice", "validator": "mediation",
              "server": "alice", "data": { "text": "BTC daily outlook" } },
            { "op": "request_mediation", "caller": "alice", "escrow": "mediated",
              "data": { "text": "BTC daily outlook" } },
            { "op": "advance", "secs": 60 },
            { "op": "claim", "caller": "alice", "escrow": "mediated",
              "data": { "text": "BTC daily outlook" }, "expect": "awaiting_mediation" },
            { "op": "advance", "secs": 300 },
            { "op": "claim", "caller": "alice", "escrow": "mediated",
              "data": { "text": "BTC daily outlook" } },

            { "op": "publish_artifact", "data": { "json": package } },
            { "op": "deposit", "caller": "charlie", "escrow": "report", "validator": "rubric",
              "server": "alice", "amount": 2, "expires_in": 3600, "min_validation": 50,
              "demand": { "kind": "rubric",
                          "required_fields": ["symbol", "analysis", "timestamp", "agent_id"],
                          "key_components": ["trend", "support", "resistance", "recommendation", "risk"] } },
            { "op": "request_validation", "caller": "alice", "validator": "rubric",
              "server": "alice", "data": { "json": package } },
            { "op": "validate_escrow", "caller": "charlie", "escrow": "report",
              "data": { "json": package } },
            { "op": "claim", "caller": "alice", "escrow": "report", "data": { "json": package } },

            { "op": "deposit", "caller": "charlie", "escrow": "unclaimed", "validator": "checker",
              "server": "alice", "amount": 1, "expires_in": 600, "min_validation": 100,
              "demand": { "kind": "content", "text": "never delivered" } },
            { "op": "reclaim", "caller": "charlie", "escrow": "unclaimed",
              "expect": "unauthorized_claim" },
            { "op": "advance", "secs": 601 },
            { "op": "reclaim", "caller": "alice", "escrow": "unclaimed",
              "expect": "unauthorized_claim" },
            { "op": "reclaim", "caller": "charlie", "escrow": "unclaimed" }
        ]
    });
    serde_json::from_value(value)
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("demo scenario: {e}")))
}

pub fn run() -> TrustEscrowResult<ScenarioReport> {
    scenario::run(&scenario()?)
}

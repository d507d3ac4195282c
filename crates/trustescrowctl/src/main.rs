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

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trustescrow_core::{TrustEscrowError, TrustEscrowResult};
use trustescrowctl::{demo, error_json, hash_input, scenario};

#[derive(Debug, Parser)]
#[command(name = "trustescrowctl")]
#[command(about = "Drive the trustescrow settlement engine from the command line")]
struct Cli {
    #[arg(long, env = "TRUSTESCROW_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the built-in walkthrough and print its audit trail.
    Demo,
    /// Execute a JSON scenario file.
    Run {
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Print the data hash validators use for some input.
    Hash {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        canonical_json: bool,
    },
}

fn run_scenario(path: PathBuf) -> TrustEscrowResult<(Value, bool)> {
    let mut loaded = scenario::load(&path)?;
    loaded.config = loaded.config.apply_env()?;
    let report = scenario::run(&loaded)?;
    let passed = report.passed;
    let value = serde_json::to_value(&report)
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("report encoding: {e}")))?;
    Ok((value, passed))
}

fn run_demo() -> TrustEscrowResult<(Value, bool)> {
    let mut walkthrough = demo::scenario()?;
    walkthrough.config = walkthrough.config.apply_env()?;
    let report = scenario::run(&walkthrough)?;
    let passed = report.passed;
    let value = serde_json::to_value(&report)
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("report encoding: {e}")))?;
    Ok((value, passed))
}

fn run_hash(
    text: Option<String>,
    file: Option<PathBuf>,
    canonical_json: bool,
) -> TrustEscrowResult<(Value, bool)> {
    let bytes = match (text, file) {
        (Some(t), _) => t.into_bytes(),
        (None, Some(path)) => fs::read(&path).map_err(|e| {
            TrustEscrowError::InvalidArgument(format!("read {}: {e}", path.display()))
        })?,
        (None, None) => {
            return Err(TrustEscrowError::InvalidArgument(
                "--text or --file is required".to_string(),
            ))
        }
    };
    Ok((hash_input(&bytes, canonical_json)?, true))
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    let out = match cli.cmd {
        Command::Demo => run_demo(),
        Command::Run { scenario } => run_scenario(scenario),
        Command::Hash {
            text,
            file,
            canonical_json,
        } => run_hash(text, file, canonical_json),
    };
    match out {
        Ok((v, passed)) => {
            println!("{v:#}");
            if !passed {
                std::process::exit(1);
            }
        }
        Err(err) => {
            println!("{}", error_json(&err));
            std::process::exit(1);
        }
    }
}

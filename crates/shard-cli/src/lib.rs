// Copyright 2025 Shard Client Authors
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

//! # Shard CLI
//!
//! Command-line front end for a game shard. One invocation runs exactly one
//! intent: a one-shot gateway call, a live event listener, or a durable
//! epoch consumer. See [`shard_common::usage`] for the command list.
//!
//! Settings resolution lives in [`config`]; the binary in `main.rs` only
//! parses flags, installs logging and maps errors to exit codes.

pub mod config;

pub use config::{Overrides, Settings};

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

//! Shard Client Common Types and Framing
//!
//! This crate holds everything the shard gateway client shares between its
//! transport, its consumers and its command line:
//!
//! - **Protocol Layer**: service addresses, the intent codec that turns raw
//!   command-line arguments into payloads, the JSON messages of the gateway
//!   RPC surface, the binary epoch schema and the error taxonomy
//! - **Transport Layer**: the length-prefixed envelope used by streaming calls
//!
//! # Example
//!
//! ```
//! use shard_common::{Intent, ServiceAddress};
//!
//! let intent = Intent::parse(&["attack-player", "bob", "150"]).unwrap();
//! assert_eq!(intent.command_type(), "attack-player");
//!
//! let address = ServiceAddress::default();
//! assert_eq!(address.epoch_stream_name(), "organization_project_service_epoch");
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;

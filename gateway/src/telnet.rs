//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Telnet client side of the bridge
//!
//! This module provides the subset of the Telnet protocol the bridge needs to
//! talk to a legacy MUD server:
//! - Option negotiation for ECHO, SUPPRESS-GO-AHEAD and NAWS
//! - Refusal of every other option
//! - Stripping of command and subnegotiation sequences from the data stream

pub mod filter;
pub mod protocol;

pub use self::filter::{Filtered, TelnetFilter};
pub use self::protocol::{TelnetCommand, TelnetOption, WindowSize};

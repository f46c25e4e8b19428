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


//! MudBridge Common Types
//!
//! This crate defines the control envelope shared by every client transport
//! that talks to the MudBridge gateway:
//! - Client to bridge requests (connect, switch port, input, resize, save log)
//! - Bridge to client notifications (status, error, log)

pub mod envelope;

pub use envelope::{ClientMessage, EnvelopeError, ServerMessage};

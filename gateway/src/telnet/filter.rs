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


//! Inbound telnet stream filter
//!
//! [`TelnetFilter`] separates application bytes from telnet commands in the
//! data read off the MUD socket and produces the negotiation replies that have
//! to be written back. The scanner keeps its position between chunks, so a
//! command or subnegotiation split across TCP segments is still consumed whole.

use super::protocol::{
    TelnetCommand, TelnetOption, WindowSize, build_naws, build_negotiation,
};
use bytes::BytesMut;

const IAC: u8 = TelnetCommand::IAC as u8;
const SE: u8 = TelnetCommand::SE as u8;

/// Scanner position within the telnet stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Plain application data
    Data,
    /// Seen `IAC`, waiting for the command byte
    Command,
    /// Seen `IAC <verb>`, waiting for the option byte
    Negotiation(TelnetCommand),
    /// Inside `IAC SB ...`
    Subnegotiation,
    /// Seen `IAC` inside a subnegotiation
    SubnegotiationIac,
}

/// Output of a single [`TelnetFilter::process`] call
#[derive(Debug, Default)]
pub struct Filtered {
    /// Application bytes with every telnet sequence removed
    pub data: BytesMut,
    /// Negotiation replies to write back to the server, in order
    pub replies: Vec<u8>,
}

/// Stateful telnet command stripper and negotiation responder
///
/// One filter belongs to one TCP connection.
#[derive(Debug)]
pub struct TelnetFilter {
    state: ScanState,
    window: WindowSize,
    naws_reported: bool,
}

impl TelnetFilter {
    /// Create a filter that reports `window` when the server first asks for NAWS.
    pub fn new(window: WindowSize) -> Self {
        Self {
            state: ScanState::Data,
            window,
            naws_reported: false,
        }
    }

    /// Update the size used for the initial NAWS report.
    pub fn set_window_size(&mut self, window: WindowSize) {
        self.window = window;
    }

    /// Whether the initial NAWS report has been produced.
    pub fn naws_reported(&self) -> bool {
        self.naws_reported
    }

    /// Scan one inbound chunk.
    pub fn process(&mut self, chunk: &[u8]) -> Filtered {
        let mut filtered = Filtered {
            data: BytesMut::with_capacity(chunk.len()),
            replies: Vec::new(),
        };

        for &byte in chunk {
            self.state = match self.state {
                ScanState::Data => {
                    if byte == IAC {
                        ScanState::Command
                    } else {
                        filtered.data.extend_from_slice(&[byte]);
                        ScanState::Data
                    }
                }
                ScanState::Command => match TelnetCommand::from_byte(byte) {
                    Some(TelnetCommand::IAC) => {
                        filtered.data.extend_from_slice(&[IAC]);
                        ScanState::Data
                    }
                    Some(command) if command.is_negotiation() => ScanState::Negotiation(command),
                    Some(TelnetCommand::SB) => ScanState::Subnegotiation,
                    // GA, NOP and friends carry no option byte
                    _ => ScanState::Data,
                },
                ScanState::Negotiation(command) => {
                    self.negotiate(command, byte, &mut filtered.replies);
                    ScanState::Data
                }
                ScanState::Subnegotiation => {
                    if byte == IAC {
                        ScanState::SubnegotiationIac
                    } else {
                        ScanState::Subnegotiation
                    }
                }
                ScanState::SubnegotiationIac => match byte {
                    SE => ScanState::Data,
                    // IAC IAC is an escaped data byte, anything else stays inside
                    _ => ScanState::Subnegotiation,
                },
            };
        }

        filtered
    }

    /// Apply the fixed negotiation policy.
    fn negotiate(&mut self, command: TelnetCommand, option: u8, replies: &mut Vec<u8>) {
        let known = TelnetOption::from_byte(option);
        match command {
            TelnetCommand::DO => match known {
                Some(TelnetOption::SuppressGoAhead) => {
                    replies.extend_from_slice(&build_negotiation(TelnetCommand::WILL, option));
                }
                Some(TelnetOption::NAWS) => {
                    replies.extend_from_slice(&build_negotiation(TelnetCommand::WILL, option));
                    if !self.naws_reported {
                        replies.extend_from_slice(&build_naws(self.window));
                        self.naws_reported = true;
                    }
                }
                _ => {
                    replies.extend_from_slice(&build_negotiation(TelnetCommand::WONT, option));
                }
            },
            TelnetCommand::WILL => match known {
                Some(TelnetOption::Echo) => {
                    replies.extend_from_slice(&build_negotiation(TelnetCommand::DO, option));
                }
                _ => {
                    replies.extend_from_slice(&build_negotiation(TelnetCommand::DONT, option));
                }
            },
            // DONT and WONT are acknowledgements; answering them would loop.
            _ => {}
        }
        tracing::trace!("Negotiated {:?} {}", command, option);
    }
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new(WindowSize::default())
    }
}

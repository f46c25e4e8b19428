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


//! Telnet protocol constants and utilities
//!
//! This module defines the telnet commands and options the bridge understands
//! along with helpers for building negotiation and subnegotiation frames.

/// Telnet command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetCommand {
    /// Interpret As Command
    IAC = 255,
    /// Don't do option
    DONT = 254,
    /// Do option
    DO = 253,
    /// Won't do option
    WONT = 252,
    /// Will do option
    WILL = 251,
    /// Subnegotiation begin
    SB = 250,
    /// Subnegotiation end
    SE = 240,
}

impl TelnetCommand {
    /// Convert byte to telnet command
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            255 => Some(Self::IAC),
            254 => Some(Self::DONT),
            253 => Some(Self::DO),
            252 => Some(Self::WONT),
            251 => Some(Self::WILL),
            250 => Some(Self::SB),
            240 => Some(Self::SE),
            _ => None,
        }
    }

    /// Convert command to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// True for the four option negotiation verbs.
    pub fn is_negotiation(self) -> bool {
        matches!(self, Self::DO | Self::DONT | Self::WILL | Self::WONT)
    }
}

/// Telnet option codes the bridge negotiates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetOption {
    /// Echo
    Echo = 1,
    /// Suppress go ahead
    SuppressGoAhead = 3,
    /// Negotiate about window size (NAWS)
    NAWS = 31,
}

impl TelnetOption {
    /// Convert byte to telnet option
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Echo),
            3 => Some(Self::SuppressGoAhead),
            31 => Some(Self::NAWS),
            _ => None,
        }
    }

    /// Convert option to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Terminal dimensions reported through NAWS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
}

impl WindowSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Build a telnet negotiation sequence
///
/// Takes the raw option byte so options the bridge does not know can still be
/// refused.
pub fn build_negotiation(command: TelnetCommand, option: u8) -> [u8; 3] {
    [TelnetCommand::IAC.to_byte(), command.to_byte(), option]
}

/// Build a telnet subnegotiation sequence
pub fn build_subnegotiation(option: TelnetOption, data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() + 5);
    result.extend_from_slice(&[
        TelnetCommand::IAC.to_byte(),
        TelnetCommand::SB.to_byte(),
        option.to_byte(),
    ]);

    // Escape IAC bytes in data
    for &byte in data {
        result.push(byte);
        if byte == TelnetCommand::IAC.to_byte() {
            result.push(byte);
        }
    }

    result.push(TelnetCommand::IAC.to_byte());
    result.push(TelnetCommand::SE.to_byte());

    result
}

/// Build the `IAC SB NAWS <cols> <rows> IAC SE` window size report
pub fn build_naws(size: WindowSize) -> Vec<u8> {
    let mut data = [0u8; 4];
    data[..2].copy_from_slice(&size.cols.to_be_bytes());
    data[2..].copy_from_slice(&size.rows.to_be_bytes());
    build_subnegotiation(TelnetOption::NAWS, &data)
}

/// The offer sent as soon as the socket connects, before anything is read:
/// `WILL SUPPRESS-GO-AHEAD`, `DO ECHO`, `WILL NAWS`.
pub fn opening_offer() -> Vec<u8> {
    [
        build_negotiation(TelnetCommand::WILL, TelnetOption::SuppressGoAhead.to_byte()),
        build_negotiation(TelnetCommand::DO, TelnetOption::Echo.to_byte()),
        build_negotiation(TelnetCommand::WILL, TelnetOption::NAWS.to_byte()),
    ]
    .concat()
}

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


//! Legacy character encoding boundary
//!
//! The MUD speaks a legacy code page (EUC-KR by default) while
//! clients speak UTF-8. Decoding is streaming: a [`LegacyDecoder`] is created
//! once per MUD connection and carries partial multi-byte sequences from one
//! chunk into the next. Encoding is stateless and lossy.

use encoding_rs::{CoderResult, EUC_KR, Encoder, EncoderResult, Encoding};
use thiserror::Error;

/// Substituted for characters the legacy code page cannot represent.
const REPLACEMENT_BYTE: u8 = b'?';

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Unknown character encoding: {0}")]
    UnknownLabel(String),
}

/// Conversion between UTF-8 and the MUD's legacy encoding
#[derive(Debug, Clone, Copy)]
pub struct EncodingBridge {
    encoding: &'static Encoding,
}

impl EncodingBridge {
    /// Look up an encoding by its WHATWG label (`euc-kr`, `windows-949`, ...).
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Create a fresh streaming decoder.
    pub fn decoder(&self) -> LegacyDecoder {
        LegacyDecoder {
            decoder: self.encoding.new_decoder(),
        }
    }

    /// Encode outbound player text, replacing unmappable characters with `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut encoder = self.encoding.new_encoder();
        let mut output = Vec::with_capacity(initial_capacity(&encoder, text.len()));
        let mut remaining = text;

        loop {
            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(remaining, &mut output, true);
            remaining = &remaining[read..];
            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {
                    output.reserve(initial_capacity(&encoder, remaining.len()));
                }
                EncoderResult::Unmappable(_) => {
                    output.push(REPLACEMENT_BYTE);
                }
            }
        }

        output
    }
}

impl Default for EncodingBridge {
    fn default() -> Self {
        Self { encoding: EUC_KR }
    }
}

fn initial_capacity(encoder: &Encoder, len: usize) -> usize {
    encoder
        .max_buffer_length_from_utf8_without_replacement(len)
        .unwrap_or(len * 2)
        .max(4)
}

/// Streaming legacy to UTF-8 decoder for one connection
pub struct LegacyDecoder {
    decoder: encoding_rs::Decoder,
}

impl LegacyDecoder {
    /// Decode a chunk. A trailing incomplete sequence is held back until the
    /// next call; invalid sequences become U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut output = String::with_capacity(self.capacity_for(chunk.len()));
        let mut remaining = chunk;

        loop {
            let (result, read, _) = self.decoder.decode_to_string(remaining, &mut output, false);
            remaining = &remaining[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => {
                    let additional = self.capacity_for(remaining.len());
                    output.reserve(additional);
                }
            }
        }

        output
    }

    fn capacity_for(&self, len: usize) -> usize {
        self.decoder
            .max_utf8_buffer_length(len)
            .unwrap_or(len * 3)
            .max(4)
    }
}

impl std::fmt::Debug for LegacyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyDecoder")
            .field("encoding", &self.decoder.encoding().name())
            .finish()
    }
}

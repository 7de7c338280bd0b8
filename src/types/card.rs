// Copyright 2025 Fernando Borretti
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

use crate::markup::Fragment;
use crate::types::signature::Hasher;
use crate::types::signature::Signature;
use crate::types::signature::normalize_text;

/// Stands in for a blank marker in signature text.
const BLANK_PLACEHOLDER: &str = "\u{FFFC}";

/// The text a card is identified by: its character data, normalized. Text
/// that is not well-formed is used as is.
fn signature_text(text: &str) -> String {
    let plain = Fragment::parse(text)
        .and_then(|fragment| fragment.plain_text(BLANK_PLACEHOLDER))
        .unwrap_or_else(|_| text.to_string());
    normalize_text(&plain)
}

/// An answer card.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WhiteCard {
    /// The card's text, as an escaped markup fragment.
    text: String,
}

/// A prompt card.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BlackCard {
    /// The card's text, as an escaped markup fragment. May contain blank
    /// markers.
    text: String,
    /// The number of blanks the card declares.
    blank_count: usize,
}

impl WhiteCard {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn signature(&self) -> Signature {
        let mut hasher = Hasher::new();
        hasher.update(b"White");
        hasher.update(signature_text(&self.text).as_bytes());
        hasher.finalize()
    }
}

impl BlackCard {
    pub fn new(text: impl Into<String>, blank_count: usize) -> Self {
        Self {
            text: text.into().trim().to_string(),
            blank_count,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn blank_count(&self) -> usize {
        self.blank_count
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub(crate) fn set_blank_count(&mut self, blank_count: usize) {
        self.blank_count = blank_count;
    }

    pub fn signature(&self) -> Signature {
        let mut hasher = Hasher::new();
        hasher.update(b"Black");
        hasher.update(signature_text(&self.text).as_bytes());
        hasher.update(&self.blank_count.to_le_bytes());
        hasher.finalize()
    }
}

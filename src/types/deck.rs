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

use crate::types::card::BlackCard;
use crate::types::card::WhiteCard;
use crate::types::locale::Locale;

/// The in-memory document model of a card deck.
///
/// Read access is public. Mutation is crate-private and only used by the
/// parser and the pipeline stages. Only deduplication removes cards, and
/// nothing reorders them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Deck {
    locale: Locale,
    white: Vec<WhiteCard>,
    black: Vec<BlackCard>,
}

impl Deck {
    pub fn new(locale: Locale, white: Vec<WhiteCard>, black: Vec<BlackCard>) -> Self {
        Self {
            locale,
            white,
            black,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn white(&self) -> &[WhiteCard] {
        &self.white
    }

    pub fn black(&self) -> &[BlackCard] {
        &self.black
    }

    pub fn len(&self) -> usize {
        self.white.len() + self.black.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push_white(&mut self, card: WhiteCard) {
        self.white.push(card);
    }

    pub(crate) fn push_black(&mut self, card: BlackCard) {
        self.black.push(card);
    }

    /// Keeps only the white cards for which `keep` returns true, preserving
    /// their relative order.
    pub(crate) fn retain_white(&mut self, keep: impl FnMut(&WhiteCard) -> bool) {
        self.white.retain(keep);
    }

    /// Keeps only the black cards for which `keep` returns true, preserving
    /// their relative order.
    pub(crate) fn retain_black(&mut self, keep: impl FnMut(&BlackCard) -> bool) {
        self.black.retain(keep);
    }

    pub(crate) fn white_mut(&mut self, index: usize) -> Option<&mut WhiteCard> {
        self.white.get_mut(index)
    }

    pub(crate) fn black_mut(&mut self, index: usize) -> Option<&mut BlackCard> {
        self.black.get_mut(index)
    }

    pub(crate) fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }
}

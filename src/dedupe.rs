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

use std::collections::HashSet;

use crate::types::deck::Deck;
use crate::types::signature::Signature;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DedupeReport {
    pub removed_white: usize,
    pub removed_black: usize,
}

/// Removes duplicate cards, keeping the first occurrence of each signature.
pub fn dedupe(deck: &mut Deck) -> DedupeReport {
    let white_before = deck.white().len();
    let black_before = deck.black().len();

    let mut seen: HashSet<Signature> = HashSet::new();
    deck.retain_white(|card| seen.insert(card.signature()));
    let mut seen: HashSet<Signature> = HashSet::new();
    deck.retain_black(|card| seen.insert(card.signature()));

    let report = DedupeReport {
        removed_white: white_before - deck.white().len(),
        removed_black: black_before - deck.black().len(),
    };
    log::debug!(
        "Removed {} duplicate white cards and {} duplicate black cards.",
        report.removed_white,
        report.removed_black
    );
    report
}

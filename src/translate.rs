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
use std::ops::Range;
use std::time::Instant;

use serde::Serialize;

use crate::dictionary::Dictionary;
use crate::dictionary::is_word_char;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::markup::Fragment;
use crate::markup::Piece;
use crate::markup::escape_text;
use crate::types::deck::Deck;
use crate::types::locale::Locale;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationReport {
    /// The deck's locale before translation.
    pub source: Locale,
    pub target: Locale,
    /// The number of terms replaced.
    pub replaced: usize,
    /// The number of cards whose text changed.
    pub cards_changed: usize,
    /// Terms with no dictionary entry, in the order first seen.
    pub untranslated: Vec<String>,
}

/// Translates every card in the deck into `target`.
///
/// All-or-nothing: the new texts are computed first and only written back,
/// along with the new locale, once every card has been translated. On error
/// the deck is unchanged.
pub fn translate(
    deck: &mut Deck,
    target: &Locale,
    dictionary: &Dictionary,
) -> Fallible<TranslationReport> {
    if deck.locale() == target {
        return fail(format!("the deck is already in {target}."));
    }
    if dictionary.locale() != target {
        return Err(ErrorReport::dictionary_load(format!(
            "the dictionary is for {}, not {target}.",
            dictionary.locale()
        )));
    }
    if dictionary.is_empty() {
        return Err(ErrorReport::dictionary_load("the dictionary is empty."));
    }

    log::debug!("Translating from {} to {target}...", deck.locale());
    let start = Instant::now();
    let mut translator = Translator::new(dictionary);
    let white: Vec<String> = deck
        .white()
        .iter()
        .map(|card| translator.translate_fragment(card.text()))
        .collect::<Fallible<Vec<String>>>()?;
    let black: Vec<String> = deck
        .black()
        .iter()
        .map(|card| translator.translate_fragment(card.text()))
        .collect::<Fallible<Vec<String>>>()?;

    let mut cards_changed = 0;
    for (index, text) in white.into_iter().enumerate() {
        if let Some(card) = deck.white_mut(index) {
            if card.text() != text {
                card.set_text(text);
                cards_changed += 1;
            }
        }
    }
    for (index, text) in black.into_iter().enumerate() {
        if let Some(card) = deck.black_mut(index) {
            if card.text() != text {
                card.set_text(text);
                cards_changed += 1;
            }
        }
    }
    let source = deck.locale().clone();
    deck.set_locale(target.clone());

    let duration = Instant::now().duration_since(start).as_millis();
    log::debug!(
        "Translated {} terms in {duration}ms; {} untranslated.",
        translator.replaced,
        translator.untranslated.len()
    );
    Ok(TranslationReport {
        source,
        target: target.clone(),
        replaced: translator.replaced,
        cards_changed,
        untranslated: translator.untranslated,
    })
}

struct Translator<'a> {
    dictionary: &'a Dictionary,
    replaced: usize,
    untranslated: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> Translator<'a> {
    fn new(dictionary: &'a Dictionary) -> Self {
        Self {
            dictionary,
            replaced: 0,
            untranslated: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Translates the text nodes of a card. Markup is copied through, and
    /// nodes that did not change keep their original escaping.
    fn translate_fragment(&mut self, text: &str) -> Fallible<String> {
        let fragment = Fragment::parse(text)?;
        let mut output = String::with_capacity(text.len());
        for piece in fragment.pieces()? {
            match piece {
                Piece::Markup(raw) => output.push_str(raw),
                Piece::Text { raw, plain } => {
                    let translated = self.translate_node(&plain);
                    if translated == plain {
                        output.push_str(raw);
                    } else {
                        output.push_str(&escape_text(&translated));
                    }
                }
            }
        }
        Ok(output)
    }

    /// Translates one text node: as a whole phrase if the dictionary has it,
    /// otherwise token by token, longest phrase first.
    fn translate_node(&mut self, plain: &str) -> String {
        let trimmed = plain.trim();
        if trimmed.is_empty() {
            return plain.to_string();
        }
        if let Some(translation) = self.dictionary.get(trimmed) {
            self.replaced += 1;
            let leading = &plain[..plain.len() - plain.trim_start().len()];
            let trailing = &plain[plain.trim_end().len()..];
            return format!("{leading}{translation}{trailing}");
        }

        let tokens = word_tokens(plain);
        let mut output = String::with_capacity(plain.len());
        let mut cursor = 0;
        let mut unmatched: Option<Range<usize>> = None;
        let mut index = 0;
        while index < tokens.len() {
            let longest = self.dictionary.longest_term().min(tokens.len() - index);
            let found = (1..=longest).rev().find_map(|n| {
                let phrase = &plain[tokens[index].start..tokens[index + n - 1].end];
                self.dictionary.get(phrase).map(|translation| (n, translation))
            });
            match found {
                Some((n, translation)) => {
                    if let Some(run) = unmatched.take() {
                        self.record(&plain[run]);
                    }
                    output.push_str(&plain[cursor..tokens[index].start]);
                    output.push_str(translation);
                    cursor = tokens[index + n - 1].end;
                    self.replaced += 1;
                    index += n;
                }
                None => {
                    let token = tokens[index].clone();
                    unmatched = Some(match unmatched {
                        Some(run) => run.start..token.end,
                        None => token,
                    });
                    index += 1;
                }
            }
        }
        if let Some(run) = unmatched {
            self.record(&plain[run]);
        }
        output.push_str(&plain[cursor..]);
        output
    }

    fn record(&mut self, term: &str) {
        // Numbers and the like need no translation.
        if !term.chars().any(char::is_alphabetic) {
            return;
        }
        if self.seen.insert(term.to_string()) {
            log::debug!("No translation for {term:?}.");
            self.untranslated.push(term.to_string());
        }
    }
}

/// Byte ranges of the word tokens in `text`. Apostrophes at the edges of a
/// token are not part of it.
fn word_tokens(text: &str) -> Vec<Range<usize>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (position, c) in text.char_indices() {
        match (start, is_word_char(c)) {
            (None, true) => start = Some(position),
            (Some(begin), false) => {
                push_token(text, begin..position, &mut tokens);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        push_token(text, begin..text.len(), &mut tokens);
    }
    tokens
}

fn push_token(text: &str, range: Range<usize>, tokens: &mut Vec<Range<usize>>) {
    let token = &text[range.clone()];
    let trimmed_start = token.trim_start_matches(['\'', '’']);
    let start = range.start + (token.len() - trimmed_start.len());
    let trimmed = trimmed_start.trim_end_matches(['\'', '’']);
    let end = start + trimmed.len();
    if start < end {
        tokens.push(start..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::card::BlackCard;
    use crate::types::card::WhiteCard;

    fn locale(tag: &str) -> Locale {
        Locale::parse(tag).unwrap()
    }

    fn dictionary(entries: &[(&str, &str)]) -> Fallible<Dictionary> {
        let mut dictionary = Dictionary::new(locale("fr"));
        for (term, translation) in entries {
            dictionary.insert(term.to_string(), translation.to_string())?;
        }
        Ok(dictionary)
    }

    fn white_texts(deck: &Deck) -> Vec<&str> {
        deck.white().iter().map(|c| c.text()).collect()
    }

    #[test]
    fn test_whole_card_and_untranslated() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![WhiteCard::new("Dogs"), WhiteCard::new("Zeppelin")],
            vec![],
        );
        let dictionary = dictionary(&[("Dogs", "Chiens")])?;
        let report = translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["Chiens", "Zeppelin"]);
        assert_eq!(deck.locale(), &locale("fr"));
        assert_eq!(report.untranslated, vec!["Zeppelin".to_string()]);
        assert_eq!(report.replaced, 1);
        assert_eq!(report.cards_changed, 1);
        assert_eq!(report.source, locale("en"));
        Ok(())
    }

    #[test]
    fn test_cdata_is_translated() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![
                WhiteCard::new("<![CDATA[Dogs]]>"),
                WhiteCard::new("<![CDATA[Dogs & Cats]]>"),
            ],
            vec![],
        );
        let dictionary = dictionary(&[("Dogs", "Chiens"), ("Cats", "Chats")])?;
        let report = translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["Chiens", "Chiens &amp; Chats"]);
        assert_eq!(report.replaced, 3);
        assert!(report.untranslated.is_empty());
        Ok(())
    }

    #[test]
    fn test_markup_is_preserved() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![],
            vec![BlackCard::new("Why do I love <blank/>?", 1)],
        );
        let dictionary = dictionary(&[("Why do I love", "Pourquoi j'aime")])?;
        translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(deck.black()[0].text(), "Pourquoi j'aime <blank/>?");
        assert_eq!(deck.black()[0].blank_count(), 1);
        Ok(())
    }

    #[test]
    fn test_token_phrases_longest_first() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![WhiteCard::new("A hot dog and a cat.")],
            vec![],
        );
        let dictionary = dictionary(&[
            ("hot", "chaud"),
            ("hot dog", "hot-dog"),
            ("cat", "chat"),
        ])?;
        let report = translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["A hot-dog and a chat."]);
        assert_eq!(report.untranslated, vec!["A".to_string(), "and a".to_string()]);
        Ok(())
    }

    #[test]
    fn test_matches_are_case_sensitive() -> Fallible<()> {
        let mut deck = Deck::new(locale("en"), vec![WhiteCard::new("dogs")], vec![]);
        let dictionary = dictionary(&[("Dogs", "Chiens")])?;
        let report = translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["dogs"]);
        assert_eq!(report.untranslated, vec!["dogs".to_string()]);
        Ok(())
    }

    #[test]
    fn test_no_partial_word_matches() -> Fallible<()> {
        let mut deck = Deck::new(locale("en"), vec![WhiteCard::new("Catastrophe")], vec![]);
        let dictionary = dictionary(&[("Cat", "Chat")])?;
        translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["Catastrophe"]);
        Ok(())
    }

    #[test]
    fn test_translation_is_escaped() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![WhiteCard::new("Bread &amp; butter"), WhiteCard::new("Love")],
            vec![],
        );
        let dictionary = dictionary(&[("Bread & butter", "Pain"), ("Love", "<3 & amour")])?;
        translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["Pain", "&lt;3 &amp; amour"]);
        Ok(())
    }

    #[test]
    fn test_untouched_text_keeps_escaping() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![WhiteCard::new("Tom &amp; Jerry &#233;")],
            vec![],
        );
        let dictionary = dictionary(&[("Dogs", "Chiens")])?;
        translate(&mut deck, &locale("fr"), &dictionary)?;
        assert_eq!(white_texts(&deck), vec!["Tom &amp; Jerry &#233;"]);
        Ok(())
    }

    #[test]
    fn test_failure_leaves_deck_unchanged() -> Fallible<()> {
        let mut deck = Deck::new(
            locale("en"),
            vec![WhiteCard::new("Dogs")],
            vec![BlackCard::new("Broken <i>text", 1)],
        );
        let before = deck.clone();
        let dictionary = dictionary(&[("Dogs", "Chiens")])?;
        let err = translate(&mut deck, &locale("fr"), &dictionary).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Markup);
        assert_eq!(deck, before);
        assert_eq!(deck.locale(), &locale("en"));
        Ok(())
    }

    #[test]
    fn test_preconditions() -> Fallible<()> {
        let mut deck = Deck::new(locale("fr"), vec![WhiteCard::new("Dogs")], vec![]);
        let before = deck.clone();
        let full = dictionary(&[("Dogs", "Chiens")])?;
        assert!(translate(&mut deck, &locale("fr"), &full).is_err());

        let mut deck = Deck::new(locale("en"), vec![WhiteCard::new("Dogs")], vec![]);
        let empty = Dictionary::new(locale("fr"));
        let err = translate(&mut deck, &locale("fr"), &empty).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DictionaryLoad);

        let err = translate(&mut deck, &locale("de"), &full).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DictionaryLoad);
        assert_eq!(deck.locale(), &locale("en"));
        assert_eq!(before.white(), deck.white());
        Ok(())
    }

    #[test]
    fn test_word_tokens() {
        let text = "'Twas the dog's \"best\" day, 42!";
        let tokens: Vec<&str> = word_tokens(text).into_iter().map(|r| &text[r]).collect();
        assert_eq!(tokens, vec!["Twas", "the", "dog's", "best", "day", "42"]);
    }
}

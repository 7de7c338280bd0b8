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

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::markup::unescape_text;
use crate::types::locale::Locale;

/// A source-to-target lookup table for one target language.
///
/// Lookups are exact and case-sensitive.
#[derive(Debug)]
pub struct Dictionary {
    locale: Locale,
    entries: HashMap<String, String>,
    /// The number of word tokens in the longest term.
    longest_term: usize,
}

impl Dictionary {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            entries: HashMap::new(),
            longest_term: 0,
        }
    }

    /// The default location of the dictionary for `locale`, next to the
    /// dataset.
    pub fn default_path(data: &Path, locale: &Locale) -> PathBuf {
        let directory = data.parent().unwrap_or_else(|| Path::new("."));
        directory.join(format!("dictionary_{locale}.xml"))
    }

    /// Loads the dictionary for `target` from a file.
    pub fn load(path: &Path, target: &Locale) -> Fallible<Self> {
        let content = read_to_string(path).map_err(|e| {
            ErrorReport::dictionary_load(format!(
                "unable to read dictionary {}: {e}",
                path.display()
            ))
        })?;
        let dictionary = Self::parse(&content, target)?;
        log::debug!(
            "Loaded {} dictionary entries from {}.",
            dictionary.len(),
            path.display()
        );
        Ok(dictionary)
    }

    /// Parses a dictionary. Its declared language must be `target`.
    pub fn parse(content: &str, target: &Locale) -> Fallible<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut dictionary: Option<Dictionary> = None;
        let mut term: Option<String> = None;
        let mut translation: Option<String> = None;
        let mut in_entry = false;
        let mut finished = false;

        loop {
            let event = reader.read_event().map_err(|e| load_error(&reader, &e.to_string()))?;
            match event {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
                _ if finished => {
                    return Err(load_error(&reader, "content after the root element"));
                }
                Event::Start(e) => match e.name().as_ref() {
                    b"dictionary" if dictionary.is_none() => {
                        let locale = read_locale(&reader, &e)?;
                        if &locale != target {
                            return Err(ErrorReport::dictionary_load(format!(
                                "dictionary is for {locale}, not {target}"
                            )));
                        }
                        dictionary = Some(Dictionary::new(locale));
                    }
                    b"entry" if dictionary.is_some() && !in_entry => {
                        in_entry = true;
                    }
                    b"term" if in_entry => {
                        term = Some(read_plain_text(&mut reader, &e)?);
                    }
                    b"translation" if in_entry => {
                        translation = Some(read_plain_text(&mut reader, &e)?);
                    }
                    _ => return Err(unexpected_tag(&reader, &e)),
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"dictionary" if dictionary.is_none() => {
                        let locale = read_locale(&reader, &e)?;
                        if &locale != target {
                            return Err(ErrorReport::dictionary_load(format!(
                                "dictionary is for {locale}, not {target}"
                            )));
                        }
                        dictionary = Some(Dictionary::new(locale));
                        finished = true;
                    }
                    b"translation" if in_entry => {
                        translation = Some(String::new());
                    }
                    _ => return Err(unexpected_tag(&reader, &e)),
                },
                Event::End(e) => match e.name().as_ref() {
                    b"entry" => {
                        in_entry = false;
                        let (Some(source), Some(target_text)) = (term.take(), translation.take())
                        else {
                            return Err(load_error(
                                &reader,
                                "an entry needs both a <term> and a <translation>",
                            ));
                        };
                        if let Some(dictionary) = dictionary.as_mut() {
                            dictionary.insert(source, target_text)?;
                        }
                    }
                    _ => finished = true,
                },
                _ => return Err(load_error(&reader, "unexpected text")),
            }
        }

        match dictionary {
            Some(dictionary) if finished => Ok(dictionary),
            Some(_) => Err(load_error(&reader, "unexpected end of document")),
            None => Err(ErrorReport::dictionary_load("no <dictionary> element found")),
        }
    }

    /// Adds an entry. A repeated term replaces the earlier translation.
    pub fn insert(&mut self, term: String, translation: String) -> Fallible<()> {
        let term = term.trim().to_string();
        if term.is_empty() {
            return Err(ErrorReport::dictionary_load("dictionary entry with an empty term"));
        }
        self.longest_term = self.longest_term.max(count_words(&term));
        if let Some(previous) = self.entries.insert(term.clone(), translation.trim().to_string()) {
            log::debug!("Dictionary term {term:?} redefined (was {previous:?}).");
        }
        Ok(())
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.entries.get(term).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of word tokens in the longest term.
    pub fn longest_term(&self) -> usize {
        self.longest_term
    }
}

/// Whether `c` belongs to a word token.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '’'
}

fn count_words(text: &str) -> usize {
    text.split(|c: char| !is_word_char(c))
        .filter(|word| !word.is_empty())
        .count()
}

fn read_plain_text(reader: &mut Reader<&[u8]>, e: &BytesStart<'_>) -> Fallible<String> {
    let raw = reader
        .read_text(e.name())
        .map_err(|err| load_error(reader, &err.to_string()))?;
    unescape_text(&raw).map_err(|err| load_error(reader, err.message()))
}

fn read_locale(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Fallible<Locale> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| load_error(reader, &err.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xml:lang" || key == b"locale" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|err| load_error(reader, &err.to_string()))?;
            return Locale::parse(&value).map_err(|err| load_error(reader, err.message()));
        }
    }
    Err(load_error(reader, "the dictionary does not declare a locale"))
}

fn unexpected_tag(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> ErrorReport {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    load_error(reader, &format!("unexpected element <{name}>"))
}

fn load_error(reader: &Reader<&[u8]>, message: &str) -> ErrorReport {
    ErrorReport::dictionary_load(format!(
        "malformed dictionary at byte {}: {message}",
        reader.buffer_position()
    ))
}

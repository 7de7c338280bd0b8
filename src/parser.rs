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

use std::fs::read_to_string;
use std::path::Path;
use std::time::Instant;

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::card::BlackCard;
use crate::types::card::WhiteCard;
use crate::types::deck::Deck;
use crate::types::locale::Locale;

const ROOT_TAG: &[u8] = b"deck";
const WHITE_TAG: &[u8] = b"white";
const BLACK_TAG: &[u8] = b"black";
const CARD_TAG: &[u8] = b"card";

/// The blank count of a black card that does not declare one.
const DEFAULT_PICK: usize = 1;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    White,
    Black,
}

/// Reads and parses a card dataset.
pub fn parse_deck_file(path: &Path) -> Fallible<Deck> {
    if !path.exists() {
        return Err(ErrorReport::data_format(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let content = read_to_string(path).map_err(|e| {
        ErrorReport::data_format(format!("unable to read {}: {e}", path.display()))
    })?;
    log::debug!("Parsing deck from {}...", path.display());
    let start = Instant::now();
    let deck = parse_deck(&content)?;
    let duration = Instant::now().duration_since(start).as_millis();
    log::debug!(
        "Parsed {} white and {} black cards in {duration}ms.",
        deck.white().len(),
        deck.black().len()
    );
    Ok(deck)
}

/// Parses a card dataset. Any deviation from the dataset format is a data
/// format error.
pub fn parse_deck(content: &str) -> Fallible<Deck> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut deck: Option<Deck> = None;
    let mut section: Option<Section> = None;
    let mut finished = false;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(&reader, e))?;
        match event {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
            _ if finished => {
                return Err(malformed(&reader, "content after the root element"));
            }
            Event::Start(e) => {
                if deck.is_none() {
                    expect_tag(&reader, &e, ROOT_TAG)?;
                    deck = Some(Deck::new(read_locale(&reader, &e)?, vec![], vec![]));
                    continue;
                }
                let Some(current) = section else {
                    section = Some(read_section(&reader, &e)?);
                    continue;
                };
                expect_tag(&reader, &e, CARD_TAG)?;
                let pick = match current {
                    Section::White => None,
                    Section::Black => Some(read_pick(&reader, &e)?),
                };
                let text = reader
                    .read_text(e.name())
                    .map_err(|err| xml_error(&reader, err))?;
                if text.trim().is_empty() {
                    return Err(malformed(&reader, "empty card"));
                }
                if let Some(deck) = deck.as_mut() {
                    match pick {
                        None => deck.push_white(WhiteCard::new(text.as_ref())),
                        Some(pick) => deck.push_black(BlackCard::new(text.as_ref(), pick)),
                    }
                }
            }
            Event::Empty(e) => {
                if deck.is_none() {
                    expect_tag(&reader, &e, ROOT_TAG)?;
                    deck = Some(Deck::new(read_locale(&reader, &e)?, vec![], vec![]));
                    finished = true;
                } else if section.is_none() {
                    read_section(&reader, &e)?;
                } else {
                    return Err(malformed(&reader, "empty card"));
                }
            }
            Event::End(_) => {
                if section.is_some() {
                    section = None;
                } else if deck.is_some() {
                    finished = true;
                } else {
                    return Err(malformed(&reader, "unexpected end tag"));
                }
            }
            Event::Text(_) | Event::GeneralRef(_) | Event::CData(_) => {
                return Err(malformed(&reader, "text outside of a card"));
            }
        }
    }

    match deck {
        Some(deck) if finished => Ok(deck),
        Some(_) => Err(malformed(&reader, "unexpected end of document: unclosed element")),
        None => Err(ErrorReport::data_format("no <deck> element found")),
    }
}

fn read_section(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Fallible<Section> {
    match e.name().as_ref() {
        WHITE_TAG => Ok(Section::White),
        BLACK_TAG => Ok(Section::Black),
        _ => Err(unexpected_tag(reader, e)),
    }
}

fn read_locale(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Fallible<Locale> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(reader, &format!("bad attribute: {err}")))?;
        let key = attr.key.as_ref();
        if key == b"xml:lang" || key == b"locale" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|err| malformed(reader, &format!("bad attribute: {err}")))?;
            return Locale::parse(&value).map_err(|err| malformed(reader, err.message()));
        }
    }
    Err(malformed(reader, "the deck does not declare a locale"))
}

fn read_pick(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Fallible<usize> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(reader, &format!("bad attribute: {err}")))?;
        if attr.key.as_ref() == b"pick" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|err| malformed(reader, &format!("bad attribute: {err}")))?;
            return value
                .trim()
                .parse::<usize>()
                .map_err(|_| malformed(reader, &format!("invalid pick value: {value:?}")));
        }
    }
    Ok(DEFAULT_PICK)
}

fn expect_tag(reader: &Reader<&[u8]>, e: &BytesStart<'_>, tag: &[u8]) -> Fallible<()> {
    if e.name().as_ref() == tag {
        Ok(())
    } else {
        Err(unexpected_tag(reader, e))
    }
}

fn unexpected_tag(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> ErrorReport {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    malformed(reader, &format!("unexpected element <{name}>"))
}

fn malformed(reader: &Reader<&[u8]>, message: &str) -> ErrorReport {
    ErrorReport::data_format(format!(
        "malformed card data at byte {}: {message}",
        reader.buffer_position()
    ))
}

fn xml_error(reader: &Reader<&[u8]>, error: quick_xml::Error) -> ErrorReport {
    malformed(reader, &error.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_deck() -> Fallible<()> {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- A small deck. -->
<deck xml:lang="en">
  <white>
    <card>Dogs</card>
    <card> Cats &amp; dogs </card>
  </white>
  <black>
    <card pick="2">I love ___ and <blank/>.</card>
    <card>Why?</card>
  </black>
</deck>
"#;
        let deck = parse_deck(xml)?;
        assert_eq!(deck.locale().as_str(), "en");
        let white: Vec<&str> = deck.white().iter().map(|c| c.text()).collect();
        assert_eq!(white, vec!["Dogs", "Cats &amp; dogs"]);
        assert_eq!(deck.black().len(), 2);
        assert_eq!(deck.black()[0].text(), "I love ___ and <blank/>.");
        assert_eq!(deck.black()[0].blank_count(), 2);
        assert_eq!(deck.black()[1].blank_count(), DEFAULT_PICK);
        Ok(())
    }

    #[test]
    fn test_locale_attribute_alias() -> Fallible<()> {
        let deck = parse_deck(r#"<deck locale="fr_ca"><white><card>Chiens</card></white></deck>"#)?;
        assert_eq!(deck.locale().as_str(), "fr-CA");
        Ok(())
    }

    #[test]
    fn test_sections_in_any_order() -> Fallible<()> {
        let xml = r#"<deck xml:lang="en">
            <black><card pick="0">Haiku.</card></black>
            <white><card>A</card></white>
            <white/>
            <white><card>B</card></white>
        </deck>"#;
        let deck = parse_deck(xml)?;
        assert_eq!(deck.white().len(), 2);
        assert_eq!(deck.black()[0].blank_count(), 0);
        Ok(())
    }

    #[test]
    fn test_empty_deck() -> Fallible<()> {
        let deck = parse_deck(r#"<deck xml:lang="en"/>"#)?;
        assert!(deck.is_empty());
        Ok(())
    }

    #[test]
    fn test_unclosed_tag() {
        let xml = r#"<deck xml:lang="en"><white><card>Dogs</card></white>"#;
        let err = parse_deck(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn test_unclosed_card() {
        let xml = r#"<deck xml:lang="en"><white><card>Dogs</white></deck>"#;
        let err = parse_deck(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn test_missing_locale() {
        let err = parse_deck("<deck><white/></deck>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(err.message().contains("locale"));
    }

    #[test]
    fn test_invalid_pick() {
        let xml = r#"<deck xml:lang="en"><black><card pick="two">Why ___?</card></black></deck>"#;
        let err = parse_deck(xml).unwrap_err();
        assert!(err.message().contains("pick"));
    }

    #[test]
    fn test_unknown_element() {
        let xml = r#"<deck xml:lang="en"><green><card>Dogs</card></green></deck>"#;
        assert!(parse_deck(xml).is_err());
    }

    #[test]
    fn test_text_outside_card() {
        let xml = r#"<deck xml:lang="en"><white>Dogs</white></deck>"#;
        assert!(parse_deck(xml).is_err());
    }

    #[test]
    fn test_cdata_card_keeps_its_source() -> Fallible<()> {
        let xml = r#"<deck xml:lang="en"><white><card><![CDATA[Dogs & cats]]></card></white></deck>"#;
        let deck = parse_deck(xml)?;
        assert_eq!(deck.white()[0].text(), "<![CDATA[Dogs & cats]]>");
        Ok(())
    }

    #[test]
    fn test_empty_card() {
        assert!(parse_deck(r#"<deck xml:lang="en"><white><card/></white></deck>"#).is_err());
        assert!(parse_deck(r#"<deck xml:lang="en"><white><card> </card></white></deck>"#).is_err());
    }

    #[test]
    fn test_trailing_content() {
        let xml = r#"<deck xml:lang="en"></deck><deck xml:lang="fr"></deck>"#;
        assert!(parse_deck(xml).is_err());
    }

    #[test]
    fn test_no_root() {
        assert!(parse_deck("").is_err());
    }

    #[test]
    fn test_parse_fixture() -> Fallible<()> {
        let deck = parse_deck_file(&PathBuf::from("./test/deck.xml"))?;
        assert_eq!(deck.locale().as_str(), "en");
        assert!(!deck.white().is_empty());
        assert!(!deck.black().is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_fixture() {
        let err = parse_deck_file(&PathBuf::from("./test/malformed.xml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_deck_file(&PathBuf::from("./derpherp.xml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }
}

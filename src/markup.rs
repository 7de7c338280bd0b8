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

//! Card text is a small XML fragment: character data with the occasional
//! inline element (`<blank/>`, `<i>`, ...). This module tokenizes a fragment
//! into segments that can be rewritten without disturbing the markup around
//! them, and builds the node tree used for rendering.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::partial_escape;
use quick_xml::escape::unescape;
use quick_xml::events::Event;

use crate::error::ErrorReport;
use crate::error::Fallible;

/// The element name of a blank marker.
pub const BLANK_TAG: &str = "blank";

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Name of the synthetic root element wrapped around a fragment so that it
/// parses as a document.
const WRAPPER: &str = "cahcards-fragment";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SegmentKind {
    /// Character data, in escaped form.
    Text,
    /// An entity or character reference such as `&amp;`.
    Reference,
    /// A CDATA section. Its content is character data, taken literally.
    CData,
    /// A start tag. Carries the lowercased local name.
    Open(String),
    /// An end tag.
    Close(String),
    /// A self-closing tag.
    Empty(String),
    /// Comments, carried through verbatim.
    Other,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Segment {
    pub kind: SegmentKind,
    /// The segment's source text.
    pub raw: String,
    /// Byte offset of `raw` within the fragment's source.
    pub start: usize,
}

impl Segment {
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self.kind,
            SegmentKind::Text | SegmentKind::Reference | SegmentKind::CData
        )
    }

    /// The content of a CDATA section, and its byte offset within the
    /// fragment's source.
    pub fn cdata(&self) -> Option<(&str, usize)> {
        if self.kind != SegmentKind::CData {
            return None;
        }
        self.raw
            .strip_prefix(CDATA_OPEN)
            .and_then(|inner| inner.strip_suffix(CDATA_CLOSE))
            .map(|inner| (inner, self.start + CDATA_OPEN.len()))
    }

    /// The character data this segment stands for. Empty for markup.
    pub fn plain(&self) -> Fallible<Cow<'_, str>> {
        match self.kind {
            SegmentKind::Text | SegmentKind::Reference => {
                unescape_text(&self.raw).map(Cow::Owned)
            }
            SegmentKind::CData => Ok(Cow::Borrowed(
                self.cdata().map(|(inner, _)| inner).unwrap_or_default(),
            )),
            _ => Ok(Cow::Borrowed("")),
        }
    }
}

/// A piece of a fragment's source: either a run of character data (one
/// text node) or a piece of markup.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Piece<'a> {
    /// `raw` is the source of the node, `plain` its character data.
    Text { raw: &'a str, plain: String },
    Markup(&'a str),
}

/// A node in the element tree of a fragment.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Node {
    /// Unescaped character data.
    Text(String),
    Element { name: String, children: Vec<Node> },
}

/// A parsed, well-formed markup fragment.
#[derive(Clone, Debug)]
pub struct Fragment {
    /// The fragment re-serialized from its segments.
    source: String,
    segments: Vec<Segment>,
}

impl Fragment {
    /// Parses card text. Any well-formedness problem is a markup error.
    pub fn parse(text: &str) -> Fallible<Self> {
        let wrapped = format!("<{WRAPPER}>{text}</{WRAPPER}>");
        let mut reader = Reader::from_str(&wrapped);
        reader.config_mut().trim_text(false);

        let mut fragment = Fragment {
            source: String::with_capacity(text.len()),
            segments: Vec::new(),
        };
        let mut open: Vec<String> = Vec::new();
        let mut started = false;
        let mut closed = false;
        loop {
            let event = reader
                .read_event()
                .map_err(|e| ErrorReport::markup(format!("malformed card text {text:?}: {e}")))?;
            if closed && !matches!(event, Event::Eof) {
                return Err(ErrorReport::markup(format!(
                    "malformed card text {text:?}: content after end of fragment"
                )));
            }
            match event {
                Event::Start(e) => {
                    if !started {
                        started = true;
                        continue;
                    }
                    let name = local_name(e.name().as_ref())?;
                    fragment.push(SegmentKind::Open(name.clone()), format!("<{}>", utf8(&e)?));
                    open.push(name);
                }
                Event::End(e) => match open.pop() {
                    Some(name) => {
                        fragment.push(SegmentKind::Close(name), format!("</{}>", utf8(&e)?));
                    }
                    None => closed = true,
                },
                Event::Empty(e) => {
                    let name = local_name(e.name().as_ref())?;
                    fragment.push(SegmentKind::Empty(name), format!("<{}/>", utf8(&e)?));
                }
                Event::Text(e) => {
                    fragment.push(SegmentKind::Text, utf8(&e)?.to_string());
                }
                Event::GeneralRef(e) => {
                    fragment.push(SegmentKind::Reference, format!("&{};", utf8(&e)?));
                }
                Event::CData(e) => {
                    fragment.push(
                        SegmentKind::CData,
                        format!("{CDATA_OPEN}{}{CDATA_CLOSE}", utf8(&e)?),
                    );
                }
                Event::Comment(e) => {
                    fragment.push(SegmentKind::Other, format!("<!--{}-->", utf8(&e)?));
                }
                Event::Eof => break,
                _ => {
                    return Err(ErrorReport::markup(format!(
                        "malformed card text {text:?}: declarations are not allowed in card text"
                    )));
                }
            }
        }
        if !closed || !open.is_empty() {
            return Err(ErrorReport::markup(format!(
                "malformed card text {text:?}: unclosed element"
            )));
        }
        Ok(fragment)
    }

    fn push(&mut self, kind: SegmentKind, raw: String) {
        let start = self.source.len();
        self.source.push_str(&raw);
        self.segments.push(Segment { kind, raw, start });
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Splits the source into text nodes and markup, in order. Adjacent
    /// character data, references and CDATA sections form a single text
    /// node.
    pub fn pieces(&self) -> Fallible<Vec<Piece<'_>>> {
        let mut pieces = Vec::new();
        let mut index = 0;
        while index < self.segments.len() {
            let segment = &self.segments[index];
            if segment.is_text() {
                let start = segment.start;
                let mut end = segment.end();
                let mut plain = segment.plain()?.into_owned();
                index += 1;
                while index < self.segments.len() && self.segments[index].is_text() {
                    end = self.segments[index].end();
                    plain.push_str(&self.segments[index].plain()?);
                    index += 1;
                }
                pieces.push(Piece::Text {
                    raw: &self.source[start..end],
                    plain,
                });
            } else {
                pieces.push(Piece::Markup(&self.source[segment.start..segment.end()]));
                index += 1;
            }
        }
        Ok(pieces)
    }

    /// The fragment's character data with markup removed. Each blank marker
    /// becomes `blank` and each line break a space.
    pub fn plain_text(&self, blank: &str) -> Fallible<String> {
        let mut text = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match &segment.kind {
                SegmentKind::Empty(name) if name == BLANK_TAG => text.push_str(blank),
                SegmentKind::Empty(name) if name == "br" => text.push(' '),
                _ => text.push_str(&segment.plain()?),
            }
        }
        Ok(text)
    }

    /// Builds the element tree. Comments are dropped.
    pub fn nodes(&self) -> Fallible<Vec<Node>> {
        let mut stack: Vec<(String, Vec<Node>)> = vec![(String::new(), Vec::new())];
        let mut pending = String::new();
        for segment in &self.segments {
            if segment.is_text() {
                pending.push_str(&segment.plain()?);
                continue;
            }
            flush_text(&mut pending, &mut stack)?;
            match &segment.kind {
                SegmentKind::Open(name) => stack.push((name.clone(), Vec::new())),
                SegmentKind::Close(_) => {
                    let (name, children) = stack
                        .pop()
                        .ok_or_else(|| ErrorReport::markup("unbalanced fragment"))?;
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| ErrorReport::markup("unbalanced fragment"))?;
                    parent.1.push(Node::Element { name, children });
                }
                SegmentKind::Empty(name) => {
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| ErrorReport::markup("unbalanced fragment"))?;
                    parent.1.push(Node::Element {
                        name: name.clone(),
                        children: Vec::new(),
                    });
                }
                SegmentKind::Other
                | SegmentKind::Text
                | SegmentKind::Reference
                | SegmentKind::CData => {}
            }
        }
        flush_text(&mut pending, &mut stack)?;
        match stack.pop() {
            Some((_, children)) if stack.is_empty() => Ok(children),
            _ => Err(ErrorReport::markup("unbalanced fragment")),
        }
    }
}

fn flush_text(pending: &mut String, stack: &mut [(String, Vec<Node>)]) -> Fallible<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let text = std::mem::take(pending);
    match stack.last_mut() {
        Some((_, children)) => {
            children.push(Node::Text(text));
            Ok(())
        }
        None => Err(ErrorReport::markup("unbalanced fragment")),
    }
}

/// Turns escaped character data into plain text.
pub fn unescape_text(raw: &str) -> Fallible<String> {
    unescape(raw)
        .map(|text| text.into_owned())
        .map_err(|e| ErrorReport::markup(format!("invalid reference in {raw:?}: {e}")))
}

/// Escapes plain text for embedding in a fragment. Only `&`, `<` and `>`
/// are escaped.
pub fn escape_text(plain: &str) -> String {
    partial_escape(plain).into_owned()
}

fn utf8(bytes: &[u8]) -> Fallible<&str> {
    std::str::from_utf8(bytes).map_err(|_| ErrorReport::markup("card text is not valid UTF-8"))
}

fn local_name(qualified: &[u8]) -> Fallible<String> {
    let name = utf8(qualified)?;
    let local = name.rsplit(':').next().unwrap_or(name);
    Ok(local.to_ascii_lowercase())
}

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

use std::ops::Range;
use std::time::Instant;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::markup::BLANK_TAG;
use crate::markup::Fragment;
use crate::markup::Segment;
use crate::markup::SegmentKind;
use crate::types::deck::Deck;

/// The canonical blank marker.
pub const CANONICAL_MARKER: &str = "<blank/>";

const CANONICAL_MARKER_IN_CDATA: &str = "]]><blank/><![CDATA[";

/// The shortest run of underscores that counts as a blank.
const MIN_UNDERSCORES: usize = 2;

/// The surface forms a blank can take in card text.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MarkerKind {
    /// A `<blank/>` element, or a `<blank>...</blank>` element with content.
    Tag,
    /// A run of underscores in character data.
    Underscores,
}

impl MarkerKind {
    /// Matchers in priority order. Earlier kinds win overlaps of equal
    /// extent.
    pub const PRIORITY: [MarkerKind; 2] = [MarkerKind::Tag, MarkerKind::Underscores];

    /// Finds every occurrence of this kind of marker.
    fn find(self, segments: &[Segment]) -> Vec<MarkerSpan> {
        match self {
            MarkerKind::Tag => find_tags(segments),
            MarkerKind::Underscores => find_underscores(segments),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MarkerSpan {
    pub kind: MarkerKind,
    /// Byte range within the fragment's source.
    pub range: Range<usize>,
    /// Whether the span lies inside a CDATA section.
    pub in_cdata: bool,
}

impl MarkerSpan {
    /// The text that replaces the span. Inside CDATA the section is closed
    /// around the marker and reopened after it.
    fn replacement(&self) -> &'static str {
        if self.in_cdata {
            CANONICAL_MARKER_IN_CDATA
        } else {
            CANONICAL_MARKER
        }
    }
}

fn is_blank_tag(name: &str) -> bool {
    name == BLANK_TAG
}

fn find_tags(segments: &[Segment]) -> Vec<MarkerSpan> {
    let mut spans = Vec::new();
    let mut index = 0;
    while index < segments.len() {
        match &segments[index].kind {
            SegmentKind::Empty(name) if is_blank_tag(name) => {
                spans.push(MarkerSpan {
                    kind: MarkerKind::Tag,
                    range: segments[index].start..segments[index].end(),
                    in_cdata: false,
                });
            }
            SegmentKind::Open(name) if is_blank_tag(name) => {
                // Find the matching close tag. Fragments are well-formed, so
                // it exists.
                let start = segments[index].start;
                let mut depth = 0usize;
                let mut cursor = index;
                while cursor < segments.len() {
                    match &segments[cursor].kind {
                        SegmentKind::Open(_) => depth += 1,
                        SegmentKind::Close(_) => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    cursor += 1;
                }
                let end = segments
                    .get(cursor)
                    .map(|segment| segment.end())
                    .unwrap_or(start);
                spans.push(MarkerSpan {
                    kind: MarkerKind::Tag,
                    range: start..end,
                    in_cdata: false,
                });
                index = cursor;
            }
            _ => {}
        }
        index += 1;
    }
    spans
}

fn find_underscores(segments: &[Segment]) -> Vec<MarkerSpan> {
    let mut spans = Vec::new();
    for segment in segments {
        match segment.kind {
            SegmentKind::Text => {
                underscore_runs(&segment.raw, segment.start, false, &mut spans);
            }
            SegmentKind::CData => {
                if let Some((inner, offset)) = segment.cdata() {
                    underscore_runs(inner, offset, true, &mut spans);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Collects the underscore runs in `text`, which starts at byte `offset` of
/// the fragment's source.
fn underscore_runs(text: &str, offset: usize, in_cdata: bool, spans: &mut Vec<MarkerSpan>) {
    let bytes = text.as_bytes();
    let mut position = 0;
    while position < bytes.len() {
        if bytes[position] == b'_' {
            let run_start = position;
            while position < bytes.len() && bytes[position] == b'_' {
                position += 1;
            }
            if position - run_start >= MIN_UNDERSCORES {
                spans.push(MarkerSpan {
                    kind: MarkerKind::Underscores,
                    range: offset + run_start..offset + position,
                    in_cdata,
                });
            }
        } else {
            position += 1;
        }
    }
}

/// Merges the spans from every matcher. Spans are ordered by start, the
/// longer span first, and a span that overlaps one already kept is dropped.
fn union_spans(mut spans: Vec<MarkerSpan>) -> Vec<MarkerSpan> {
    spans.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });
    let mut kept: Vec<MarkerSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        let overlaps = kept
            .last()
            .is_some_and(|last| span.range.start < last.range.end);
        if !overlaps {
            kept.push(span);
        }
    }
    kept
}

/// Finds every blank in a card's text, in order.
pub fn find_markers(fragment: &Fragment) -> Vec<MarkerSpan> {
    let mut spans = Vec::new();
    for kind in MarkerKind::PRIORITY {
        spans.extend(kind.find(fragment.segments()));
    }
    union_spans(spans)
}

/// Rewrites every blank in `text` to the canonical marker. Returns the new
/// text and the number of markers in it.
pub fn standardize_text(text: &str) -> Fallible<(String, usize)> {
    let fragment = Fragment::parse(text)?;
    let spans = find_markers(&fragment);
    let mut output = fragment.source().to_string();
    for span in spans.iter().rev() {
        log::trace!("Rewriting {:?} marker at {:?}.", span.kind, span.range);
        output.replace_range(span.range.clone(), span.replacement());
    }
    let count = count_markers(&output)?;
    Ok((output, count))
}

/// Counts the canonical markers in `text`.
pub fn count_markers(text: &str) -> Fallible<usize> {
    let fragment = Fragment::parse(text)?;
    Ok(fragment
        .segments()
        .iter()
        .filter(|segment| matches!(&segment.kind, SegmentKind::Empty(name) if is_blank_tag(name)))
        .count())
}

/// A card that could not be standardized.
#[derive(Debug)]
pub struct CardFailure {
    /// Index of the card among the black cards.
    pub index: usize,
    pub error: ErrorReport,
}

#[derive(Debug, Default)]
pub struct BlankReport {
    /// Cards whose text was rewritten.
    pub rewritten: usize,
    /// Cards whose blank count was corrected.
    pub corrected: usize,
    pub failures: Vec<CardFailure>,
}

/// Standardizes the blanks on every black card in the deck. A card whose
/// text is malformed is left unmodified and recorded as a failure.
pub fn standardize_blanks(deck: &mut Deck) -> BlankReport {
    log::debug!("Standardizing blanks...");
    let start = Instant::now();
    let mut report = BlankReport::default();
    for index in 0..deck.black().len() {
        let Some(card) = deck.black_mut(index) else {
            continue;
        };
        match standardize_text(card.text()) {
            Ok((text, count)) => {
                if text != card.text() {
                    card.set_text(text);
                    report.rewritten += 1;
                }
                if count != card.blank_count() {
                    log::debug!(
                        "Correcting blank count of black card {index} from {} to {count}.",
                        card.blank_count()
                    );
                    card.set_blank_count(count);
                    report.corrected += 1;
                }
            }
            Err(error) => {
                log::warn!("Skipping black card {index}: {error}");
                report.failures.push(CardFailure { index, error });
            }
        }
    }
    let duration = Instant::now().duration_since(start).as_millis();
    log::debug!(
        "Blanks standardized in {duration}ms: {} rewritten, {} corrected, {} failed.",
        report.rewritten,
        report.corrected,
        report.failures.len()
    );
    report
}

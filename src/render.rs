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

mod template;

use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Instant;

use maud::Markup;
use maud::html;

use crate::config::Config;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::markup::BLANK_TAG;
use crate::markup::Fragment;
use crate::markup::Node;
use crate::render::template::page_template;
use crate::types::card::BlackCard;
use crate::types::card::WhiteCard;
use crate::types::deck::Deck;

/// Configuration for HTML rendering.
pub struct RenderOptions {
    /// The page title, also printed on every card.
    pub title: String,
    /// The stylesheet URL, relative to the HTML file.
    pub stylesheet: String,
    /// The number of cards on a printed sheet.
    pub cards_per_sheet: usize,
}

impl RenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.title.clone(),
            stylesheet: format!("{}/style.css", config.assets_dir),
            cards_per_sheet: config.cards_per_sheet,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CardColour {
    White,
    Black,
}

impl Display for CardColour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CardColour::White => write!(f, "white"),
            CardColour::Black => write!(f, "black"),
        }
    }
}

/// A card left out of the output because it could not be rendered.
#[derive(Debug)]
pub struct SkippedCard {
    pub colour: CardColour,
    pub index: usize,
    pub error: ErrorReport,
}

pub struct RenderedDeck {
    pub html: String,
    pub skipped: Vec<SkippedCard>,
}

/// Renders the deck as a printable HTML document.
pub fn render(deck: &Deck, options: &RenderOptions) -> Fallible<RenderedDeck> {
    if options.cards_per_sheet == 0 {
        return Err(ErrorReport::render("cards_per_sheet must be at least 1."));
    }
    log::debug!("Rendering {} cards...", deck.len());
    let start = Instant::now();

    let mut skipped = Vec::new();
    let mut white: Vec<Markup> = Vec::with_capacity(deck.white().len());
    for (index, card) in deck.white().iter().enumerate() {
        match white_card(card, options) {
            Ok(markup) => white.push(markup),
            Err(error) => skip(&mut skipped, CardColour::White, index, error),
        }
    }
    let mut black: Vec<Markup> = Vec::with_capacity(deck.black().len());
    for (index, card) in deck.black().iter().enumerate() {
        match black_card(card, options) {
            Ok(markup) => black.push(markup),
            Err(error) => skip(&mut skipped, CardColour::Black, index, error),
        }
    }
    if !deck.is_empty() && white.is_empty() && black.is_empty() {
        return Err(ErrorReport::render(format!(
            "none of the {} cards could be rendered.",
            deck.len()
        )));
    }

    let body = html! {
        @for sheet in white.chunks(options.cards_per_sheet) {
            section.sheet.white {
                @for card in sheet {
                    (card)
                }
            }
        }
        @for sheet in black.chunks(options.cards_per_sheet) {
            section.sheet.black {
                @for card in sheet {
                    (card)
                }
            }
        }
    };
    let page = page_template(&options.title, deck.locale(), &options.stylesheet, body);

    let duration = Instant::now().duration_since(start).as_millis();
    log::debug!("Rendered in {duration}ms; {} cards skipped.", skipped.len());
    Ok(RenderedDeck {
        html: page.into_string(),
        skipped,
    })
}

fn skip(skipped: &mut Vec<SkippedCard>, colour: CardColour, index: usize, error: ErrorReport) {
    log::warn!("Skipping {colour} card {index}: {error}");
    skipped.push(SkippedCard {
        colour,
        index,
        error,
    });
}

fn white_card(card: &WhiteCard, options: &RenderOptions) -> Fallible<Markup> {
    let nodes = Fragment::parse(card.text())?.nodes()?;
    Ok(html! {
        div.card.white {
            p.text { (render_nodes(&nodes)) }
            div.brand { (options.title) }
        }
    })
}

fn black_card(card: &BlackCard, options: &RenderOptions) -> Fallible<Markup> {
    let nodes = Fragment::parse(card.text())?.nodes()?;
    Ok(html! {
        div.card.black {
            p.text { (render_nodes(&nodes)) }
            @if card.blank_count() > 1 {
                div.pick {
                    "Pick "
                    span.count { (card.blank_count()) }
                }
            }
            div.brand { (options.title) }
        }
    })
}

fn render_nodes(nodes: &[Node]) -> Markup {
    html! {
        @for node in nodes {
            (render_node(node))
        }
    }
}

/// Renders a node. Character data is escaped; only a few formatting
/// elements are passed through, and never with their attributes.
fn render_node(node: &Node) -> Markup {
    match node {
        Node::Text(text) => html! { (text) },
        Node::Element { name, children } => match name.as_str() {
            BLANK_TAG => html! { span.blank {} },
            "i" | "em" => html! { em { (render_nodes(children)) } },
            "b" | "strong" => html! { strong { (render_nodes(children)) } },
            "u" => html! { u { (render_nodes(children)) } },
            "sup" => html! { sup { (render_nodes(children)) } },
            "sub" => html! { sub { (render_nodes(children)) } },
            "br" => html! { br; },
            _ => render_nodes(children),
        },
    }
}

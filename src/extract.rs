// src/extract.rs
// Pure HTML -> notices extraction. Never errors: malformed markup just
// yields fewer (or zero) notices.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// At most this many notices are taken per pass, in source order
/// (the page lists most-recent-first).
pub const MAX_NOTICES: usize = 10;

static SEL_BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".views-row, .avviso-item").unwrap());
static SEL_BLOCKS_FALLBACK: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static SEL_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static SEL_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time, .date-display-single").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    /// Absolute URL; identity key for novelty comparison. Exact string
    /// match, no normalization.
    pub link: String,
    /// Display date as shown on the page, empty when absent.
    pub date: String,
}

/// Extract candidate notices from the avvisi page markup.
///
/// Heuristic: announcement-specific blocks first, generic list items
/// when the specific classes match nothing. Per block, the first
/// anchor supplies title and link; the first time-like element
/// supplies the date. Blocks without an anchor or with an empty title
/// are skipped. A relative href is absolutized against `origin`; an
/// empty href falls back to `origin` itself (distinct notices may then
/// collapse to one identity, accepted).
pub fn extract_notices(html: &str, origin: &str) -> Vec<Notice> {
    let doc = Html::parse_document(html);

    let mut blocks: Vec<ElementRef> = doc.select(&SEL_BLOCKS).collect();
    if blocks.is_empty() {
        blocks = doc.select(&SEL_BLOCKS_FALLBACK).collect();
    }

    let mut out = Vec::new();
    for block in blocks {
        let Some(anchor) = block.select(&SEL_ANCHOR).next() else {
            continue;
        };
        let title = collapse_ws(anchor.text());
        if title.is_empty() {
            continue;
        }

        let href = anchor.value().attr("href").unwrap_or_default().trim();
        let link = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{origin}{href}")
        };

        let date = block
            .select(&SEL_DATE)
            .next()
            .map(|el| collapse_ws(el.text()))
            .unwrap_or_default();

        out.push(Notice { title, link, date });
        if out.len() == MAX_NOTICES {
            break;
        }
    }
    out
}

/// Join text fragments with single spaces, collapsing runs of
/// whitespace inside them.
fn collapse_ws<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

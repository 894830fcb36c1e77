use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::page;

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static READMORE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.field__item[data-readmore]").unwrap());
static READMORE_ANY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[data-readmore]").unwrap());
static FIELD_ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.field__item").unwrap());
static P_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

static FILE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"B-\d{4,7}(?:\.\d+)?").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\s+\d{1,2},\s+\d{4}")
        .unwrap()
});

/// Metadata pulled from a document-detail page. Any field may be empty;
/// absence is recorded as-is, not treated as an error.
#[derive(Debug, Default)]
pub struct DocMeta {
    pub title: String,
    pub file_number: String,
    pub date: String,
}

pub fn metadata(doc: &Html) -> DocMeta {
    let title = doc
        .select(&H1_SEL)
        .next()
        .map(page::inline_text)
        .unwrap_or_default();
    let main_text = page::flat_text(page::main_or_root(doc));
    let file_number = FILE_NUMBER_RE
        .find(&main_text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let date = DATE_RE
        .find(&main_text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    DocMeta {
        title,
        file_number,
        date,
    }
}

/// Raw decision body text, line structure preserved.
///
/// Prefers the expandable "read more" container, then any field item
/// that holds a paragraph and opens with "Decision", then the whole
/// main region.
pub fn decision_text(doc: &Html) -> String {
    if let Some(container) = doc
        .select(&READMORE_SEL)
        .next()
        .or_else(|| doc.select(&READMORE_ANY_SEL).next())
    {
        return page::block_text(container);
    }
    for block in doc.select(&FIELD_ITEM_SEL) {
        if block.select(&P_SEL).next().is_some() && opens_with_decision(block) {
            return page::block_text(block);
        }
    }
    page::block_text(page::main_or_root(doc))
}

fn opens_with_decision(block: scraper::ElementRef<'_>) -> bool {
    let head: String = page::flat_text(block).chars().take(50).collect();
    head.contains("Decision")
}

// ── Tests ──

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static MAIN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main").unwrap());

/// The main content region of a page, or the document root when the
/// page has no `<main>` landmark.
pub fn main_or_root(doc: &Html) -> ElementRef<'_> {
    doc.select(&MAIN_SEL).next().unwrap_or_else(|| doc.root_element())
}

/// All text under `el`, each node trimmed, joined with single spaces.
/// Used for regex scans where line structure does not matter.
pub fn flat_text(el: ElementRef<'_>) -> String {
    joined_text(el, " ")
}

/// All text under `el`, each node trimmed, joined with newlines so
/// `<br>` and block boundaries survive as line breaks.
pub fn block_text(el: ElementRef<'_>) -> String {
    joined_text(el, "\n")
}

/// All text under `el`, each node trimmed, concatenated. Used for short
/// inline content such as headings and anchor labels.
pub fn inline_text(el: ElementRef<'_>) -> String {
    joined_text(el, "")
}

fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

// ── Tests ──

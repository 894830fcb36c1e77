use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::text;

/// Key used when no heading is detected anywhere in the document.
pub const FALLBACK_SECTION: &str = "Full Report Text";

/// Fixed vocabulary of section names GAO decisions use, matched as exact
/// standalone lines before the generic all-caps pass runs.
pub const KNOWN_HEADINGS: &[&str] = &[
    "DIGEST",
    "BACKGROUND",
    "DISCUSSION",
    "DECISION",
    "CONCLUSION",
    "RECOMMENDATION",
    "CONCLUSIONS",
    "RECOMMENDATIONS",
];

/// Standalone-line matcher per known heading, in `KNOWN_HEADINGS` order.
static KNOWN_HEADING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    KNOWN_HEADINGS
        .iter()
        .map(|h| Regex::new(&format!(r"(?m)^{}\s*$", regex::escape(h))).unwrap())
        .collect()
});

/// Standalone line of uppercase letters/digits/limited punctuation,
/// 4-41 chars, treated as a generic heading candidate.
static CAPS_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[A-Z0-9][A-Z0-9\s’'()/\-,.:;]{3,40}$").unwrap());

/// Letter-spaced masthead artifact that passes the all-caps check but is
/// never a real heading.
const CAPS_ARTIFACTS: &[&str] = &["U N I T E D  S T A T E S"];

/// Partition normalized decision text into an ordered heading -> body
/// mapping.
///
/// Two candidate passes (known vocabulary, then generic all-caps lines)
/// record each heading at its first occurrence only. If a heading line
/// repeats later as a genuine delimiter, the later body overwrites the
/// earlier one under the same key while the key keeps its original
/// position. That data loss is a long-standing quirk of the output
/// format; callers depend on it, so it stays.
pub fn split_sections(full_text: &str) -> IndexMap<String, String> {
    let ft = text::normalize(full_text);
    if ft.is_empty() {
        return IndexMap::new();
    }

    // Pass 1: known section names, exact standalone lines.
    let mut found: HashMap<String, usize> = HashMap::new();
    for (heading, rx) in KNOWN_HEADINGS.iter().zip(KNOWN_HEADING_RES.iter()) {
        if let Some(m) = rx.find(&ft) {
            found.entry((*heading).to_string()).or_insert(m.start());
        }
    }

    // Pass 2: generic all-caps lines; first occurrence wins, known
    // headings already recorded are not displaced.
    for m in CAPS_LINE_RE.find_iter(&ft) {
        let cap = m.as_str().trim();
        if cap.to_uppercase() == cap && !CAPS_ARTIFACTS.contains(&cap) {
            found.entry(cap.to_string()).or_insert(m.start());
        }
    }

    if found.is_empty() {
        let mut out = IndexMap::new();
        out.insert(FALLBACK_SECTION.to_string(), ft);
        return out;
    }

    let mut ordered: Vec<(String, usize)> = found.into_iter().collect();
    ordered.sort_by_key(|(_, pos)| *pos);

    // Re-scan the text as a sequence of exact heading lines and slice
    // each body from the end of one heading to the start of the next.
    let alternation = ordered
        .iter()
        .map(|(h, _)| regex::escape(h))
        .collect::<Vec<_>>()
        .join("|");
    let rx = Regex::new(&format!(r"(?m)^({alternation})\s*$")).unwrap();
    let marks: Vec<(String, usize, usize)> = rx
        .find_iter(&ft)
        .map(|m| (m.as_str().trim().to_string(), m.start(), m.end()))
        .collect();

    let mut out = IndexMap::new();
    for (i, (name, _, end)) in marks.iter().enumerate() {
        let body_end = marks.get(i + 1).map(|next| next.1).unwrap_or(ft.len());
        out.insert(name.clone(), ft[*end..body_end].trim().to_string());
    }
    out
}

// ── Tests ──

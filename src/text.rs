use std::sync::LazyLock;

use regex::Regex;

static HYPHEN_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-\n(\w)").unwrap());
static EXTRA_NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Masthead/footer lines repeated on every page of a decision document.
/// Matched against one rstripped line at a time.
static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let patterns = [
        r"^441 G St\. N\.W\.$",
        r"^Washington, DC\b.*$",
        r"^Comptroller General\b.*$",
        r"^of the United States$",
        r"^U\.?S\.? Government Accountability Office$",
        r"^www\.gao\.gov$",
        r"^Page\s+\d+\s*$",
        r"^B-\d{4,7}(\.\d+)?\s*$",
        r"^\s*~+\s*$|^\s*–+\s*$|^\s*-{2,}\s*$",
    ];
    Regex::new(&format!("(?i){}", patterns.join("|"))).unwrap()
});

/// Docket number sandwiched between newlines, left behind when a page
/// footer straddled a line with leading whitespace.
static LONE_DOCKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*B-\d{4,7}(\.\d+)?\s*\n").unwrap());

/// Normalize whitespace: strip carriage returns, heal hyphenated word
/// breaks across line boundaries, collapse runs of blank lines, trim.
pub fn normalize(txt: &str) -> String {
    if txt.is_empty() {
        return String::new();
    }
    let txt = txt.replace('\r', "");
    let txt = HYPHEN_BREAK_RE.replace_all(&txt, "${1}${2}");
    let txt = EXTRA_NEWLINES_RE.replace_all(&txt, "\n\n");
    txt.trim().to_string()
}

/// Drop boilerplate lines, then normalize.
pub fn clean(txt: &str) -> String {
    if txt.is_empty() {
        return String::new();
    }
    let kept: Vec<&str> = txt
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !BOILERPLATE_RE.is_match(line))
        .collect();
    let joined = kept.join("\n");
    let joined = LONE_DOCKET_RE.replace_all(&joined, "\n");
    normalize(&joined)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_carriage_returns_and_trims() {
        assert_eq!(normalize("  foo\r\nbar  "), "foo\nbar");
    }

    #[test]
    fn normalize_heals_hyphen_breaks() {
        assert_eq!(normalize("procure-\nment"), "procurement");
    }

    #[test]
    fn normalize_collapses_blank_runs() {
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "DIGEST\n\nThe protest is denied.",
            "  leading and trailing  \r\n\n\n\ntext ",
            "hyphen-\nated words in a para-\ngraph",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn clean_drops_page_footers_and_docket_lines() {
        let cleaned = clean("DISCUSSION\nPage 4\nB-123456\nSome argument.");
        assert!(!cleaned.contains("Page 4"));
        assert!(!cleaned.contains("B-123456"));
        assert!(cleaned.contains("DISCUSSION"));
        assert!(cleaned.contains("Some argument."));
    }

    #[test]
    fn clean_drops_masthead_case_insensitively() {
        let cleaned = clean("Comptroller General\nOF THE UNITED STATES\nbody");
        assert_eq!(cleaned, "body");
    }

    #[test]
    fn clean_drops_separator_lines() {
        let cleaned = clean("before\n----\n~~~~\nafter");
        assert_eq!(cleaned, "before\nafter");
    }

    #[test]
    fn clean_removes_sandwiched_docket_line() {
        // Leading whitespace keeps this past the line filter; the
        // second pass catches it.
        let cleaned = clean("argument one\n  B-417123.2\nargument two");
        assert!(!cleaned.contains("B-417123.2"));
        assert!(cleaned.contains("argument one"));
        assert!(cleaned.contains("argument two"));
    }

    #[test]
    fn clean_keeps_docket_inside_prose() {
        let cleaned = clean("We refer to B-123456 in the matter above.");
        assert!(cleaned.contains("B-123456"));
    }
}

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::client::BASE_URL;
use crate::page;

const DOCUMENT_PATH: &str = "/products/";

static DOC_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*='/products/']"#).unwrap());
static NEXT_REL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[rel='next']"#).unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(BASE_URL).unwrap());

/// Collect decision-document links from a result-index page, in page
/// order, deduplicated by href within the page, absolutized.
pub fn collect_result_links(doc: &Html) -> Vec<String> {
    let main = page::main_or_root(doc);
    let mut links = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for anchor in main.select(&DOC_LINK_SEL) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let label = page::inline_text(anchor);
        if !href.contains(DOCUMENT_PATH) || label.is_empty() || !seen.insert(href) {
            continue;
        }
        if let Some(abs) = absolutize(href) {
            links.push(abs);
        }
    }
    links
}

/// Locate the next result-index page: an explicit rel="next" anchor,
/// falling back to any anchor labeled "Next".
pub fn next_page_url(doc: &Html) -> Option<String> {
    let anchor = doc.select(&NEXT_REL_SEL).next().or_else(|| {
        doc.select(&ANCHOR_SEL)
            .find(|a| page::inline_text(*a).contains("Next"))
    });
    let href = anchor?.value().attr("href")?;
    if href.is_empty() {
        return None;
    }
    absolutize(href)
}

fn absolutize(href: &str) -> Option<String> {
    match BASE.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("unresolvable href {href}: {e}");
            None
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_links_in_page_order() {
        let doc = Html::parse_document(
            r#"<html><main>
                <a href="/products/b-420001">Matter of: Alpha Corp.</a>
                <a href="/products/b-420002">Matter of: Beta LLC</a>
            </main></html>"#,
        );
        assert_eq!(
            collect_result_links(&doc),
            [
                "https://www.gao.gov/products/b-420001",
                "https://www.gao.gov/products/b-420002",
            ]
        );
    }

    #[test]
    fn deduplicates_by_href_within_page() {
        let doc = Html::parse_document(
            r#"<html><main>
                <a href="/products/b-420001">Matter of: Alpha Corp.</a>
                <a href="/products/b-420001">View Decision</a>
            </main></html>"#,
        );
        assert_eq!(collect_result_links(&doc).len(), 1);
    }

    #[test]
    fn skips_unlabeled_anchors_and_other_paths() {
        let doc = Html::parse_document(
            r#"<html><main>
                <a href="/products/b-420001"></a>
                <a href="/reports/r-1">Annual Report</a>
                <a href="/products/b-420002">Matter of: Beta LLC</a>
            </main></html>"#,
        );
        assert_eq!(
            collect_result_links(&doc),
            ["https://www.gao.gov/products/b-420002"]
        );
    }

    #[test]
    fn ignores_links_outside_main() {
        let doc = Html::parse_document(
            r#"<html><body>
                <nav><a href="/products/b-420009">Featured</a></nav>
                <main><a href="/products/b-420001">Matter of: Alpha Corp.</a></main>
            </body></html>"#,
        );
        assert_eq!(
            collect_result_links(&doc),
            ["https://www.gao.gov/products/b-420001"]
        );
    }

    #[test]
    fn absolute_hrefs_pass_through() {
        let doc = Html::parse_document(
            r#"<html><main>
                <a href="https://www.gao.gov/products/b-420003">Matter of: Gamma Inc.</a>
            </main></html>"#,
        );
        assert_eq!(
            collect_result_links(&doc),
            ["https://www.gao.gov/products/b-420003"]
        );
    }

    #[test]
    fn next_page_via_rel_attribute() {
        let doc = Html::parse_document(
            r#"<html><main><a rel="next" href="/search?page=2">2</a></main></html>"#,
        );
        assert_eq!(
            next_page_url(&doc).as_deref(),
            Some("https://www.gao.gov/search?page=2")
        );
    }

    #[test]
    fn next_page_via_label_fallback() {
        let doc = Html::parse_document(
            r#"<html><main><a href="/search?page=3">Next ›</a></main></html>"#,
        );
        assert_eq!(
            next_page_url(&doc).as_deref(),
            Some("https://www.gao.gov/search?page=3")
        );
    }

    #[test]
    fn no_next_link_means_end_of_results() {
        let doc = Html::parse_document("<html><main><a href='/search?page=1'>1</a></main></html>");
        assert_eq!(next_page_url(&doc), None);
    }
}

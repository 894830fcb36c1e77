use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use scraper::Html;
use tracing::{info, warn};

use crate::client::{self, Fetch};
use crate::crawler;
use crate::extract;
use crate::output::{self, DecisionRecord};
use crate::sections;
use crate::text;

pub struct RunOpts {
    pub search_url: String,
    pub out_csv: PathBuf,
    pub out_xlsx: PathBuf,
    /// Maximum index pages to walk; 0 = unbounded.
    pub max_pages: usize,
    /// Maximum records to harvest; 0 = unbounded.
    pub upto: usize,
}

/// How a crawl ended. `Done` covers natural exhaustion as well as
/// unrecoverable page/output failures; in every case the accumulated
/// records survive and get a final flush.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    BudgetReached,
    Interrupted,
}

/// Drive the full pipeline: crawl the result index, harvest one record
/// per discovered document URL, flush both outputs after every record
/// and once more on exit.
pub async fn run<F: Fetch>(
    fetch: &mut F,
    opts: &RunOpts,
    stop: &AtomicBool,
) -> anyhow::Result<Vec<DecisionRecord>> {
    let mut records = Vec::new();
    let outcome = crawl(fetch, opts, stop, &mut records).await;
    match outcome {
        Outcome::Interrupted => warn!("interrupted, saving partial results"),
        Outcome::BudgetReached => info!("reached --upto limit ({}), stopping", opts.upto),
        Outcome::Done => {}
    }
    // Final flush on every exit path, even if the last record already
    // flushed: disk must never be stale relative to memory.
    output::write_outputs(&records, &opts.out_csv, &opts.out_xlsx)?;
    Ok(records)
}

async fn crawl<F: Fetch>(
    fetch: &mut F,
    opts: &RunOpts,
    stop: &AtomicBool,
    records: &mut Vec<DecisionRecord>,
) -> Outcome {
    let mut page_url = opts.search_url.clone();
    let mut page_num = 1usize;
    let mut processed = 0usize;

    loop {
        if stop.load(Ordering::SeqCst) {
            return Outcome::Interrupted;
        }
        let Some(body) = fetch.get(&page_url).await else {
            warn!("skipping page (no HTML): {page_url}");
            return Outcome::Done;
        };
        let (links, next) = {
            let doc = Html::parse_document(&body);
            (crawler::collect_result_links(&doc), crawler::next_page_url(&doc))
        };
        if links.is_empty() {
            info!("no document links found on page, treating as end of results");
            return Outcome::Done;
        }

        for url in links {
            if stop.load(Ordering::SeqCst) {
                return Outcome::Interrupted;
            }
            if opts.upto > 0 && processed >= opts.upto {
                return Outcome::BudgetReached;
            }
            records.push(harvest_document(fetch, &url).await);
            processed += 1;
            if let Err(e) = output::write_outputs(records, &opts.out_csv, &opts.out_xlsx) {
                warn!("output write failed, stopping: {e}");
                return Outcome::Done;
            }
            client::human_sleep(0.35, 0.9).await;
        }

        page_num += 1;
        if opts.max_pages > 0 && page_num > opts.max_pages {
            return Outcome::Done;
        }
        let Some(next_url) = next else {
            return Outcome::Done;
        };
        page_url = next_url;
        client::human_sleep(0.6, 1.2).await;
    }
}

/// Fetch and structure one decision document. A failed fetch still
/// yields a record, with every textual field empty.
async fn harvest_document<F: Fetch>(fetch: &mut F, url: &str) -> DecisionRecord {
    let Some(body) = fetch.get(url).await else {
        return DecisionRecord::empty(url);
    };
    let doc = Html::parse_document(&body);
    let meta = extract::metadata(&doc);
    let raw = extract::decision_text(&doc);
    let cleaned = text::clean(&raw);
    let section_map = sections::split_sections(&cleaned);
    DecisionRecord {
        url: url.to_string(),
        title: meta.title,
        file_number: meta.file_number,
        date: meta.date,
        full_text: text::normalize(&cleaned),
        sections: section_map,
    }
}

// ── Tests ──

mod client;
mod crawler;
mod extract;
mod output;
mod page;
mod pipeline;
mod sections;
mod text;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::warn;

const SEARCH_URL_DEFAULT: &str = "https://www.gao.gov/search?keyword=Bid%20Protest%20Decisions\
&facets_query=&f%5B0%5D=ctype_search%3ABid%20Protest\
&f%5B1%5D=ctype_search%3ABid%20Protest%20Decision";

#[derive(Parser)]
#[command(
    name = "gao_protests",
    about = "Harvest GAO bid protest decisions into a DB-ready CSV and a review workbook"
)]
struct Cli {
    /// Result-index search URL to start from
    #[arg(long, default_value = SEARCH_URL_DEFAULT)]
    url: String,
    /// DB-ready tabular output
    #[arg(long, default_value = "gao_protest_file_upload.csv")]
    out_csv: PathBuf,
    /// Human-review workbook output
    #[arg(long, default_value = "gao_bid_protests.xlsx")]
    out_xlsx: PathBuf,
    /// Stop after walking N index pages (0 = no limit)
    #[arg(long, default_value_t = 0)]
    max_pages: usize,
    /// Stop after harvesting N decisions (0 = no limit)
    #[arg(long, default_value_t = 0)]
    upto: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let t0 = Instant::now();

    // Cooperative interruption: Ctrl-C flips the flag, the driver loop
    // notices before the next fetch and exits through the final flush.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing current document and saving");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut session = client::build_session().await?;
    let opts = pipeline::RunOpts {
        search_url: cli.url,
        out_csv: cli.out_csv,
        out_xlsx: cli.out_xlsx,
        max_pages: cli.max_pages,
        upto: cli.upto,
    };
    let records = pipeline::run(&mut session, &opts, &stop).await?;

    println!(
        "Done: {} decisions harvested in {}",
        records.len(),
        format_duration(t0.elapsed())
    );
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

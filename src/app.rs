//! One aggregation run: load → fetch and merge → write.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use std::path::PathBuf;

use crate::feed::{aggregate, load_sources, write_to_file, AggregatedFeed, Fetcher};
use crate::threshold::resolve_threshold;

/// What to aggregate and where to put it.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Raw "on or after" argument: `today`, `yesterday` or a date.
    pub on_or_after: Option<String>,
}

/// Wall-clock values for a run, captured once up front.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Local calendar date used to resolve `today`/`yesterday`.
    pub today: NaiveDate,
    /// Timestamp stamped on the output channel.
    pub now: DateTime<Utc>,
    /// Local UTC offset; the threshold day starts at midnight in it.
    pub offset: FixedOffset,
}

impl Clock {
    pub fn system() -> Self {
        let local = Local::now();
        Self {
            today: local.date_naive(),
            now: local.with_timezone(&Utc),
            offset: *local.offset(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The combined feed was written.
    Written {
        items: usize,
        skipped_sources: usize,
    },
    /// The source list was empty; nothing was fetched or written.
    NoSources,
}

/// Runs the whole pipeline once.
///
/// # Errors
///
/// Fails only when the source list cannot be loaded or the output cannot
/// be written. Individual sources that fail are skipped and counted in
/// `RunOutcome::Written { skipped_sources, .. }`.
pub async fn run(options: &RunOptions, fetcher: &Fetcher, clock: Clock) -> Result<RunOutcome> {
    let threshold = resolve_threshold(options.on_or_after.as_deref(), clock.today, clock.offset);

    let sources = load_sources(&options.input)?;
    if sources.is_empty() {
        println!("No feed URLs found in {}", options.input.display());
        return Ok(RunOutcome::NoSources);
    }
    println!(
        "Loaded {} feed URLs from {}",
        sources.len(),
        options.input.display()
    );
    if !threshold.is_unbounded() {
        println!("Keeping items published on or after {}", threshold);
    }

    let aggregation = aggregate(fetcher, &sources, threshold).await;
    tracing::info!(
        sources = sources.len(),
        fetched = aggregation.fetched_sources,
        skipped = aggregation.failures.len(),
        collected = aggregation.collected,
        kept = aggregation.entries.len(),
        threshold = %threshold,
        "Aggregation complete"
    );

    let skipped_sources = aggregation.failures.len();
    let feed = AggregatedFeed::new(aggregation.entries, clock.now);
    let items = write_to_file(&feed, &options.output)
        .with_context(|| format!("Could not write {}", options.output.display()))?;

    Ok(RunOutcome::Written {
        items,
        skipped_sources,
    })
}

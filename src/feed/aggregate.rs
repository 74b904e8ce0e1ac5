//! Merging of per-source results into one filtered, ordered entry list.

use crate::feed::fetcher::{FetchError, Fetcher};
use crate::feed::parser::{ParsedEntry, ParsedFeed};
use crate::threshold::DateThreshold;
use std::fmt;

/// A source that was skipped, with the reason.
///
/// Displays as the console line reported for it.
#[derive(Debug)]
pub struct SourceFailure {
    pub url: String,
    pub error: FetchError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", skip_notice(&self.url, &self.error))
    }
}

fn skip_notice(url: &str, error: &FetchError) -> String {
    format!("Skipping {}: {}", url, error)
}

/// Outcome of one aggregation pass.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Entries that passed the threshold, newest first.
    pub entries: Vec<ParsedEntry>,
    /// Sources that could not be fetched or parsed, in list order.
    pub failures: Vec<SourceFailure>,
    /// Number of sources that contributed (possibly zero) entries.
    pub fetched_sources: usize,
    /// Entries collected before filtering.
    pub collected: usize,
}

/// Fetches every source in order, one at a time, then filters and sorts.
///
/// A failing source is reported and skipped. It never aborts the pass and
/// never contributes entries.
pub async fn aggregate(
    fetcher: &Fetcher,
    sources: &[String],
    threshold: DateThreshold,
) -> Aggregation {
    let mut results = Vec::with_capacity(sources.len());

    for url in sources {
        let result = fetcher.fetch(url).await;
        match &result {
            Ok(feed) => {
                tracing::debug!(url = %url, entries = feed.entries.len(), "Fetched feed");
                println!("Fetched {} ({} entries)", url, feed.entries.len());
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Skipping feed");
                println!("{}", skip_notice(url, e));
            }
        }
        results.push((url.clone(), result));
    }

    merge(results, threshold)
}

/// Concatenates successful results in order, then filters and sorts.
pub fn merge<I>(results: I, threshold: DateThreshold) -> Aggregation
where
    I: IntoIterator<Item = (String, Result<ParsedFeed, FetchError>)>,
{
    let mut collected = Vec::new();
    let mut failures = Vec::new();
    let mut fetched_sources = 0;

    for (url, result) in results {
        match result {
            Ok(feed) => {
                fetched_sources += 1;
                collected.extend(feed.entries);
            }
            Err(error) => failures.push(SourceFailure { url, error }),
        }
    }

    let collected_count = collected.len();
    let mut entries = filter_on_or_after(collected, threshold);
    sort_newest_first(&mut entries);

    Aggregation {
        entries,
        failures,
        fetched_sources,
        collected: collected_count,
    }
}

/// Keeps entries published on or after the threshold day.
///
/// Undated entries survive only the epoch threshold.
pub fn filter_on_or_after(entries: Vec<ParsedEntry>, threshold: DateThreshold) -> Vec<ParsedEntry> {
    entries
        .into_iter()
        .filter(|e| threshold.admits(e.published))
        .collect()
}

/// Orders entries by publish time, most recent first.
///
/// The sort is stable, so equal timestamps keep aggregation order.
/// Undated entries go last.
pub fn sort_newest_first(entries: &mut [ParsedEntry]) {
    entries.sort_by(|a, b| b.published.cmp(&a.published));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parser::Origin;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(guid: &str, published: Option<DateTime<Utc>>) -> ParsedEntry {
        ParsedEntry {
            guid: guid.to_string(),
            title: Some(guid.to_string()),
            link: None,
            published,
            summary: None,
            content: None,
            authors: Vec::new(),
            categories: Vec::new(),
            comments: None,
            origin: Origin::default(),
        }
    }

    fn at(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn feed(entries: Vec<ParsedEntry>) -> ParsedFeed {
        ParsedFeed {
            title: None,
            entries,
        }
    }

    fn guids(entries: &[ParsedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.guid.as_str()).collect()
    }

    #[test]
    fn test_merge_concatenates_and_sorts() {
        let results = vec![
            (
                "https://a.example/rss".to_string(),
                Ok(feed(vec![entry("a1", at(2024, 1, 3)), entry("a2", at(2024, 1, 1))])),
            ),
            (
                "https://b.example/rss".to_string(),
                Ok(feed(vec![entry("b1", at(2024, 1, 2))])),
            ),
        ];

        let agg = merge(results, DateThreshold::unbounded());
        assert_eq!(guids(&agg.entries), vec!["a1", "b1", "a2"]);
        assert_eq!(agg.fetched_sources, 2);
        assert_eq!(agg.collected, 3);
        assert!(agg.failures.is_empty());
    }

    #[test]
    fn test_failed_source_contributes_nothing() {
        let results = vec![
            (
                "not a url".to_string(),
                Err(FetchError::Parse("bad".to_string())),
            ),
            (
                "https://b.example/rss".to_string(),
                Ok(feed(vec![entry("b1", at(2024, 1, 2))])),
            ),
        ];

        let agg = merge(results, DateThreshold::unbounded());
        assert_eq!(guids(&agg.entries), vec!["b1"]);
        assert_eq!(agg.failures.len(), 1);
        assert_eq!(agg.failures[0].url, "not a url");
    }

    #[tokio::test]
    async fn test_skipped_source_reported_with_reason() {
        let fetcher = Fetcher::with_client(
            reqwest::Client::new(),
            std::time::Duration::from_secs(1),
            1024,
        );
        let sources = vec!["this is not a url".to_string()];

        let agg = aggregate(&fetcher, &sources, DateThreshold::unbounded()).await;
        assert_eq!(agg.fetched_sources, 0);
        assert_eq!(agg.failures.len(), 1);
        assert!(matches!(agg.failures[0].error, FetchError::InvalidUrl(_)));
        assert!(agg.failures[0]
            .to_string()
            .starts_with("Skipping this is not a url: Malformed address"));
    }

    #[test]
    fn test_threshold_filters_older_entries() {
        let threshold = DateThreshold::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let results = vec![(
            "https://a.example/rss".to_string(),
            Ok(feed(vec![
                entry("old", at(2023, 12, 31)),
                entry("new", at(2024, 2, 1)),
                entry("boundary", Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
                entry("undated", None),
            ])),
        )];

        let agg = merge(results, threshold);
        assert_eq!(guids(&agg.entries), vec!["new", "boundary"]);
        assert_eq!(agg.collected, 4);
    }

    #[test]
    fn test_undated_kept_without_threshold_and_sorted_last() {
        let mut entries = filter_on_or_after(
            vec![entry("undated", None), entry("dated", at(2020, 5, 5))],
            DateThreshold::unbounded(),
        );
        sort_newest_first(&mut entries);
        assert_eq!(guids(&entries), vec!["dated", "undated"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_timestamps() {
        let same = at(2024, 3, 3);
        let mut entries = vec![
            entry("first", same),
            entry("newer", at(2024, 4, 4)),
            entry("second", same),
            entry("third", same),
        ];
        sort_newest_first(&mut entries);
        assert_eq!(guids(&entries), vec!["newer", "first", "second", "third"]);
    }

    fn arb_entries() -> impl Strategy<Value = Vec<ParsedEntry>> {
        prop::collection::vec(prop::option::weighted(0.9, 0i64..2_000_000_000), 0..40).prop_map(
            |stamps| {
                stamps
                    .into_iter()
                    .enumerate()
                    .map(|(i, ts)| {
                        entry(
                            &i.to_string(),
                            ts.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
                        )
                    })
                    .collect()
            },
        )
    }

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..25_000).prop_map(|days| {
            DateTime::<Utc>::UNIX_EPOCH.date_naive() + chrono::Duration::days(days)
        })
    }

    proptest! {
        #[test]
        fn prop_sorted_descending(entries in arb_entries(), date in arb_date()) {
            let mut kept = filter_on_or_after(entries, DateThreshold::new(date));
            sort_newest_first(&mut kept);
            for pair in kept.windows(2) {
                prop_assert!(pair[0].published >= pair[1].published);
            }
        }

        #[test]
        fn prop_filter_is_monotonic(entries in arb_entries(), a in arb_date(), b in arb_date()) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low_count = filter_on_or_after(entries.clone(), DateThreshold::new(low)).len();
            let high_count = filter_on_or_after(entries, DateThreshold::new(high)).len();
            prop_assert!(high_count <= low_count);
        }

        #[test]
        fn prop_merge_concatenates_successful_sources(
            first in 0usize..20,
            second in 0usize..20,
        ) {
            let undated = |prefix: &str, n: usize| -> Vec<ParsedEntry> {
                (0..n).map(|i| entry(&format!("{prefix}{i}"), None)).collect()
            };
            let expected: Vec<String> = undated("a", first)
                .into_iter()
                .chain(undated("c", second))
                .map(|e| e.guid)
                .collect();

            let results = vec![
                ("a".to_string(), Ok(feed(undated("a", first)))),
                ("b".to_string(), Err(FetchError::HttpStatus(500))),
                ("c".to_string(), Ok(feed(undated("c", second)))),
            ];
            let agg = merge(results, DateThreshold::unbounded());
            let got: Vec<String> = agg.entries.into_iter().map(|e| e.guid).collect();
            prop_assert_eq!(got, expected);
            prop_assert_eq!(agg.failures.len(), 1);
        }
    }
}

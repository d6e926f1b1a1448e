use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Row, Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use pulse_feed::{
    DisplayEntry, FeedConfig, FeedPhase, FeedSnapshot, FilterKey, ListingView, ResultItem,
    VisibilityEvent,
};
use pulse_feed_shard::{FeedDriver, FeedHandle, HttpPageSource, MemoryPageSource, PageSource};
use tokio::sync::watch;
use tracing::debug;

use crate::output;

pub struct BrowseOptions {
    pub view: ListingView,
    pub base_url: Option<String>,
    pub demo: bool,
    pub filters: Vec<(String, String)>,
    pub slugs: Vec<(String, String)>,
    pub pages: u32,
    pub config: Option<PathBuf>,
}

pub async fn execute(options: BrowseOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => FeedConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => FeedConfig::default(),
    };
    let view = options.view;
    let filter = build_filter(&options.filters, &options.slugs);
    for name in view.unknown_filters(&filter) {
        output::warn(format!("`{view}` does not filter on `{name}`, sending it anyway"));
    }

    let started = Instant::now();
    let snapshot = if options.demo {
        output::note("serving built-in sample data");
        let source = MemoryPageSource::new(demo_items(), config.page_size as usize);
        browse(view, config, source, filter, options.pages).await?
    } else {
        let base_url = options
            .base_url
            .context("`--base-url` is required unless `--demo` is set")?;
        let source = HttpPageSource::new(&base_url, view, &config)?;
        browse(view, config, source, filter, options.pages).await?
    };

    println!("{}", display_table(&snapshot));
    output::feed_summary(&snapshot, started.elapsed());
    Ok(())
}

/// Loads pages until `pages` were requested, the listing ends or a fetch
/// fails, reporting the last row visible after every load.
async fn browse<S: PageSource>(
    view: ListingView,
    config: FeedConfig,
    source: S,
    filter: FilterKey,
    pages: u32,
) -> Result<FeedSnapshot> {
    let pace = config.debounce();
    let (driver, handle) = FeedDriver::new(view, config, source);
    let task = driver.spawn();
    output::status("Browsing", format!("{view} ({filter})"));

    let spinner = spinner();
    spinner.set_message("loading page 1");
    let mut snapshot = settle(&handle, |handle| handle.set_filter(filter)).await?;
    debug!(page = snapshot.page, rows = snapshot.display.len(), "first page settled");

    while snapshot.page < pages
        && !matches!(snapshot.phase, FeedPhase::Exhausted | FeedPhase::Error(_))
    {
        let Some(last) = snapshot.display.last_key().cloned() else {
            break;
        };
        // Scroll at the pace the sentinel accepts triggers.
        tokio::time::sleep(pace).await;
        spinner.set_message(format!("loading page {}", snapshot.page + 1));
        let next = settle(&handle, |handle| handle.visible(VisibilityEvent::visible(last))).await?;
        if next.page == snapshot.page {
            debug!(page = next.page, "scroll did not trigger a fetch");
            break;
        }
        debug!(
            page = next.page,
            rows = next.display.len(),
            items = next.display.item_count(),
            "page settled"
        );
        snapshot = next;
    }
    spinner.finish_and_clear();

    handle.shutdown()?;
    task.await.context("feed driver panicked")?;
    Ok(snapshot)
}

/// Sends one command and waits for the first published state with no
/// request in flight.
async fn settle<F>(handle: &FeedHandle, send: F) -> Result<FeedSnapshot>
where
    F: FnOnce(&FeedHandle) -> Result<(), pulse_feed_shard::ShardError>,
{
    let mut snapshots: watch::Receiver<FeedSnapshot> = handle.subscribe();
    snapshots.mark_unchanged();
    send(handle)?;
    loop {
        snapshots
            .changed()
            .await
            .with_context(|| format!("feed driver for `{}` stopped", handle.view()))?;
        let snapshot = snapshots.borrow_and_update();
        if !snapshot.is_loading() {
            return Ok(snapshot.clone());
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn build_filter(filters: &[(String, String)], slugs: &[(String, String)]) -> FilterKey {
    let key = filters
        .iter()
        .fold(FilterKey::new(), |key, (name, value)| key.with(name.as_str(), value.as_str()));
    slugs
        .iter()
        .fold(key, |key, (name, raw)| key.with_slug(name.as_str(), raw))
}

fn display_table(snapshot: &FeedSnapshot) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(Row::from(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Row").fg(Color::Cyan),
            Cell::new("Order").fg(Color::Cyan),
            Cell::new("Items").fg(Color::Cyan),
        ]));

    for (index, entry) in snapshot.display.entries().iter().enumerate() {
        let kind = match entry {
            DisplayEntry::Group(group) => format!("group of {}", group.len()),
            DisplayEntry::Single(single) => single.item().container_type.clone(),
        };
        let titles: Vec<&str> = entry.items().iter().map(ResultItem::title).collect();
        table.add_row(Row::from(vec![
            Cell::new(index + 1),
            Cell::new(kind),
            Cell::new(entry.rank()),
            Cell::new(titles.join(" | ")),
        ]));
    }
    table
}

/// Sample listing with grouped cards interleaved with single posts.
fn demo_items() -> Vec<ResultItem> {
    const SECTORS: [&str; 3] = ["banking", "energy", "retail"];
    (0..30i32)
        .map(|index| {
            let container = if index % 4 == 3 { "Type-Two" } else { "Type-One" };
            let sector = SECTORS[index as usize % SECTORS.len()];
            let mut item = ResultItem::new(format!("demo-{index}"), (index * 7) % 30, container);
            item.fields
                .insert("title".into(), format!("{sector} signal {index}").into());
            item.fields.insert("sectorId".into(), sector.into());
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_normalized_and_blanks_dropped() {
        let filter = build_filter(
            &[("sectorId".into(), "12".into()), ("postType".into(), " ".into())],
            &[("subSectorId".into(), "Retail & Consumer".into())],
        );
        assert_eq!(filter.get("sectorId"), Some("12"));
        assert_eq!(filter.get("postType"), None);
        assert_eq!(filter.get("subSectorId"), Some("retail-consumer"));
    }

    #[tokio::test]
    async fn demo_browse_stops_at_page_limit() {
        let config = FeedConfig::default().debounce_ms(0).page_size(5);
        let source = MemoryPageSource::new(demo_items(), 5);
        let snapshot = browse(ListingView::PulseToday, config, source, FilterKey::new(), 3)
            .await
            .expect("demo source never fails");

        assert_eq!(snapshot.page, 3);
        assert_eq!(snapshot.display.item_count(), 15);
        assert!(snapshot.has_more);
        assert_eq!(snapshot.total_count, Some(30));
    }

    #[tokio::test]
    async fn demo_browse_reaches_the_end_of_a_filtered_listing() {
        let config = FeedConfig::default().debounce_ms(0);
        let source = MemoryPageSource::new(demo_items(), 10);
        let filter = FilterKey::new().with("sectorId", "energy");
        let snapshot = browse(ListingView::TrendAnalyzer, config, source, filter, 10)
            .await
            .expect("demo source never fails");

        assert_eq!(snapshot.phase, FeedPhase::Exhausted);
        assert_eq!(snapshot.display.item_count(), 10);
        let rendered = display_table(&snapshot).to_string();
        assert!(rendered.contains("energy signal 1"));
        assert!(!rendered.contains("banking"));
    }
}

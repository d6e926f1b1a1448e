use std::time::Duration;

use console::{StyledObject, style};
use indicatif::HumanDuration;
use pulse_feed::{FeedPhase, FeedSnapshot};

const STATUS_WIDTH: usize = 12;

pub fn status(label: &str, message: impl AsRef<str>) {
    eprintln!(
        "{:>width$} {}",
        style(label).green().bold(),
        message.as_ref(),
        width = STATUS_WIDTH
    );
}

pub fn warn(message: impl AsRef<str>) {
    tagged(style("warning").yellow(), message.as_ref());
}

pub fn note(message: impl AsRef<str>) {
    tagged(style("note").blue(), message.as_ref());
}

fn tagged(tag: StyledObject<&str>, message: &str) {
    eprintln!("{}: {message}", tag.bold());
}

/// Closing lines after a browse: what was loaded and how the feed ended.
pub fn feed_summary(snapshot: &FeedSnapshot, elapsed: Duration) {
    status(
        "Loaded",
        format!(
            "{} rows ({} items) from {} page(s) in {}",
            snapshot.display.len(),
            snapshot.display.item_count(),
            snapshot.page,
            HumanDuration(elapsed)
        ),
    );
    if let Some(total) = snapshot.total_count {
        note(format!("the server reports {total} matching items"));
    }
    match &snapshot.phase {
        FeedPhase::Error(err) => tagged(
            style("error").red(),
            &format!("{} ({err})", err.user_message()),
        ),
        FeedPhase::Exhausted => status("Finished", "reached the end of the listing"),
        FeedPhase::Idle if snapshot.has_more => note("more pages available, raise `--pages`"),
        _ => {}
    }
}

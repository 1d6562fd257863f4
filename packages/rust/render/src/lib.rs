//! Markdown rendering of the collection.
//!
//! Produces the following layout under the output directory:
//! ```text
//! <output_dir>/
//! ├── README.md          (title, owner, count, latest week, week index)
//! └── data/
//!     ├── 2024-1.md
//!     ├── 2024-2.md
//!     └── ...
//! ```
//!
//! Weeks are ISO weeks of `published + 47h`, so a new page starts every
//! Saturday at 01:00 UTC. Rendering is a pure read of the collection; every
//! file goes through [`write_atomic`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use feedcollector_shared::{Collection, CollectorError, ResolvedItem, Result, write_atomic};

/// Offset applied before taking the ISO week (Monday 00:00 minus 47h is Saturday 01:00).
const WEEK_SHIFT_HOURS: i64 = 47;

/// Heading used when the collection has no title yet.
const FALLBACK_TITLE: &str = "Saved links";

/// Where and for whom to render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Directory receiving `README.md` and `data/`.
    pub output_dir: PathBuf,
    /// Owner shown in the README.
    pub user_name: String,
}

/// Files written by [`render`].
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub readme: PathBuf,
    pub week_pages: Vec<PathBuf>,
    pub item_count: usize,
}

/// ISO (year, week) an item belongs to.
pub fn week_of(published: DateTime<Utc>) -> (i32, u32) {
    let week = (published + Duration::hours(WEEK_SHIFT_HOURS)).iso_week();
    (week.year(), week.week())
}

/// Page name for a week, e.g. `2024-5`.
pub fn week_name((year, week): (i32, u32)) -> String {
    format!("{year}-{week}")
}

/// Render the README and one page per week.
#[instrument(skip_all, fields(items = collection.len(), output = %opts.output_dir.display()))]
pub fn render(collection: &Collection, opts: &RenderOptions) -> Result<RenderResult> {
    let weeks = group_by_week(&collection.items);

    let data_dir = opts.output_dir.join("data");
    let mut week_pages = Vec::with_capacity(weeks.len());
    for (key, items) in &weeks {
        let name = week_name(*key);
        let path = data_dir.join(format!("{name}.md"));
        write_page(&path, &week_page(&name, items))?;
        debug!(week = %name, items = items.len(), "week page written");
        week_pages.push(path);
    }

    let readme = opts.output_dir.join("README.md");
    write_page(&readme, &readme_page(collection, &opts.user_name, &weeks))?;

    info!(weeks = week_pages.len(), "rendering complete");

    Ok(RenderResult {
        readme,
        week_pages,
        item_count: collection.len(),
    })
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

type Weeks<'a> = BTreeMap<(i32, u32), Vec<&'a ResolvedItem>>;

fn group_by_week(items: &[ResolvedItem]) -> Weeks<'_> {
    let mut weeks: Weeks<'_> = BTreeMap::new();
    for item in items {
        weeks.entry(week_of(item.published)).or_default().push(item);
    }
    for items in weeks.values_mut() {
        items.sort_by_key(|item| item.published);
    }
    weeks
}

fn week_page(name: &str, items: &[&ResolvedItem]) -> String {
    let mut out = format!("# {name}\n");
    push_days(&mut out, items);
    out
}

fn readme_page(collection: &Collection, user_name: &str, weeks: &Weeks<'_>) -> String {
    let title = if collection.title.trim().is_empty() {
        FALLBACK_TITLE
    } else {
        collection.title.as_str()
    };

    let mut out = format!("# {}\n\n", escape_text(title));
    out.push_str(&format!(
        "Links saved by {user_name}. Total: {}.\n",
        collection.len()
    ));

    if let Some((key, items)) = weeks.iter().next_back() {
        out.push_str(&format!("\n## Latest: {}\n", week_name(*key)));
        push_days(&mut out, items);
    }

    if !weeks.is_empty() {
        out.push_str("\n## Archive\n\n");
        for key in weeks.keys().rev() {
            let name = week_name(*key);
            out.push_str(&format!("- [{name}](data/{name}.md)\n"));
        }
    }

    out
}

/// Items grouped under one `### 02 Jan 2006` heading per day.
fn push_days(out: &mut String, items: &[&ResolvedItem]) {
    let mut current: Option<NaiveDate> = None;
    for item in items {
        let day = item.published.date_naive();
        if current != Some(day) {
            out.push_str(&format!("\n### {}\n\n", day.format("%d %b %Y")));
            current = Some(day);
        }
        out.push_str(&format!(
            "- [{}]({})\n",
            escape_text(&item.title),
            escape_link(&item.link)
        ));
    }
}

fn escape_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

fn escape_link(link: &str) -> String {
    link.replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
}

fn write_page(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
        .map_err(|e| CollectorError::Render(format!("cannot write {}: {e}", path.display())))
}

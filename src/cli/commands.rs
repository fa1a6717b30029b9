use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args};

use crate::app::App;
use crate::calendar::{CalendarCell, CalendarGrid, CalendarWidget, CellFlags};
use crate::config::AppConfig;
use crate::filter::{ApplyOutcome, FilterEngine, FilterRequest, TypeChoice};
use crate::page::Page;
use crate::status::{self, Indicator, ModelStatus, StatusError};

const WEEKDAYS: &str = "Su Mo Tu We Th Fr Sa";

#[derive(Args, Debug, Clone, Default)]
#[command(group(
    ArgGroup::new("facet")
        .required(true)
        .args(["tag", "theme", "archive", "day", "search", "kind"])
))]
pub struct FilterArgs {
    /// Show posts carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
    /// Show posts matching any tag of the named theme card
    #[arg(long)]
    pub theme: Option<String>,
    /// Show posts from a month (YYYY-MM)
    #[arg(long)]
    pub archive: Option<String>,
    /// Show posts from a day (YYYY-MM-DD)
    #[arg(long)]
    pub day: Option<String>,
    /// Case-insensitive substring search over post text
    #[arg(long)]
    pub search: Option<String>,
    /// Post type: all, original or repost
    #[arg(long = "type")]
    pub kind: Option<TypeChoice>,
    /// Limit the number of posts printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CalendarArgs {
    /// Month to print (YYYY-MM); defaults to the latest month with posts
    #[arg()]
    pub month: Option<String>,
}

pub fn run_tui(config: AppConfig, page: &Path) -> Result<()> {
    if !atty::is(atty::Stream::Stdout) {
        bail!("the interactive browser needs a terminal; try `archive-tui filter` instead");
    }
    let mut app = App::new(config, page)?;
    app.run()
}

pub fn filter_posts(config: &AppConfig, page: &Path, args: FilterArgs) -> Result<()> {
    let page = Page::load(page)?;
    let output = run_filter(&page, &args, config.ui.headline_chars)?;
    print!("{output}");
    Ok(())
}

fn filter_request(page: &Page, args: &FilterArgs) -> Result<FilterRequest> {
    if let Some(tag) = &args.tag {
        return Ok(FilterRequest::Tag(tag.clone()));
    }
    if let Some(name) = &args.theme {
        let card = page
            .themes
            .iter()
            .find(|card| card.name.eq_ignore_ascii_case(name.trim()))
            .with_context(|| {
                format!("no theme named {name:?} on {}", page.location.path.display())
            })?;
        return Ok(FilterRequest::Theme {
            name: card.name.clone(),
            tags: card.tags.clone(),
        });
    }
    if let Some(month) = &args.archive {
        return Ok(FilterRequest::Archive(month.clone()));
    }
    if let Some(day) = &args.day {
        return Ok(FilterRequest::Day(day.clone()));
    }
    if let Some(term) = &args.search {
        return Ok(FilterRequest::Search(term.clone()));
    }
    if let Some(kind) = args.kind {
        return Ok(FilterRequest::Type(kind));
    }
    bail!("choose one of --tag, --theme, --archive, --day, --search or --type")
}

fn run_filter(page: &Page, args: &FilterArgs, headline_chars: usize) -> Result<String> {
    let request = filter_request(page, args)?;
    let mut engine = FilterEngine::new(page.posts.clone());
    let mut out = String::new();
    match engine.apply(request) {
        ApplyOutcome::Applied { label, .. } => {
            let _ = writeln!(&mut out, "{label}");
        }
        ApplyOutcome::Cleared => {
            let _ = writeln!(&mut out, "All posts ({})", engine.posts().len());
        }
    }
    let visible = engine.posts().visible_indices();
    for idx in visible.iter().take(args.limit) {
        let Some(post) = engine.posts().get(*idx) else {
            continue;
        };
        let _ = writeln!(
            &mut out,
            "{}  [{}] {}",
            post.timestamp_label,
            post.kind,
            post.headline(headline_chars)
        );
        if !post.tags.is_empty() {
            let tags: Vec<String> = post.tags.iter().map(|tag| format!("#{tag}")).collect();
            let _ = writeln!(&mut out, "    {}", tags.join(" "));
        }
    }
    if visible.len() > args.limit {
        let _ = writeln!(&mut out, "... {} more", visible.len() - args.limit);
    }
    Ok(out)
}

pub fn show_calendar(page: &Path, args: CalendarArgs) -> Result<()> {
    let page = Page::load(page)?;
    let mut widget = CalendarWidget::new(page.archive.clone());
    match args.month {
        Some(month) => widget.render(&month),
        None => widget.render_latest(),
    };
    print!("{}", format_calendar(widget.grid()));
    Ok(())
}

/// Plain-text month grid; days with posts carry a `*`.
fn format_calendar(grid: &CalendarGrid) -> String {
    let CalendarGrid::Month { title, cells, .. } = grid else {
        return "No archive data.\n".to_string();
    };
    let mut out = String::new();
    let _ = writeln!(&mut out, "{title}");
    let _ = writeln!(&mut out, "{WEEKDAYS}");
    for week in cells.chunks(7) {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                CalendarCell::Blank => "   ".to_string(),
                CalendarCell::Day { day, flags, .. } => {
                    let marker = if flags.contains(CellFlags::HAS_POST) { '*' } else { ' ' };
                    format!("{day:>2}{marker}")
                }
            })
            .collect();
        let _ = writeln!(&mut out, "{}", line.trim_end());
    }
    out
}

pub fn show_status(config: &AppConfig, page: &Path) -> Result<()> {
    let page = Page::load(page)?;
    let path = page.location.status_path(&config.status.file_name);
    print!("{}", format_status(status::read_status(&path)));
    Ok(())
}

fn format_status(result: Result<ModelStatus, StatusError>) -> String {
    let mut out = String::new();
    let status = match result {
        Ok(status) => status,
        Err(err) => {
            let _ = writeln!(&mut out, "Failed to load model status: {err}");
            let _ = writeln!(&mut out, "Indicator: {}", Indicator::Fail);
            return out;
        }
    };
    let _ = writeln!(&mut out, "{}", status::meta_line(&status));
    let _ = writeln!(
        &mut out,
        "Indicator: {}",
        Indicator::from_summary(&status.summary)
    );
    if status.results.is_empty() {
        let _ = writeln!(&mut out, "No data");
        return out;
    }
    for row in &status.results {
        let line = format!(
            "{:<4}  {}  {}  {}  {}",
            row.badge(),
            row.provider,
            row.model,
            row.status_text(),
            row.response_text()
        );
        let _ = writeln!(&mut out, "{}", line.trim_end());
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    type TestResult<T = ()> = Result<T>;

    const SITE_PAGE: &str = r##"<html><body>
<div class="theme-card" data-tags="news"><div class="theme-name">Headlines</div></div>
<div class="tweet" data-tags="news,dev" data-type="original">
  <div class="tweet-text"><p>Release notes</p></div>
  <div class="tweet-time"><a href="#">2024-02-20 10:00:00</a></div>
</div>
<div class="tweet" data-tags="news" data-type="repost">
  <div class="tweet-text"><p>Shared story</p></div>
  <div class="tweet-time"><a href="#">2024-02-03 09:00:00</a></div>
</div>
<div class="tweet" data-tags="life" data-type="repost">
  <div class="tweet-text"><p>Weekend walk</p></div>
  <div class="tweet-time"><a href="#">2024-01-28 18:30:00</a></div>
</div>
<script>window.__archiveDays = {"2024-01": ["2024-01-28"], "2024-02": ["2024-02-03", "2024-02-20"]};</script>
</body></html>"##;

    fn setup_site() -> TestResult<(TempDir, PathBuf)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let page = temp.path().join("index.html");
        fs::write(&page, SITE_PAGE)?;
        Ok((temp, page))
    }

    #[test]
    fn cli_filter_by_tag_prints_label_and_posts() -> TestResult {
        let (_temp, path) = setup_site()?;
        let page = Page::load(&path)?;
        let args = FilterArgs {
            tag: Some("News".into()),
            limit: 20,
            ..FilterArgs::default()
        };
        let output = run_filter(&page, &args, 40)?;
        insta::assert_snapshot!(output, @r###"
        #News (2)
        2024-02-20 10:00:00  [original] Release notes
            #dev #news
        2024-02-03 09:00:00  [repost] Shared story
            #news
        "###);
        Ok(())
    }

    #[test]
    fn cli_filter_by_theme_uses_card_tags() -> TestResult {
        let (_temp, path) = setup_site()?;
        let page = Page::load(&path)?;
        let args = FilterArgs {
            theme: Some("headlines".into()),
            limit: 1,
            ..FilterArgs::default()
        };
        let output = run_filter(&page, &args, 40)?;
        assert!(output.starts_with("Theme: Headlines (2)\n"));
        assert!(output.ends_with("... 1 more\n"));

        let missing = FilterArgs {
            theme: Some("Nope".into()),
            ..FilterArgs::default()
        };
        assert!(run_filter(&page, &missing, 40).is_err());
        Ok(())
    }

    #[test]
    fn cli_filter_type_all_lists_everything() -> TestResult {
        let (_temp, path) = setup_site()?;
        let page = Page::load(&path)?;
        let args = FilterArgs {
            kind: Some(TypeChoice::All),
            limit: 0,
            ..FilterArgs::default()
        };
        let output = run_filter(&page, &args, 40)?;
        assert_eq!(output, "All posts (3)\n... 3 more\n");
        Ok(())
    }

    #[test]
    fn cli_calendar_marks_days_with_posts() -> TestResult {
        let (_temp, path) = setup_site()?;
        let page = Page::load(&path)?;
        let mut widget = CalendarWidget::new(page.archive.clone());
        widget.render_latest();
        insta::assert_snapshot!(format_calendar(widget.grid()), @r###"
        2024-02
        Su Mo Tu We Th Fr Sa
                     1  2  3*
         4  5  6  7  8  9 10
        11 12 13 14 15 16 17
        18 19 20*21 22 23 24
        25 26 27 28 29
        "###);
        Ok(())
    }

    #[test]
    fn cli_calendar_without_index_reports_empty() {
        assert_eq!(format_calendar(&CalendarGrid::Empty), "No archive data.\n");
    }

    #[test]
    fn cli_status_formats_rows_and_failures() -> TestResult {
        let status: ModelStatus = serde_json::from_str(
            r#"{"generated_at": "2024-05-01 12:00:00",
                "summary": {"total": 1, "passed": 1, "failed": 0},
                "results": [{"provider": "alpha", "model": "m1", "success": true, "status": 200}]}"#,
        )?;
        insta::assert_snapshot!(format_status(Ok(status)), @r###"
        Last updated: 2024-05-01 12:00:00 | Total: 1 | Passed: 1 | Failed: 0
        Indicator: ok
        OK    alpha  m1  200
        "###);

        let failed = format_status(status::read_status(Path::new("/nonexistent/model-status.json")));
        assert!(failed.starts_with("Failed to load model status: "));
        assert!(failed.ends_with("Indicator: fail\n"));
        Ok(())
    }
}

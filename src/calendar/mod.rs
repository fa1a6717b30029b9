use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::filter::FilterRequest;
use crate::page::PageKind;

/// Sparse `YYYY-MM` -> `{YYYY-MM-DD}` mapping supplied by the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveIndex {
    months: BTreeMap<String, BTreeSet<String>>,
}

impl ArchiveIndex {
    pub fn new(months: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { months }
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Keys are zero-padded, so lexicographic order is chronological.
    pub fn latest_month_key(&self) -> &str {
        self.months
            .keys()
            .next_back()
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn month_keys(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.months.keys().map(String::as_str)
    }

    pub fn days(&self, month_key: &str) -> Option<&BTreeSet<String>> {
        self.months.get(month_key)
    }

    pub fn has_post(&self, month_key: &str, day: &str) -> bool {
        self.days(month_key)
            .map(|days| days.contains(day))
            .unwrap_or(false)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        const HAS_POST = 0b01;
        const SELECTED = 0b10;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    Blank,
    Day {
        day: u8,
        date: String,
        flags: CellFlags,
    },
}

impl CalendarCell {
    pub fn has_post(&self) -> bool {
        matches!(self, CalendarCell::Day { flags, .. } if flags.contains(CellFlags::HAS_POST))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarGrid {
    Empty,
    Month {
        key: String,
        title: String,
        leading_blanks: u8,
        cells: Vec<CalendarCell>,
    },
}

impl CalendarGrid {
    pub fn day_cells(&self) -> impl Iterator<Item = &CalendarCell> {
        let cells: &[CalendarCell] = match self {
            CalendarGrid::Empty => &[],
            CalendarGrid::Month { cells, .. } => cells,
        };
        cells
            .iter()
            .filter(|cell| matches!(cell, CalendarCell::Day { .. }))
    }
}

/// Builds the grid for a month key. Weekday offsets are Sunday-based.
pub fn render_month(index: &ArchiveIndex, month_key: &str, selected_day: &str) -> CalendarGrid {
    if index.is_empty() || month_key.is_empty() {
        return CalendarGrid::Empty;
    }
    let Some((year, month)) = parse_month_key(month_key) else {
        tracing::warn!(month_key, "ignoring malformed calendar month key");
        return CalendarGrid::Empty;
    };
    let Ok(first) = Date::from_calendar_date(year, month, 1) else {
        return CalendarGrid::Empty;
    };
    let leading_blanks = first.weekday().number_days_from_sunday();
    let days_in_month = month.length(year);

    let mut cells = Vec::with_capacity(leading_blanks as usize + days_in_month as usize);
    cells.extend((0..leading_blanks).map(|_| CalendarCell::Blank));
    for day in 1..=days_in_month {
        let date = format!("{month_key}-{day:02}");
        let mut flags = CellFlags::empty();
        if index.has_post(month_key, &date) {
            flags |= CellFlags::HAS_POST;
        }
        if date == selected_day {
            flags |= CellFlags::SELECTED;
        }
        cells.push(CalendarCell::Day { day, date, flags });
    }

    CalendarGrid::Month {
        key: month_key.to_string(),
        title: format!("{year}-{:02}", u8::from(month)),
        leading_blanks,
        cells,
    }
}

fn parse_month_key(key: &str) -> Option<(i32, Month)> {
    let (year, month) = key.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let month = Month::try_from(month).ok()?;
    Some((year, month))
}

/// Where a has-post day cell leads, relative to the current page.
pub fn day_page_path(kind: PageKind, day: &str) -> String {
    match kind {
        PageKind::Root => format!("date/{day}.html"),
        PageKind::DatePage => format!("{day}.html"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub day: String,
    pub href: String,
}

#[derive(Debug, Clone)]
pub struct CalendarWidget {
    index: ArchiveIndex,
    current_month_key: String,
    selected_day: String,
    cursor: Option<u8>,
    grid: CalendarGrid,
}

impl CalendarWidget {
    pub fn new(index: ArchiveIndex) -> Self {
        let current_month_key = index.latest_month_key().to_string();
        Self {
            index,
            current_month_key,
            selected_day: String::new(),
            cursor: None,
            grid: CalendarGrid::Empty,
        }
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn current_month_key(&self) -> &str {
        &self.current_month_key
    }

    pub fn selected_day(&self) -> &str {
        &self.selected_day
    }

    pub fn grid(&self) -> &CalendarGrid {
        &self.grid
    }

    pub fn cursor(&self) -> Option<u8> {
        self.cursor
    }

    pub fn latest_month_key(&self) -> &str {
        self.index.latest_month_key()
    }

    /// Re-renders for `month_key`. Filter state is never touched here.
    pub fn render(&mut self, month_key: &str) -> &CalendarGrid {
        self.grid = render_month(&self.index, month_key, &self.selected_day);
        if let CalendarGrid::Month { key, .. } = &self.grid {
            if *key != self.current_month_key {
                self.cursor = None;
            }
            self.current_month_key = key.clone();
            if self.cursor.is_none() {
                self.cursor = self.first_post_day();
            }
        } else {
            self.cursor = None;
        }
        &self.grid
    }

    pub fn render_latest(&mut self) -> &CalendarGrid {
        let latest = self.index.latest_month_key().to_string();
        self.render(&latest)
    }

    /// Steps to the neighbouring month present in the index.
    pub fn step_month(&mut self, delta: i32) -> bool {
        let keys: Vec<&str> = self.index.month_keys().collect();
        let Some(position) = keys.iter().position(|key| *key == self.current_month_key) else {
            return false;
        };
        let target = position as i64 + i64::from(delta);
        if target < 0 || target >= keys.len() as i64 {
            return false;
        }
        let key = keys[target as usize].to_string();
        self.render(&key);
        true
    }

    pub fn move_cursor(&mut self, delta: i32) {
        let CalendarGrid::Month { cells, .. } = &self.grid else {
            return;
        };
        let days = cells
            .iter()
            .filter(|cell| matches!(cell, CalendarCell::Day { .. }))
            .count() as i32;
        if days == 0 {
            return;
        }
        let current = i32::from(self.cursor.unwrap_or(1));
        let next = (current + delta).clamp(1, days);
        self.cursor = u8::try_from(next).ok();
    }

    pub fn cursor_date(&self) -> Option<&str> {
        let cursor = self.cursor?;
        self.grid.day_cells().find_map(|cell| match cell {
            CalendarCell::Day { day, date, .. } if *day == cursor => Some(date.as_str()),
            _ => None,
        })
    }

    /// Activates a day cell. Only has-post cells lead anywhere.
    pub fn select_day(&mut self, date: &str, page: PageKind) -> Option<Navigation> {
        let clickable = self
            .grid
            .day_cells()
            .any(|cell| matches!(cell, CalendarCell::Day { date: d, .. } if d == date) && cell.has_post());
        if !clickable {
            return None;
        }
        self.selected_day = date.to_string();
        let key = self.current_month_key.clone();
        self.render(&key);
        Some(Navigation {
            day: date.to_string(),
            href: day_page_path(page, date),
        })
    }

    pub fn select_cursor(&mut self, page: PageKind) -> Option<Navigation> {
        let date = self.cursor_date()?.to_string();
        self.select_day(&date, page)
    }

    /// The month-filter control; never navigates.
    pub fn month_filter_request(&self) -> Option<FilterRequest> {
        if self.current_month_key.is_empty() {
            return None;
        }
        Some(FilterRequest::Archive(self.current_month_key.clone()))
    }

    pub fn day_filter_request(&self) -> Option<FilterRequest> {
        self.cursor_date()
            .map(|date| FilterRequest::Day(date.to_string()))
    }

    fn first_post_day(&self) -> Option<u8> {
        self.grid
            .day_cells()
            .find_map(|cell| match cell {
                CalendarCell::Day { day, flags, .. } if flags.contains(CellFlags::HAS_POST) => {
                    Some(*day)
                }
                _ => None,
            })
            .or(Some(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &[&str])]) -> ArchiveIndex {
        ArchiveIndex::new(
            entries
                .iter()
                .map(|(month, days)| {
                    (
                        month.to_string(),
                        days.iter().map(|d| d.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn leap_february_has_29_cells_after_thursday_offset() {
        let idx = index(&[("2024-02", &["2024-02-14", "2024-02-29"])]);
        let grid = render_month(&idx, "2024-02", "");
        let CalendarGrid::Month {
            leading_blanks,
            cells,
            title,
            ..
        } = &grid
        else {
            panic!("expected month grid, got {grid:?}");
        };
        assert_eq!(title, "2024-02");
        assert_eq!(*leading_blanks, 4);
        assert_eq!(grid.day_cells().count(), 29);
        assert_eq!(cells.len(), 33);
        let with_posts: Vec<_> = grid
            .day_cells()
            .filter(|cell| cell.has_post())
            .map(|cell| match cell {
                CalendarCell::Day { date, .. } => date.clone(),
                CalendarCell::Blank => unreachable!(),
            })
            .collect();
        assert_eq!(with_posts, vec!["2024-02-14", "2024-02-29"]);
    }

    #[test]
    fn non_leap_february_and_sunday_start() {
        let idx = index(&[("2023-02", &[]), ("2023-10", &[])]);
        assert_eq!(render_month(&idx, "2023-02", "").day_cells().count(), 28);
        match render_month(&idx, "2023-10", "") {
            CalendarGrid::Month { leading_blanks, .. } => assert_eq!(leading_blanks, 0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_index_or_key_renders_empty_state() {
        assert_eq!(render_month(&ArchiveIndex::default(), "2024-01", ""), CalendarGrid::Empty);
        let idx = index(&[("2024-01", &["2024-01-02"])]);
        assert_eq!(render_month(&idx, "", ""), CalendarGrid::Empty);
        assert_eq!(render_month(&idx, "2024-13", ""), CalendarGrid::Empty);
    }

    #[test]
    fn latest_key_is_lexicographic_max() {
        let idx = index(&[("2023-12", &[]), ("2024-02", &[]), ("2024-01", &[])]);
        assert_eq!(idx.latest_month_key(), "2024-02");
        assert_eq!(ArchiveIndex::default().latest_month_key(), "");
    }

    #[test]
    fn selecting_has_post_day_navigates_relative_to_page() {
        let idx = index(&[("2024-05", &["2024-05-03"])]);
        let mut widget = CalendarWidget::new(idx);
        widget.render_latest();
        let nav = widget
            .select_day("2024-05-03", PageKind::Root)
            .expect("navigation");
        assert_eq!(nav.href, "date/2024-05-03.html");
        assert_eq!(widget.selected_day(), "2024-05-03");

        let nav = widget
            .select_day("2024-05-03", PageKind::DatePage)
            .expect("navigation");
        assert_eq!(nav.href, "2024-05-03.html");
        let selected = widget
            .grid()
            .day_cells()
            .filter(|cell| matches!(cell, CalendarCell::Day { flags, .. } if flags.contains(CellFlags::SELECTED)))
            .count();
        assert_eq!(selected, 1);
    }

    #[test]
    fn days_without_posts_are_inert() {
        let idx = index(&[("2024-05", &["2024-05-03"])]);
        let mut widget = CalendarWidget::new(idx);
        widget.render_latest();
        assert_eq!(widget.select_day("2024-05-04", PageKind::Root), None);
        assert_eq!(widget.selected_day(), "");
    }

    #[test]
    fn month_filter_and_switching() {
        let idx = index(&[("2024-04", &["2024-04-01"]), ("2024-05", &["2024-05-03"])]);
        let mut widget = CalendarWidget::new(idx);
        assert_eq!(widget.current_month_key(), "2024-05");
        widget.render_latest();
        assert_eq!(widget.cursor(), Some(3));
        assert!(widget.step_month(-1));
        assert_eq!(widget.current_month_key(), "2024-04");
        assert!(!widget.step_month(-1));
        assert_eq!(
            widget.month_filter_request(),
            Some(FilterRequest::Archive("2024-04".into()))
        );
        assert_eq!(
            widget.day_filter_request(),
            Some(FilterRequest::Day("2024-04-01".into()))
        );
    }

    #[test]
    fn cursor_is_clamped_to_month() {
        let idx = index(&[("2024-02", &[])]);
        let mut widget = CalendarWidget::new(idx);
        widget.render_latest();
        widget.move_cursor(100);
        assert_eq!(widget.cursor_date(), Some("2024-02-29"));
        widget.move_cursor(-100);
        assert_eq!(widget.cursor_date(), Some("2024-02-01"));
    }

    #[test]
    fn archive_index_parses_generator_json() {
        let idx: ArchiveIndex =
            serde_json::from_str(r#"{"2024-05": ["2024-05-01", "2024-05-03"]}"#).expect("json");
        assert!(idx.has_post("2024-05", "2024-05-03"));
        assert!(!idx.has_post("2024-06", "2024-06-01"));
    }
}

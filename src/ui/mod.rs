use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap,
};
use ratatui::Frame;
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::app::state::AppState;
use crate::calendar::{CalendarCell, CalendarGrid, CellFlags};
use crate::filter::{capitalize, TypeChoice};
use crate::highlight::{build_highlight_regex, build_tag_set_regex};
use crate::modal::ModalId;
use crate::posts::Post;
use crate::refresh::PullVisual;
use crate::status::Indicator;

const SPINNER: [&str; 8] = ["↑", "↗", "→", "↘", "↓", "↙", "←", "↖"];
const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const CELL_WIDTH: u16 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Post(usize),
    Image { post: usize, src: String },
    Tag(String),
    Theme(usize),
    Month(String),
    CalendarDay(String),
    MonthFilter,
    DayFilter,
    SearchBox,
    OpenModal(ModalId),
    TypeTrigger,
    TypeOption(TypeChoice),
    ClearFilter,
    LightboxPrev,
    LightboxNext,
    LightboxClose,
    ModalClose,
    ModalPanel,
    Backdrop,
}

/// Clickable regions from the last frame; later entries sit on top.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
    regions: Vec<(Rect, HitTarget)>,
}

impl HitMap {
    pub fn push(&mut self, area: Rect, target: HitTarget) {
        if area.width > 0 && area.height > 0 {
            self.regions.push((area, target));
        }
    }

    pub fn hit(&self, column: u16, row: u16) -> Option<&HitTarget> {
        self.regions
            .iter()
            .rev()
            .find(|(area, _)| contains(*area, column, row))
            .map(|(_, target)| target)
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

/// A one-line strip of spans that remembers where each clickable piece landed.
struct Strip {
    spans: Vec<Span<'static>>,
    hits: Vec<(u16, u16, HitTarget)>,
    cursor: u16,
}

impl Strip {
    fn new() -> Self {
        Self {
            spans: Vec::new(),
            hits: Vec::new(),
            cursor: 0,
        }
    }

    fn push(&mut self, text: impl Into<String>, style: Style, target: Option<HitTarget>) {
        let text = text.into();
        let width = UnicodeWidthStr::width(text.as_str()) as u16;
        if let Some(target) = target {
            self.hits.push((self.cursor, width, target));
        }
        self.cursor = self.cursor.saturating_add(width);
        self.spans.push(Span::styled(text, style));
    }

    fn gap(&mut self) {
        self.push(" ", Style::default(), None);
    }

    fn render(self, frame: &mut Frame, area: Rect, hits: &mut HitMap) {
        for (offset, width, target) in self.hits {
            if offset >= area.width {
                continue;
            }
            let width = width.min(area.width - offset);
            hits.push(Rect::new(area.x + offset, area.y, width, 1), target);
        }
        frame.render_widget(Paragraph::new(Line::from(self.spans)), area);
    }
}

pub fn draw_app(frame: &mut Frame, state: &AppState, list_state: &mut ListState) -> HitMap {
    let mut hits = HitMap::default();
    let filter_rows = u16::from(state.filter().status_visible());
    let pull_rows = state
        .pull()
        .map(|pull| pull_indicator_rows(pull.visual(), pull.config().pixels_per_row))
        .unwrap_or(0);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(filter_rows),
            Constraint::Length(pull_rows),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_toolbar(frame, state, vertical[0], &mut hits);
    if filter_rows > 0 {
        draw_filter_status(frame, state, vertical[1], &mut hits);
    }
    if let Some(pull) = state.pull() {
        if pull_rows > 0 {
            draw_pull_indicator(frame, pull.visual(), vertical[2]);
        }
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[3]);
    draw_post_list(frame, state, list_state, columns[0], &mut hits);
    draw_post_detail(frame, state, columns[1], &mut hits);
    draw_footer(frame, state, vertical[4]);

    if state.type_menu().open {
        draw_type_menu(frame, state, vertical[0], &mut hits);
    }
    if state.modals().any_open() {
        hits.push(frame.size(), HitTarget::Backdrop);
        for id in state.modals().open_modals() {
            draw_modal(frame, state, *id, &mut hits);
        }
    }
    if state.lightbox().is_open() {
        hits.push(frame.size(), HitTarget::Backdrop);
        draw_lightbox(frame, state, &mut hits);
    }
    hits
}

fn pull_indicator_rows(visual: &PullVisual, pixels_per_row: f32) -> u16 {
    if visual.offset <= 0.0 && !visual.refreshing {
        return 0;
    }
    let rows = (visual.offset / pixels_per_row).ceil().max(1.0);
    rows.min(f32::from(u16::MAX)) as u16
}

fn draw_toolbar(frame: &mut Frame, state: &AppState, area: Rect, hits: &mut HitMap) {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut strip = Strip::new();

    let search = state.filter().search_input();
    let search_text = if state.is_search_active() {
        format!(" /{search}▏")
    } else if search.is_empty() {
        " / search ".to_string()
    } else {
        format!(" /{search} ")
    };
    let search_style = if state.is_search_active() {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    strip.push(search_text, search_style, Some(HitTarget::SearchBox));
    strip.gap();

    for (key, label, id) in [
        ("t", "Tags", ModalId::Tags),
        ("T", "Themes", ModalId::Themes),
        ("c", "Calendar", ModalId::Archive),
    ] {
        strip.push(
            format!("[{key}]{label}"),
            if state.modals().is_open(id) {
                key_style.add_modifier(Modifier::REVERSED)
            } else {
                key_style
            },
            Some(HitTarget::OpenModal(id)),
        );
        strip.gap();
    }

    let choice = state.filter().type_choice();
    strip.push(
        format!("[y]{} {}", choice.icon(), capitalize(&choice.to_string())),
        key_style,
        Some(HitTarget::TypeTrigger),
    );
    strip.gap();

    let (dot, dot_style) = indicator_glyph(state.status.indicator);
    strip.push(
        format!("[s]{dot} Models"),
        dot_style,
        Some(HitTarget::OpenModal(ModalId::ModelStatus)),
    );
    strip.render(frame, area, hits);
}

fn indicator_glyph(indicator: Option<Indicator>) -> (&'static str, Style) {
    match indicator {
        Some(Indicator::Ok) => ("●", Style::default().fg(Color::Green)),
        Some(Indicator::Warn) => ("●", Style::default().fg(Color::Yellow)),
        Some(Indicator::Fail) => ("●", Style::default().fg(Color::Red)),
        None => ("○", Style::default().fg(Color::DarkGray)),
    }
}

fn draw_filter_status(frame: &mut Frame, state: &AppState, area: Rect, hits: &mut HitMap) {
    let mut strip = Strip::new();
    strip.push(
        format!(" {} ", state.filter().status_label()),
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        None,
    );
    strip.gap();
    strip.push(
        "[x] clear",
        Style::default().fg(Color::Yellow),
        Some(HitTarget::ClearFilter),
    );
    strip.render(frame, area, hits);
}

fn draw_pull_indicator(frame: &mut Frame, visual: &PullVisual, area: Rect) {
    let glyph = if visual.refreshing {
        "⟳"
    } else {
        let step = ((visual.rotation / 45.0).round() as i64).rem_euclid(SPINNER.len() as i64);
        SPINNER[step as usize]
    };
    let style = if visual.refreshing || visual.ready {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if visual.opacity >= 0.5 {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let line = Line::from(Span::styled(format!("{glyph} {}", visual.label), style));
    let paragraph = Paragraph::new(line).alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn draw_post_list(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    area: Rect,
    hits: &mut HitMap,
) {
    let visible = state.visible_posts();
    let highlight = build_highlight_regex(state.filter().active());
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let width = usize::from(area.width.saturating_sub(4)).min(state.headline_chars);

    // Each entry is a fixed-height block so mouse rows map back to posts.
    let text_rows = state.preview_lines.max(1);
    let rows_per_post = text_rows as u16 + 1;
    let mut items = Vec::with_capacity(visible.len());
    for idx in &visible {
        let Some(post) = state.post(*idx) else {
            continue;
        };
        let mut lines = vec![Line::from(highlight_line(
            &post.headline(width.max(8)),
            highlight.as_ref(),
            highlight_style,
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for extra in post.text.lines().skip(1).take(text_rows - 1) {
            let clipped: String = extra.trim().chars().take(width.max(8)).collect();
            lines.push(Line::from(highlight_line(
                &clipped,
                highlight.as_ref(),
                highlight_style,
                Style::default().fg(Color::Gray),
            )));
        }
        while lines.len() < text_rows {
            lines.push(Line::default());
        }
        let mut meta = vec![Span::styled(
            post.timestamp_label.clone(),
            Style::default().fg(Color::DarkGray),
        )];
        meta.push(Span::raw(" "));
        meta.push(Span::raw(TypeChoice::from(post.kind).icon()));
        if !post.images.is_empty() {
            meta.push(Span::styled(
                format!(" 🖼 {}", post.images.len()),
                Style::default().fg(Color::Magenta),
            ));
        }
        lines.push(Line::from(meta));
        items.push(ListItem::new(lines));
    }
    if items.is_empty() {
        items.push(ListItem::new("No posts match the current filter."));
    }

    if visible.is_empty() {
        list_state.select(None);
    } else {
        list_state.select(Some(state.selected.min(visible.len() - 1)));
    }
    *list_state.offset_mut() = state.offset;

    let title = format!("Posts {}/{}", visible.len(), state.filter().posts().len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);

    let inner_top = area.y + 1;
    let inner_bottom = area.y + area.height.saturating_sub(1);
    for (position, _) in visible.iter().enumerate().skip(list_state.offset()) {
        let rel = (position - list_state.offset()) as u16;
        let y = inner_top.saturating_add(rel.saturating_mul(rows_per_post));
        if y >= inner_bottom {
            break;
        }
        let height = rows_per_post.min(inner_bottom - y);
        hits.push(
            Rect::new(area.x + 1, y, area.width.saturating_sub(2), height),
            HitTarget::Post(position),
        );
    }
}

fn draw_post_detail(frame: &mut Frame, state: &AppState, area: Rect, hits: &mut HitMap) {
    let block = Block::default().title("Post").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let (Some(post_idx), Some(post)) = (state.selected_post_index(), state.selected_post()) else {
        frame.render_widget(Paragraph::new("Nothing selected."), inner);
        return;
    };

    let header_rows = 1 + u16::from(!post.tags.is_empty()) + u16::from(!post.images.is_empty());
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(header_rows), Constraint::Min(1)])
        .split(inner);

    let mut row = sections[0].y;
    let meta = Line::from(vec![
        Span::styled(
            post.timestamp_label.clone(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::raw(format!("{} {}", TypeChoice::from(post.kind).icon(), post.kind)),
    ]);
    frame.render_widget(Paragraph::new(meta), Rect::new(inner.x, row, inner.width, 1));
    row += 1;

    if !post.tags.is_empty() {
        let theme_regex = build_tag_set_regex(state.filter().active());
        let mut strip = Strip::new();
        for tag in &post.tags {
            let chip = format!("#{tag}");
            let active = state.filter().is_tag_active(tag)
                || theme_regex
                    .as_ref()
                    .map(|re| re.is_match(&chip))
                    .unwrap_or(false);
            let style = if active {
                Style::default().fg(Color::Black).bg(Color::Green)
            } else {
                Style::default().fg(Color::Green)
            };
            strip.push(chip, style, Some(HitTarget::Tag(tag.clone())));
            strip.gap();
        }
        strip.render(frame, Rect::new(inner.x, row, inner.width, 1), hits);
        row += 1;
    }

    if !post.images.is_empty() {
        let mut strip = Strip::new();
        for src in &post.images {
            strip.push(
                format!("[🖼 {}]", short_name(src)),
                Style::default().fg(Color::Magenta),
                Some(HitTarget::Image {
                    post: post_idx,
                    src: src.clone(),
                }),
            );
            strip.gap();
        }
        strip.render(frame, Rect::new(inner.x, row, inner.width, 1), hits);
    }

    let highlight = build_highlight_regex(state.filter().active());
    let body = body_text(post, highlight.as_ref());
    frame.render_widget(
        Paragraph::new(body).wrap(Wrap { trim: false }),
        sections[1],
    );
}

fn body_text(post: &Post, highlight: Option<&Regex>) -> Text<'static> {
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let lines: Vec<Line<'static>> = post
        .text
        .lines()
        .map(|line| Line::from(highlight_line(line, highlight, highlight_style, Style::default())))
        .collect();
    Text::from(lines)
}

fn short_name(src: &str) -> &str {
    src.rsplit('/').next().unwrap_or(src)
}

fn draw_footer(frame: &mut Frame, state: &AppState, area: Rect) {
    let text = match state.status_message() {
        Some(message) => Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(Span::styled(
            "j/k move  Enter/i images  / search  x clear  r reload  q quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(text), area);
}

fn draw_type_menu(frame: &mut Frame, state: &AppState, toolbar: Rect, hits: &mut HitMap) {
    let width = 18.min(toolbar.width);
    let height = (TypeChoice::ALL.len() as u16 + 2).min(frame.size().height.saturating_sub(1));
    let x = toolbar.x + toolbar.width.saturating_sub(width + 12);
    let area = Rect::new(x, toolbar.y + 1, width, height);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("Type");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let active = state.filter().type_choice();
    for (offset, choice) in TypeChoice::ALL.iter().enumerate() {
        let y = inner.y + offset as u16;
        if y >= inner.y + inner.height {
            break;
        }
        let mut style = Style::default();
        if *choice == active {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
        if offset == state.type_menu().cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let row = Rect::new(inner.x, y, inner.width, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("{} {}", choice.icon(), capitalize(&choice.to_string())),
                style,
            )),
            row,
        );
        hits.push(row, HitTarget::TypeOption(*choice));
    }
}

fn modal_frame(frame: &mut Frame, title: &str, area: Rect, hits: &mut HitMap) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(format!("{title} (Esc to close)"))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    hits.push(area, HitTarget::ModalPanel);
    let close = Rect::new(
        area.x + area.width.saturating_sub(4),
        area.y,
        3.min(area.width),
        1,
    );
    frame.render_widget(Paragraph::new("[×]"), close);
    hits.push(close, HitTarget::ModalClose);
    inner
}

fn draw_modal(frame: &mut Frame, state: &AppState, id: ModalId, hits: &mut HitMap) {
    match id {
        ModalId::Tags => draw_tags_modal(frame, state, hits),
        ModalId::Themes => draw_themes_modal(frame, state, hits),
        ModalId::Archive => draw_archive_modal(frame, state, hits),
        ModalId::ModelStatus => draw_status_modal(frame, state, hits),
    }
}

fn draw_tags_modal(frame: &mut Frame, state: &AppState, hits: &mut HitMap) {
    let area = centered_rect(50, 60, frame.size());
    let inner = modal_frame(frame, "Tags", area, hits);
    if state.tags.is_empty() {
        frame.render_widget(Paragraph::new("No tags on this page."), inner);
        return;
    }
    let first = scroll_window(state.tag_cursor(), inner.height);
    for (row, (idx, tag)) in state
        .tags
        .iter()
        .enumerate()
        .skip(first)
        .take(usize::from(inner.height))
        .enumerate()
    {
        let mut style = Style::default().fg(Color::Green);
        if state.filter().is_tag_active(tag) {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        if idx == state.tag_cursor() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let line = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        frame.render_widget(Paragraph::new(Span::styled(format!("#{tag}"), style)), line);
        hits.push(line, HitTarget::Tag(tag.clone()));
    }
}

fn draw_themes_modal(frame: &mut Frame, state: &AppState, hits: &mut HitMap) {
    let area = centered_rect(60, 60, frame.size());
    let inner = modal_frame(frame, "Themes", area, hits);
    if state.themes.is_empty() {
        frame.render_widget(Paragraph::new("No themes on this page."), inner);
        return;
    }
    let first = scroll_window(state.theme_cursor(), inner.height);
    for (row, (idx, card)) in state
        .themes
        .iter()
        .enumerate()
        .skip(first)
        .take(usize::from(inner.height))
        .enumerate()
    {
        let mut name_style = Style::default().add_modifier(Modifier::BOLD);
        if state.filter().is_theme_active(&card.name) {
            name_style = name_style.fg(Color::Cyan);
        }
        if idx == state.theme_cursor() {
            name_style = name_style.add_modifier(Modifier::REVERSED);
        }
        let line = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(card.name.clone(), name_style),
                Span::raw("  "),
                Span::styled(card.tags.clone(), Style::default().fg(Color::DarkGray)),
            ])),
            line,
        );
        hits.push(line, HitTarget::Theme(idx));
    }
}

fn draw_archive_modal(frame: &mut Frame, state: &AppState, hits: &mut HitMap) {
    let area = centered_rect(70, 70, frame.size());
    let inner = modal_frame(frame, "Archive", area, hits);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(12), Constraint::Min(CELL_WIDTH * 7)])
        .split(inner);

    let current = state.calendar.current_month_key();
    for (row, key) in state
        .calendar
        .index()
        .month_keys()
        .rev()
        .take(usize::from(columns[0].height))
        .enumerate()
    {
        let style = if key == current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let line = Rect::new(columns[0].x, columns[0].y + row as u16, columns[0].width, 1);
        frame.render_widget(Paragraph::new(Span::styled(key.to_string(), style)), line);
        hits.push(line, HitTarget::Month(key.to_string()));
    }

    let grid_area = columns[1];
    let CalendarGrid::Month { title, cells, .. } = state.calendar.grid() else {
        frame.render_widget(Paragraph::new("No data"), grid_area);
        return;
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("◀ [ {title} ] ▶"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Rect::new(grid_area.x, grid_area.y, grid_area.width, 1),
    );
    let header: String = WEEKDAYS
        .iter()
        .map(|day| format!("{day:<width$}", width = usize::from(CELL_WIDTH)))
        .collect();
    frame.render_widget(
        Paragraph::new(Span::styled(header, Style::default().fg(Color::DarkGray))),
        Rect::new(grid_area.x, grid_area.y + 1, grid_area.width, 1),
    );

    let cursor = state.calendar.cursor();
    for (slot, cell) in cells.iter().enumerate() {
        let week = (slot / 7) as u16;
        let weekday = (slot % 7) as u16;
        let y = grid_area.y + 2 + week;
        let x = grid_area.x + weekday * CELL_WIDTH;
        if y >= grid_area.y + grid_area.height || x + CELL_WIDTH > grid_area.x + grid_area.width {
            continue;
        }
        let CalendarCell::Day { day, date, flags } = cell else {
            continue;
        };
        let mut style = if flags.contains(CellFlags::HAS_POST) {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if flags.contains(CellFlags::SELECTED) {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if cursor == Some(*day) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let rect = Rect::new(x, y, CELL_WIDTH - 1, 1);
        frame.render_widget(Paragraph::new(Span::styled(format!("{day:>2}"), style)), rect);
        if flags.contains(CellFlags::HAS_POST) {
            hits.push(rect, HitTarget::CalendarDay(date.clone()));
        }
    }

    let buttons_y = grid_area.y + 3 + (cells.len().div_ceil(7)) as u16;
    if buttons_y < grid_area.y + grid_area.height {
        let mut strip = Strip::new();
        strip.push(
            format!("[m] Filter {current}"),
            Style::default().fg(Color::Cyan),
            Some(HitTarget::MonthFilter),
        );
        strip.gap();
        if let Some(date) = state.calendar.cursor_date() {
            strip.push(
                format!("[f] Filter {date}"),
                Style::default().fg(Color::Cyan),
                Some(HitTarget::DayFilter),
            );
        }
        strip.render(
            frame,
            Rect::new(grid_area.x, buttons_y, grid_area.width, 1),
            hits,
        );
    }
}

fn draw_status_modal(frame: &mut Frame, state: &AppState, hits: &mut HitMap) {
    let area = centered_rect(80, 70, frame.size());
    let inner = modal_frame(frame, "Model status", area, hits);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);
    let (dot, dot_style) = indicator_glyph(state.status.indicator);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{dot} "), dot_style),
            Span::raw(state.status.meta.clone()),
        ]))
        .wrap(Wrap { trim: true }),
        sections[0],
    );

    if state.status.loading || state.status.meta.starts_with("Failed") {
        return;
    }
    if state.status.rows.is_empty() {
        frame.render_widget(Paragraph::new("No data"), sections[1]);
        return;
    }
    let rows = state.status.rows.iter().map(|row| {
        let badge_style = if row.success {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default().fg(Color::Black).bg(Color::Red)
        };
        Row::new(vec![
            Cell::from(row.provider.clone()),
            Cell::from(row.model.clone()),
            Cell::from(Span::styled(row.badge(), badge_style)),
            Cell::from(row.status_text()),
            Cell::from(row.response_text().to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(16),
            Constraint::Percentage(24),
            Constraint::Length(6),
            Constraint::Percentage(14),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["Provider", "Model", "Status", "Detail", "Response"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(table, sections[1]);
}

fn draw_lightbox(frame: &mut Frame, state: &AppState, hits: &mut HitMap) {
    let lightbox = state.lightbox();
    let Some(src) = lightbox.current() else {
        return;
    };
    let area = centered_rect(70, 40, frame.size());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(format!("Image {}", lightbox.position_label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    hits.push(area, HitTarget::ModalPanel);

    let mut lines = vec![
        Line::from(Span::styled(
            src.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            state.resolve(src).display().to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    if let Some(post) = state.lightbox_post() {
        lines.push(Line::from(Span::styled(
            post.timestamp_label.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }),
        Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1)),
    );

    let controls_y = inner.y + inner.height.saturating_sub(1);
    let mut strip = Strip::new();
    if lightbox.shows_nav() {
        strip.push("◀ prev", Style::default().fg(Color::Cyan), Some(HitTarget::LightboxPrev));
        strip.push("   ", Style::default(), None);
        strip.push("next ▶", Style::default().fg(Color::Cyan), Some(HitTarget::LightboxNext));
        strip.push("   ", Style::default(), None);
    }
    strip.push("[Esc] close", Style::default().fg(Color::Gray), Some(HitTarget::LightboxClose));
    strip.render(frame, Rect::new(inner.x, controls_y, inner.width, 1), hits);
}

fn scroll_window(cursor: usize, height: u16) -> usize {
    let height = usize::from(height.max(1));
    cursor.saturating_sub(height - 1)
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    let Some(re) = regex else {
        return vec![Span::styled(text.to_string(), base_style)];
    };
    let mut spans = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            spans.push(Span::styled(text[last..mat.start()].to_string(), base_style));
        }
        spans.push(Span::styled(mat.as_str().to_string(), highlight_style));
        last = mat.end();
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base_style));
    }
    if spans.is_empty() {
        spans.push(Span::styled(text.to_string(), base_style));
    }
    spans
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

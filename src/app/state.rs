use std::path::PathBuf;
use std::time::Instant;

use indexmap::IndexSet;

use crate::calendar::CalendarWidget;
use crate::config::AppConfig;
use crate::filter::{ApplyOutcome, FilterEngine, FilterRequest, TypeChoice};
use crate::gallery::{self, Lightbox};
use crate::modal::{ModalHost, ModalId};
use crate::page::{Page, PageLocation, ThemeCard};
use crate::posts::Post;
use crate::refresh::{PullToRefresh, RefreshEffect};
use crate::status::StatusPanel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeMenu {
    pub open: bool,
    pub cursor: usize,
}

/// Everything the browser keeps per page load: the parsed page, the single
/// active filter, and the overlays stacked on top of the post list.
#[derive(Debug)]
pub struct AppState {
    pub location: PageLocation,
    pub tags: IndexSet<String>,
    pub themes: Vec<ThemeCard>,
    pub calendar: CalendarWidget,
    pub status: StatusPanel,
    pub selected: usize,
    pub offset: usize,
    pub headline_chars: usize,
    pub preview_lines: usize,
    filter: FilterEngine,
    galleries: Vec<Vec<String>>,
    lightbox: Lightbox,
    lightbox_post: Option<usize>,
    modals: ModalHost,
    pull: Option<PullToRefresh>,
    pixels_per_row: f32,
    search_active: bool,
    type_menu: TypeMenu,
    tag_cursor: usize,
    theme_cursor: usize,
    status_message: Option<String>,
}

impl AppState {
    pub fn new(page: Page, config: &AppConfig, touch: bool) -> Self {
        let Page {
            location,
            posts,
            tags,
            themes,
            archive,
        } = page;
        let galleries = gallery::galleries(&posts);
        let pull = touch.then(|| PullToRefresh::new(config.gestures.clone()));
        Self {
            location,
            tags,
            themes,
            calendar: CalendarWidget::new(archive),
            status: StatusPanel::default(),
            selected: 0,
            offset: 0,
            headline_chars: config.ui.headline_chars,
            preview_lines: usize::from(config.ui.preview_lines),
            filter: FilterEngine::new(posts),
            galleries,
            lightbox: Lightbox::new(),
            lightbox_post: None,
            modals: ModalHost::new(),
            pull,
            pixels_per_row: config.gestures.pixels_per_row,
            search_active: false,
            type_menu: TypeMenu::default(),
            tag_cursor: 0,
            theme_cursor: 0,
            status_message: None,
        }
    }

    pub fn filter(&self) -> &FilterEngine {
        &self.filter
    }

    pub fn modals(&self) -> &ModalHost {
        &self.modals
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    pub fn pull(&self) -> Option<&PullToRefresh> {
        self.pull.as_ref()
    }

    pub fn type_menu(&self) -> TypeMenu {
        self.type_menu
    }

    pub fn tag_cursor(&self) -> usize {
        self.tag_cursor
    }

    pub fn theme_cursor(&self) -> usize {
        self.theme_cursor
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn visible_posts(&self) -> Vec<usize> {
        self.filter.posts().visible_indices()
    }

    pub fn post(&self, idx: usize) -> Option<&Post> {
        self.filter.posts().get(idx)
    }

    pub fn selected_post_index(&self) -> Option<usize> {
        self.visible_posts().get(self.selected).copied()
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.selected_post_index().and_then(|idx| self.post(idx))
    }

    /// Background scrolling is frozen while a modal or the lightbox is up.
    pub fn scroll_locked(&self) -> bool {
        self.modals.scroll_locked() || self.lightbox.is_open()
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.scroll_locked() {
            return;
        }
        let len = self.filter.posts().visible_count();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
        if self.selected < self.offset {
            self.offset = self.selected;
        }
    }

    pub fn select_visible(&mut self, position: usize) {
        if position < self.filter.posts().visible_count() {
            self.selected = position;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    fn normalize_selection(&mut self) {
        let len = self.filter.posts().visible_count();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
        if self.offset > self.selected {
            self.offset = self.selected;
        }
    }

    pub fn apply_filter(&mut self, request: FilterRequest) -> ApplyOutcome {
        let outcome = self.filter.apply(request);
        self.after_filter(&outcome);
        outcome
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.search_active = false;
        self.type_menu.cursor = 0;
        self.normalize_selection();
    }

    fn after_filter(&mut self, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied { scroll_to_top, .. } => {
                if *scroll_to_top {
                    self.scroll_to_top();
                }
            }
            ApplyOutcome::Cleared => self.normalize_selection(),
        }
        self.type_menu.cursor = TypeChoice::ALL
            .iter()
            .position(|choice| *choice == self.filter.type_choice())
            .unwrap_or(0);
    }

    pub fn begin_search(&mut self) {
        self.search_active = true;
        self.type_menu.open = false;
    }

    pub fn finish_search(&mut self) {
        self.search_active = false;
    }

    pub fn push_search_char(&mut self, ch: char) {
        let mut input = self.filter.search_input().to_string();
        input.push(ch);
        self.update_search(&input);
    }

    pub fn pop_search_char(&mut self) {
        let mut input = self.filter.search_input().to_string();
        if input.pop().is_some() {
            self.update_search(&input);
        }
    }

    fn update_search(&mut self, input: &str) {
        let outcome = self.filter.apply_search_input(input);
        self.after_filter(&outcome);
    }

    /// Returns true when the modal needs a fresh status read.
    pub fn open_modal(&mut self, id: ModalId) -> bool {
        self.type_menu.open = false;
        self.search_active = false;
        self.modals.open(id);
        match id {
            ModalId::Archive => {
                self.calendar.render_latest();
                false
            }
            ModalId::ModelStatus => {
                self.status.begin_load();
                true
            }
            ModalId::Tags => {
                self.tag_cursor = self.tag_cursor.min(self.tags.len().saturating_sub(1));
                false
            }
            ModalId::Themes => {
                self.theme_cursor = self.theme_cursor.min(self.themes.len().saturating_sub(1));
                false
            }
        }
    }

    pub fn close_modals(&mut self) -> bool {
        self.modals.dismiss()
    }

    pub fn move_tag_cursor(&mut self, delta: isize) {
        self.tag_cursor = step(self.tag_cursor, delta, self.tags.len());
    }

    pub fn move_theme_cursor(&mut self, delta: isize) {
        self.theme_cursor = step(self.theme_cursor, delta, self.themes.len());
    }

    pub fn current_tag(&self) -> Option<&str> {
        self.tags.get_index(self.tag_cursor).map(String::as_str)
    }

    pub fn toggle_type_menu(&mut self) {
        self.type_menu.open = !self.type_menu.open;
    }

    pub fn close_type_menu(&mut self) {
        self.type_menu.open = false;
    }

    pub fn move_type_cursor(&mut self, delta: isize) {
        self.type_menu.cursor = step(self.type_menu.cursor, delta, TypeChoice::ALL.len());
    }

    pub fn type_cursor_choice(&self) -> TypeChoice {
        TypeChoice::ALL
            .get(self.type_menu.cursor)
            .copied()
            .unwrap_or(TypeChoice::All)
    }

    /// Opens the lightbox on the first image of the selected post.
    pub fn open_lightbox(&mut self) -> bool {
        let Some(post_idx) = self.selected_post_index() else {
            return false;
        };
        let Some(first) = self.galleries.get(post_idx).and_then(|g| g.first()).cloned() else {
            self.set_status_message(Some("No images in this post"));
            return false;
        };
        self.open_lightbox_at(post_idx, &first)
    }

    pub fn open_lightbox_at(&mut self, post_idx: usize, src: &str) -> bool {
        let Some(gallery) = self.galleries.get(post_idx) else {
            return false;
        };
        if !self.lightbox.open(src, gallery) {
            return false;
        }
        self.lightbox_post = Some(post_idx);
        self.type_menu.open = false;
        true
    }

    pub fn navigate_lightbox(&mut self, direction: i32) {
        self.lightbox.navigate(direction);
    }

    pub fn close_lightbox(&mut self) {
        self.lightbox.close();
        self.lightbox_post = None;
    }

    pub fn lightbox_post(&self) -> Option<&Post> {
        self.lightbox_post.and_then(|idx| self.post(idx))
    }

    fn scroll_px(&self) -> f32 {
        self.offset as f32 * self.pixels_per_row
    }

    fn gestures_allowed(&self) -> bool {
        !self.scroll_locked() && !self.type_menu.open
    }

    pub fn touch_start(&mut self, row: u16) {
        if !self.gestures_allowed() {
            return;
        }
        let scroll = self.scroll_px();
        let y = f32::from(row) * self.pixels_per_row;
        if let Some(pull) = self.pull.as_mut() {
            pull.touch_start(y, scroll);
        }
    }

    /// True when the drag was taken by the pull gesture.
    pub fn touch_move(&mut self, row: u16) -> bool {
        let scroll = self.scroll_px();
        let y = f32::from(row) * self.pixels_per_row;
        self.pull
            .as_mut()
            .map(|pull| pull.touch_move(y, scroll))
            .unwrap_or(false)
    }

    pub fn touch_end(&mut self, now: Instant) {
        let scroll = self.scroll_px();
        if let Some(pull) = self.pull.as_mut() {
            pull.touch_end(scroll, now);
        }
    }

    pub fn poll_pull(&mut self, now: Instant) -> Option<RefreshEffect> {
        self.pull.as_mut().and_then(|pull| pull.poll(now))
    }

    pub fn resolve(&self, href: &str) -> PathBuf {
        self.location.resolve(href)
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::refresh::PullState;

    const PAGE: &str = r##"
<div class="theme-card" data-tags="news"><div class="theme-name">Headlines</div></div>
<span class="tag" data-tag="news">#News</span><span class="tag" data-tag="life">#Life</span>
<div class="tweet" data-tags="news" data-type="original">
  <div class="tweet-text"><p>Alpha launch</p><img src="a.png"><img src="b.png"></div>
  <div class="tweet-time"><a href="#">2024-02-20 10:00:00</a></div>
</div>
<div class="tweet" data-tags="life" data-type="repost">
  <div class="tweet-text"><p>Beta walk</p></div>
  <div class="tweet-time"><a href="#">2024-02-03 09:00:00</a></div>
</div>
<div class="tweet" data-tags="news" data-type="repost">
  <div class="tweet-text"><p>Gamma story</p></div>
  <div class="tweet-time"><a href="#">2024-01-28 18:30:00</a></div>
</div>
<script>window.__archiveDays = {"2024-01": ["2024-01-28"], "2024-02": ["2024-02-03", "2024-02-20"]};</script>
"##;

    fn state(touch: bool) -> AppState {
        let page = Page::parse(PAGE, PathBuf::from("site/index.html"));
        AppState::new(page, &AppConfig::default(), touch)
    }

    #[test]
    fn filtering_resets_selection_to_top() {
        let mut state = state(false);
        state.move_selection(2);
        assert_eq!(state.selected, 2);
        let outcome = state.apply_filter(FilterRequest::Tag("news".into()));
        assert_matches!(outcome, ApplyOutcome::Applied { count: 2, .. });
        assert_eq!(state.selected, 0);
        assert_eq!(state.visible_posts(), vec![0, 2]);
        assert_eq!(state.filter().status_label(), "#news (2)");
    }

    #[test]
    fn search_typing_filters_and_backspace_clears() {
        let mut state = state(false);
        state.begin_search();
        for ch in "BETA".chars() {
            state.push_search_char(ch);
        }
        assert_eq!(state.filter().status_label(), "Search: \"beta\" (1)");
        for _ in 0..4 {
            state.pop_search_char();
        }
        assert!(state.filter().active().is_none());
        assert_eq!(state.visible_posts().len(), 3);
        assert!(state.is_search_active());
    }

    #[test]
    fn modals_freeze_list_scrolling() {
        let mut state = state(false);
        assert!(!state.open_modal(ModalId::Tags));
        state.move_selection(1);
        assert_eq!(state.selected, 0);
        assert!(state.close_modals());
        state.move_selection(1);
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn opening_status_modal_requests_a_load() {
        let mut state = state(false);
        assert!(state.open_modal(ModalId::ModelStatus));
        assert!(state.status.loading);
        assert_eq!(state.status.meta, "Loading...");
    }

    #[test]
    fn archive_modal_renders_latest_month() {
        let mut state = state(false);
        state.open_modal(ModalId::Archive);
        assert_eq!(state.calendar.current_month_key(), "2024-02");
    }

    #[test]
    fn lightbox_opens_only_for_posts_with_images() {
        let mut state = state(false);
        assert!(state.open_lightbox());
        assert_eq!(state.lightbox().current(), Some("a.png"));
        state.navigate_lightbox(-1);
        assert_eq!(state.lightbox().current(), Some("b.png"));
        assert_eq!(
            state.lightbox_post().map(|post| post.timestamp_label.as_str()),
            Some("2024-02-20 10:00:00")
        );
        state.close_lightbox();

        state.move_selection(1);
        assert!(!state.open_lightbox());
        assert_eq!(state.status_message(), Some("No images in this post"));
        assert!(!state.open_lightbox_at(0, "missing.png"));
    }

    #[test]
    fn type_cursor_tracks_active_type_filter() {
        let mut state = state(false);
        state.apply_filter(FilterRequest::Type(TypeChoice::Repost));
        assert_eq!(state.type_cursor_choice(), TypeChoice::Repost);
        assert_eq!(state.filter().status_label(), "Repost (2)");
        state.clear_filter();
        assert_eq!(state.type_cursor_choice(), TypeChoice::All);
    }

    #[test]
    fn pull_gesture_is_only_tracked_on_touch_clients() {
        let t0 = Instant::now();
        let mut desktop = state(false);
        desktop.touch_start(2);
        assert!(!desktop.touch_move(12));
        assert!(desktop.pull().is_none());

        let mut touch = state(true);
        touch.touch_start(2);
        assert!(touch.touch_move(12));
        assert_eq!(touch.pull().map(|pull| pull.state()), Some(PullState::Ready));
        touch.touch_end(t0);
        assert_eq!(
            touch.poll_pull(t0 + Duration::from_millis(800)),
            Some(RefreshEffect::Reload)
        );
    }

    #[test]
    fn pull_is_ignored_when_list_is_scrolled_or_modal_open() {
        let mut touch = state(true);
        touch.offset = 1;
        touch.touch_start(0);
        assert!(!touch.touch_move(20));

        let mut modal = state(true);
        modal.open_modal(ModalId::Themes);
        modal.touch_start(0);
        assert!(!modal.touch_move(20));
    }
}

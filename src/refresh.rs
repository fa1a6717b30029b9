use std::env;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{GestureConfig, TouchMode};

static TOUCH_CLIENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)iPhone|iPad|iPod|Android").expect("valid client regex"));

pub const LABEL_PULL: &str = "Pull to refresh";
pub const LABEL_RELEASE: &str = "Release to refresh";
pub const LABEL_LOADING: &str = "Loading...";

pub fn is_touch_client(identity: &str) -> bool {
    TOUCH_CLIENT.is_match(identity)
}

/// Best guess at who is on the other end of the terminal.
pub fn client_identity() -> Option<String> {
    if let Ok(explicit) = env::var("ARCHIVE_TUI_CLIENT") {
        return Some(explicit);
    }
    if env::var_os("TERMUX_VERSION").is_some() {
        return Some("Android".to_string());
    }
    env::var("TERM_PROGRAM").ok()
}

pub fn touch_enabled(mode: TouchMode) -> bool {
    match mode {
        TouchMode::On => true,
        TouchMode::Off => false,
        TouchMode::Auto => client_identity()
            .map(|identity| is_touch_client(&identity))
            .unwrap_or(false),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    Idle,
    Pulling,
    Ready,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEffect {
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTimer {
    ResetVisual,
    Reload,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    timer: PendingTimer,
    deadline: Instant,
}

/// What the indicator and the content offset should look like right now.
#[derive(Debug, Clone, PartialEq)]
pub struct PullVisual {
    pub offset: f32,
    pub opacity: f32,
    pub rotation: f32,
    pub ready: bool,
    pub refreshing: bool,
    pub label: &'static str,
}

impl Default for PullVisual {
    fn default() -> Self {
        Self {
            offset: 0.0,
            opacity: 0.0,
            rotation: 0.0,
            ready: false,
            refreshing: false,
            label: LABEL_PULL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PullToRefresh {
    config: GestureConfig,
    state: PullState,
    tracking: bool,
    start_y: f32,
    current_y: f32,
    visual: PullVisual,
    pending: Option<Pending>,
}

impl PullToRefresh {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: PullState::Idle,
            tracking: false,
            start_y: 0.0,
            current_y: 0.0,
            visual: PullVisual::default(),
            pending: None,
        }
    }

    pub fn state(&self) -> PullState {
        self.state
    }

    pub fn visual(&self) -> &PullVisual {
        &self.visual
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    fn at_top(&self, scroll_px: f32) -> bool {
        scroll_px <= self.config.at_top_px
    }

    pub fn touch_start(&mut self, y: f32, scroll_px: f32) {
        if self.state == PullState::Refreshing {
            return;
        }
        if matches!(self.pending, Some(p) if p.timer == PendingTimer::ResetVisual) {
            self.pending = None;
            self.finish_reset();
        }
        if !self.at_top(scroll_px) {
            return;
        }
        self.start_y = y;
        self.current_y = y;
        self.tracking = true;
    }

    /// Returns true when the gesture is consumed and the list must not scroll.
    pub fn touch_move(&mut self, y: f32, scroll_px: f32) -> bool {
        if !self.tracking || self.state == PullState::Refreshing || !self.at_top(scroll_px) {
            return false;
        }
        self.current_y = y;
        let distance = self.current_y - self.start_y;
        if distance <= 0.0 {
            return false;
        }
        self.set_progress(distance);
        true
    }

    pub fn touch_end(&mut self, scroll_px: f32, now: Instant) {
        if !self.tracking {
            return;
        }
        self.tracking = false;
        let distance = self.current_y - self.start_y;
        if distance >= self.config.threshold_px && self.at_top(scroll_px) {
            self.trigger_refresh(now);
        } else {
            self.reset(now);
        }
    }

    /// Fires the pending timer once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<RefreshEffect> {
        let pending = self.pending?;
        if now < pending.deadline {
            return None;
        }
        self.pending = None;
        match pending.timer {
            PendingTimer::ResetVisual => {
                self.finish_reset();
                None
            }
            PendingTimer::Reload => {
                tracing::info!("pull-to-refresh reload due");
                self.state = PullState::Idle;
                self.visual = PullVisual::default();
                Some(RefreshEffect::Reload)
            }
        }
    }

    fn set_progress(&mut self, distance: f32) {
        let ready = distance >= self.config.threshold_px;
        self.visual.offset = distance * self.config.damping;
        self.visual.opacity = (distance / self.config.threshold_px).min(1.0);
        self.visual.rotation = distance * 2.0;
        self.visual.ready = ready;
        self.visual.label = if ready { LABEL_RELEASE } else { LABEL_PULL };
        self.state = if ready {
            PullState::Ready
        } else {
            PullState::Pulling
        };
    }

    fn trigger_refresh(&mut self, now: Instant) {
        self.state = PullState::Refreshing;
        self.visual.offset = self.config.threshold_px * self.config.damping;
        self.visual.ready = false;
        self.visual.refreshing = true;
        self.visual.label = LABEL_LOADING;
        self.pending = Some(Pending {
            timer: PendingTimer::Reload,
            deadline: now + self.config.reload_delay(),
        });
    }

    fn reset(&mut self, now: Instant) {
        self.state = PullState::Idle;
        self.visual.offset = 0.0;
        self.visual.opacity = 0.0;
        self.visual.ready = false;
        self.pending = Some(Pending {
            timer: PendingTimer::ResetVisual,
            deadline: now + self.config.reset_delay(),
        });
    }

    fn finish_reset(&mut self) {
        self.visual.refreshing = false;
        self.visual.label = LABEL_PULL;
    }
}

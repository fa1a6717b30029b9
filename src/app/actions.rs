use std::path::PathBuf;

use crate::filter::{ApplyOutcome, FilterRequest, TypeChoice};

use super::state::AppState;

/// A clickable or key-activated control on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Tag(String),
    Theme(usize),
    TypeOption(TypeChoice),
    MonthFilter,
    DayFilter,
    CalendarDay(String),
    ClearFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEffect {
    None,
    Filtered(ApplyOutcome),
    Navigate(PathBuf),
}

/// Turns control activations into filter changes, closing whatever overlay
/// the control lived in.
pub struct ControlDispatcher<'a> {
    state: &'a mut AppState,
}

impl<'a> ControlDispatcher<'a> {
    pub fn new(state: &'a mut AppState) -> Self {
        Self { state }
    }

    pub fn activate(&mut self, control: Control) -> ControlEffect {
        tracing::debug!(?control, "control activated");
        match control {
            Control::Tag(name) => self.filter_and_close(FilterRequest::Tag(name)),
            Control::Theme(idx) => {
                let Some(card) = self.state.themes.get(idx).cloned() else {
                    return ControlEffect::None;
                };
                self.filter_and_close(FilterRequest::Theme {
                    name: card.name,
                    tags: card.tags,
                })
            }
            Control::TypeOption(choice) => {
                self.state.close_type_menu();
                let outcome = self.state.apply_filter(FilterRequest::Type(choice));
                ControlEffect::Filtered(outcome)
            }
            Control::MonthFilter => match self.state.calendar.month_filter_request() {
                Some(request) => self.filter_and_close(request),
                None => ControlEffect::None,
            },
            Control::DayFilter => match self.state.calendar.day_filter_request() {
                Some(request) => self.filter_and_close(request),
                None => ControlEffect::None,
            },
            Control::CalendarDay(date) => {
                let kind = self.state.location.kind;
                let Some(nav) = self.state.calendar.select_day(&date, kind) else {
                    return ControlEffect::None;
                };
                self.state.close_modals();
                ControlEffect::Navigate(self.state.resolve(&nav.href))
            }
            Control::ClearFilter => {
                self.state.clear_filter();
                ControlEffect::Filtered(ApplyOutcome::Cleared)
            }
        }
    }

    fn filter_and_close(&mut self, request: FilterRequest) -> ControlEffect {
        let outcome = self.state.apply_filter(request);
        self.state.close_modals();
        ControlEffect::Filtered(outcome)
    }
}

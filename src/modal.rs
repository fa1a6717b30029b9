use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ModalId {
    Themes,
    Tags,
    Archive,
    ModelStatus,
}

/// Tracks open overlays. Opening one never closes another; the most recent
/// one is on top and receives keys.
#[derive(Debug, Clone, Default)]
pub struct ModalHost {
    stack: Vec<ModalId>,
}

impl ModalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, id: ModalId) {
        self.stack.retain(|open| *open != id);
        self.stack.push(id);
        tracing::debug!(modal = %id, depth = self.stack.len(), "modal opened");
    }

    pub fn close_all(&mut self) {
        if !self.stack.is_empty() {
            tracing::debug!(closed = self.stack.len(), "modals closed");
        }
        self.stack.clear();
    }

    pub fn is_open(&self, id: ModalId) -> bool {
        self.stack.contains(&id)
    }

    pub fn any_open(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Background scrolling is frozen while anything is open.
    pub fn scroll_locked(&self) -> bool {
        self.any_open()
    }

    pub fn topmost(&self) -> Option<ModalId> {
        self.stack.last().copied()
    }

    /// Open modals, bottom first.
    pub fn open_modals(&self) -> &[ModalId] {
        &self.stack
    }

    /// Escape and backdrop clicks both dismiss everything. Returns whether
    /// anything was open.
    pub fn dismiss(&mut self) -> bool {
        let had_open = self.any_open();
        self.close_all();
        had_open
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn opening_stacks_without_closing_others() {
        let mut host = ModalHost::new();
        host.open(ModalId::Tags);
        host.open(ModalId::Themes);
        assert!(host.is_open(ModalId::Tags));
        assert!(host.is_open(ModalId::Themes));
        assert_eq!(host.topmost(), Some(ModalId::Themes));
        assert!(host.scroll_locked());
    }

    #[test]
    fn reopening_moves_modal_to_top() {
        let mut host = ModalHost::new();
        host.open(ModalId::Tags);
        host.open(ModalId::Archive);
        host.open(ModalId::Tags);
        assert_eq!(host.open_modals(), &[ModalId::Archive, ModalId::Tags]);
    }

    #[test]
    fn close_all_clears_every_modal_and_unlocks_scroll() {
        let mut host = ModalHost::new();
        for id in ModalId::iter() {
            host.open(id);
        }
        assert!(host.dismiss());
        assert!(!host.any_open());
        assert!(!host.scroll_locked());
        assert!(!host.dismiss());
    }
}

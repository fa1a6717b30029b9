use crate::posts::PostIndex;

/// Per-post image galleries, in document order.
pub fn galleries(posts: &PostIndex) -> Vec<Vec<String>> {
    posts.iter().map(|post| post.images.clone()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct Lightbox {
    gallery: Vec<String>,
    index: usize,
    open: bool,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens at `src` within `gallery`. Refused when `src` is not part of it.
    pub fn open(&mut self, src: &str, gallery: &[String]) -> bool {
        let Some(index) = gallery.iter().position(|candidate| candidate == src) else {
            tracing::debug!(src, "lightbox source not in gallery");
            return false;
        };
        self.gallery = gallery.to_vec();
        self.index = index;
        self.open = true;
        true
    }

    pub fn navigate(&mut self, direction: i32) {
        if !self.open || self.gallery.is_empty() {
            return;
        }
        let len = self.gallery.len() as i64;
        let next = (self.index as i64 + i64::from(direction)).rem_euclid(len);
        self.index = next as usize;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Previous/next controls only make sense with more than one image.
    pub fn shows_nav(&self) -> bool {
        self.gallery.len() > 1
    }

    pub fn current(&self) -> Option<&str> {
        if !self.open {
            return None;
        }
        self.gallery.get(self.index).map(String::as_str)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.gallery.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gallery.is_empty()
    }

    /// `i/n` position, one-based.
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.index + 1, self.gallery.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn navigation_wraps_in_both_directions() {
        let images = gallery(&["a.png", "b.png", "c.png"]);
        let mut lightbox = Lightbox::new();
        assert!(lightbox.open("a.png", &images));
        lightbox.navigate(-1);
        assert_eq!(lightbox.index(), 2);
        assert_eq!(lightbox.current(), Some("c.png"));
        lightbox.navigate(1);
        assert_eq!(lightbox.index(), 0);
        assert_eq!(lightbox.position_label(), "1/3");
    }

    #[test]
    fn single_image_hides_navigation() {
        let images = gallery(&["only.png"]);
        let mut lightbox = Lightbox::new();
        assert!(lightbox.open("only.png", &images));
        assert!(!lightbox.shows_nav());
        lightbox.navigate(1);
        assert_eq!(lightbox.current(), Some("only.png"));
    }

    #[test]
    fn unknown_source_and_empty_gallery_are_refused() {
        let mut lightbox = Lightbox::new();
        assert!(!lightbox.open("x.png", &gallery(&["a.png"])));
        assert!(!lightbox.open("x.png", &[]));
        assert!(!lightbox.is_open());
        assert_eq!(lightbox.current(), None);
    }

    #[test]
    fn close_keeps_gallery_but_hides_image() {
        let images = gallery(&["a.png", "b.png"]);
        let mut lightbox = Lightbox::new();
        lightbox.open("b.png", &images);
        lightbox.close();
        assert!(!lightbox.is_open());
        assert_eq!(lightbox.current(), None);
        lightbox.navigate(1);
        assert_eq!(lightbox.index(), 1);
    }
}

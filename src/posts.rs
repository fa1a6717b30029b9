use std::collections::BTreeSet;

use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PostKind {
    Original,
    Repost,
}

impl Default for PostKind {
    fn default() -> Self {
        PostKind::Original
    }
}

/// A single rendered post, read once from the page markup.
#[derive(Debug, Clone)]
pub struct Post {
    pub tags: BTreeSet<String>,
    pub kind: PostKind,
    pub timestamp_label: String,
    pub text: String,
    pub images: Vec<String>,
    text_lower: String,
    visible: bool,
}

impl Post {
    pub fn new(
        raw_tags: &str,
        kind: PostKind,
        timestamp_label: impl Into<String>,
        text: impl Into<String>,
        images: Vec<String>,
    ) -> Self {
        let text = text.into();
        let text_lower = text.to_lowercase();
        Self {
            tags: split_tags(raw_tags),
            kind,
            timestamp_label: timestamp_label.into(),
            text,
            images,
            text_lower,
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }

    pub(crate) fn text_lower(&self) -> &str {
        &self.text_lower
    }

    /// First line of the text, used as a list headline.
    pub fn headline(&self, max_chars: usize) -> String {
        let first = self.text.lines().next().unwrap_or("").trim();
        let mut out: String = first.chars().take(max_chars).collect();
        if first.chars().count() > max_chars {
            out.push('…');
        }
        out
    }
}

/// Decomposes a comma-joined tag attribute into a lowercase set.
pub fn split_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct PostIndex {
    posts: Vec<Post>,
}

impl PostIndex {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Post> {
        self.posts.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Post> {
        self.posts.iter_mut()
    }

    pub fn visible_count(&self) -> usize {
        self.posts.iter().filter(|post| post.visible).count()
    }

    /// Indices of visible posts, in document order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.posts
            .iter()
            .enumerate()
            .filter(|(_, post)| post.visible)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_lowercased_trimmed_and_deduplicated() {
        let tags = split_tags(" News,news ,, Dev");
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["dev".to_string(), "news".to_string()]
        );
    }

    #[test]
    fn empty_tag_attribute_yields_empty_set() {
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Repost".parse::<PostKind>().ok(), Some(PostKind::Repost));
        assert_eq!(PostKind::Original.to_string(), "original");
        assert!("quote".parse::<PostKind>().is_err());
    }

    #[test]
    fn headline_truncates_first_line() {
        let post = Post::new("", PostKind::Original, "", "abcdef\nsecond", Vec::new());
        assert_eq!(post.headline(3), "abc…");
        assert_eq!(post.headline(10), "abcdef");
    }
}

use std::collections::BTreeSet;
use std::fmt;

use strum::{Display, EnumString};

use crate::posts::{split_tags, Post, PostIndex, PostKind};

/// Entry in the post-type dropdown. `All` is the same as clearing the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TypeChoice {
    All,
    Original,
    Repost,
}

impl TypeChoice {
    pub const ALL: [TypeChoice; 3] = [TypeChoice::All, TypeChoice::Original, TypeChoice::Repost];

    pub fn kind(self) -> Option<PostKind> {
        match self {
            TypeChoice::All => None,
            TypeChoice::Original => Some(PostKind::Original),
            TypeChoice::Repost => Some(PostKind::Repost),
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            TypeChoice::All => "📑",
            TypeChoice::Original => "📝",
            TypeChoice::Repost => "🔄",
        }
    }
}

impl From<PostKind> for TypeChoice {
    fn from(kind: PostKind) -> Self {
        match kind {
            PostKind::Original => TypeChoice::Original,
            PostKind::Repost => TypeChoice::Repost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRequest {
    Tag(String),
    Theme { name: String, tags: String },
    Archive(String),
    Day(String),
    Search(String),
    Type(TypeChoice),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveFilter {
    #[default]
    None,
    Tag(String),
    Theme {
        name: String,
        tags: BTreeSet<String>,
    },
    Archive(String),
    Day(String),
    Search(String),
    Type(PostKind),
}

impl ActiveFilter {
    pub fn is_none(&self) -> bool {
        matches!(self, ActiveFilter::None)
    }

    fn facet(&self) -> &'static str {
        match self {
            ActiveFilter::None => "none",
            ActiveFilter::Tag(_) => "tag",
            ActiveFilter::Theme { .. } => "theme",
            ActiveFilter::Archive(_) => "archive",
            ActiveFilter::Day(_) => "day",
            ActiveFilter::Search(_) => "search",
            ActiveFilter::Type(_) => "type",
        }
    }

    fn matches(&self, post: &Post) -> bool {
        match self {
            ActiveFilter::None => true,
            ActiveFilter::Tag(name) => post.has_tag(name),
            ActiveFilter::Theme { tags, .. } => tags.iter().any(|tag| post.tags.contains(tag)),
            ActiveFilter::Archive(prefix) | ActiveFilter::Day(prefix) => {
                matches_date_prefix(&post.timestamp_label, prefix)
            }
            ActiveFilter::Search(term) => post.text_lower().contains(term.as_str()),
            ActiveFilter::Type(kind) => post.kind == *kind,
        }
    }
}

impl fmt::Display for ActiveFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveFilter::None => write!(f, "none"),
            ActiveFilter::Tag(name) => write!(f, "tag:{name}"),
            ActiveFilter::Theme { name, .. } => write!(f, "theme:{name}"),
            ActiveFilter::Archive(prefix) => write!(f, "archive:{prefix}"),
            ActiveFilter::Day(day) => write!(f, "day:{day}"),
            ActiveFilter::Search(term) => write!(f, "search:{term}"),
            ActiveFilter::Type(kind) => write!(f, "type:{kind}"),
        }
    }
}

/// Archive and day filters compare against the display label, not a parsed date.
pub fn matches_date_prefix(label: &str, prefix: &str) -> bool {
    label.contains(prefix)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        label: String,
        count: usize,
        scroll_to_top: bool,
    },
    Cleared,
}

/// Owns the post index and the single active filter. Visibility is always
/// recomputed over the whole index.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    posts: PostIndex,
    active: ActiveFilter,
    status_label: String,
    status_visible: bool,
    search_input: String,
}

impl FilterEngine {
    pub fn new(posts: PostIndex) -> Self {
        let mut engine = Self {
            posts,
            ..Self::default()
        };
        engine.clear();
        engine
    }

    pub fn posts(&self) -> &PostIndex {
        &self.posts
    }

    pub fn active(&self) -> &ActiveFilter {
        &self.active
    }

    pub fn status_label(&self) -> &str {
        &self.status_label
    }

    pub fn status_visible(&self) -> bool {
        self.status_visible
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn is_tag_active(&self, name: &str) -> bool {
        matches!(&self.active, ActiveFilter::Tag(active) if active.eq_ignore_ascii_case(name))
    }

    pub fn is_theme_active(&self, name: &str) -> bool {
        matches!(&self.active, ActiveFilter::Theme { name: active, .. } if active == name)
    }

    pub fn type_choice(&self) -> TypeChoice {
        match &self.active {
            ActiveFilter::Type(kind) => TypeChoice::from(*kind),
            _ => TypeChoice::All,
        }
    }

    pub fn apply(&mut self, request: FilterRequest) -> ApplyOutcome {
        let (filter, label_subject) = match request {
            FilterRequest::Tag(name) => {
                let key = name.to_lowercase();
                (ActiveFilter::Tag(key), LabelSubject::Tag(name))
            }
            FilterRequest::Theme { name, tags } => {
                let candidates = split_tags(&tags);
                (
                    ActiveFilter::Theme {
                        name: name.clone(),
                        tags: candidates,
                    },
                    LabelSubject::Theme(name),
                )
            }
            FilterRequest::Archive(prefix) => (
                ActiveFilter::Archive(prefix.clone()),
                LabelSubject::Posts(prefix),
            ),
            FilterRequest::Day(day) => (ActiveFilter::Day(day.clone()), LabelSubject::Posts(day)),
            FilterRequest::Search(input) => return self.apply_search_input(&input),
            FilterRequest::Type(choice) => match choice.kind() {
                None => {
                    self.clear();
                    return ApplyOutcome::Cleared;
                }
                Some(kind) => (ActiveFilter::Type(kind), LabelSubject::Type(kind)),
            },
        };
        self.search_input.clear();
        self.install(filter, label_subject)
    }

    /// Handles a keystroke-level change of the search box.
    pub fn apply_search_input(&mut self, input: &str) -> ApplyOutcome {
        let term = input.to_lowercase().trim().to_string();
        if term.is_empty() {
            self.clear();
            return ApplyOutcome::Cleared;
        }
        self.search_input = input.to_string();
        self.install(
            ActiveFilter::Search(term.clone()),
            LabelSubject::Search(term),
        )
    }

    pub fn clear(&mut self) {
        self.active = ActiveFilter::None;
        for post in self.posts.iter_mut() {
            post.set_visible(true);
        }
        self.status_label.clear();
        self.status_visible = false;
        self.search_input.clear();
        tracing::debug!(total = self.posts.len(), "filter cleared");
    }

    fn install(&mut self, filter: ActiveFilter, subject: LabelSubject) -> ApplyOutcome {
        let mut count = 0;
        for post in self.posts.iter_mut() {
            let matched = filter.matches(post);
            post.set_visible(matched);
            if matched {
                count += 1;
            }
        }
        let label = subject.label(count);
        tracing::debug!(facet = filter.facet(), %filter, count, "filter applied");
        self.active = filter;
        self.status_label = label.clone();
        self.status_visible = true;
        ApplyOutcome::Applied {
            label,
            count,
            scroll_to_top: true,
        }
    }
}

enum LabelSubject {
    Tag(String),
    Theme(String),
    Posts(String),
    Search(String),
    Type(PostKind),
}

impl LabelSubject {
    fn label(&self, count: usize) -> String {
        match self {
            LabelSubject::Tag(name) => format!("#{name} ({count})"),
            LabelSubject::Theme(name) => format!("Theme: {name} ({count})"),
            LabelSubject::Posts(prefix) => format!("{prefix} ({count} posts)"),
            LabelSubject::Search(term) => format!("Search: \"{term}\" ({count})"),
            LabelSubject::Type(kind) => format!("{} ({count})", capitalize(&kind.to_string())),
        }
    }
}

pub(crate) fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

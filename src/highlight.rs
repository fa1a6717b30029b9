use regex::{Regex, RegexBuilder};

use crate::filter::ActiveFilter;

/// Pattern for the text the active filter matched on, if it matched on text.
pub fn build_highlight_regex(active: &ActiveFilter) -> Option<Regex> {
    let needle = match active {
        ActiveFilter::Search(term) => term.clone(),
        ActiveFilter::Tag(name) => format!("#{name}"),
        ActiveFilter::Archive(prefix) | ActiveFilter::Day(prefix) => prefix.clone(),
        ActiveFilter::None | ActiveFilter::Theme { .. } | ActiveFilter::Type(_) => return None,
    };
    if needle.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(&needle))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Theme filters match any of several tags; each gets highlighted.
pub fn build_tag_set_regex(active: &ActiveFilter) -> Option<Regex> {
    let ActiveFilter::Theme { tags, .. } = active else {
        return None;
    };
    let mut names: Vec<&String> = tags.iter().filter(|tag| !tag.is_empty()).collect();
    if names.is_empty() {
        return None;
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = names
        .into_iter()
        .map(|tag| format!("#{}\\b", regex::escape(tag)))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn search_terms_are_matched_literally() {
        let regex = build_highlight_regex(&ActiveFilter::Search("a.b".into())).expect("regex");
        let matches: Vec<_> = regex.find_iter("A.B axb").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["A.B"]);
    }

    #[test]
    fn tag_filter_highlights_chip_text() {
        let regex = build_highlight_regex(&ActiveFilter::Tag("news".into())).expect("regex");
        assert!(regex.is_match("#News #dev"));
        assert!(build_highlight_regex(&ActiveFilter::None).is_none());
    }

    #[test]
    fn theme_tags_prefer_longer_names() {
        let tags: BTreeSet<String> = ["dev", "devops"].iter().map(|t| t.to_string()).collect();
        let regex = build_tag_set_regex(&ActiveFilter::Theme {
            name: "Ops".into(),
            tags,
        })
        .expect("regex");
        let matches: Vec<_> = regex.find_iter("#devops #dev").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["#devops", "#dev"]);
    }
}

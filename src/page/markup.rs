use once_cell::sync::Lazy;
use regex::Regex;

use crate::calendar::ArchiveIndex;
use crate::posts::{Post, PostKind};

static POST_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div\s+class="tweet"([^>]*)>"#).expect("valid post regex")
});
static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*"([^"]*)""#).expect("valid attribute regex")
});
static TIME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div\s+class="tweet-time"[^>]*>(.*?)</div>"#).expect("valid time regex")
});
static TEXT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<div\s+class="tweet-text"[^>]*>"#).expect("valid text regex"));
static TEXT_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div\s+class="tweet-(tags|time)""#).expect("valid text end regex")
});
static IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img\s[^>]*?src="([^"]+)""#).expect("valid img regex"));
static TAG_CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span\s+class="tag"[^>]*?data-tag="([^"]*)""#).expect("valid tag regex")
});
static THEME_CARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div\s+class="theme-card"([^>]*)>"#).expect("valid theme regex")
});
static THEME_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="theme-name"[^>]*>(.*?)</"#).expect("valid theme name regex")
});
static DIV_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").expect("valid div regex"));
static ARCHIVE_DAYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"window\.__archiveDays\s*=\s*(\{[^}]*\})").expect("valid archive regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid blank regex"));
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid strip regex"));
static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|blockquote|h[1-6])>").expect("valid break regex")
});
static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid script regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeCard {
    pub name: String,
    pub tags: String,
}

pub fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTR.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if key == name {
            caps.get(2).map(|value| value.as_str())
        } else {
            None
        }
    })
}

/// Offset of the `</div>` closing the element whose content starts at `from`,
/// or `limit` when the markup never closes it.
fn element_end(html: &str, from: usize, limit: usize) -> usize {
    let mut depth = 1usize;
    for caps in DIV_TAG.captures_iter(&html[from..limit]) {
        let (Some(tag), Some(slash)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if slash.as_str().is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return from + tag.start();
            }
        }
    }
    limit
}

pub fn parse_posts(html: &str) -> Vec<Post> {
    let opens: Vec<_> = POST_OPEN.captures_iter(html).collect();
    let mut posts = Vec::with_capacity(opens.len());
    for (idx, caps) in opens.iter().enumerate() {
        let (Some(whole), Some(attrs)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let limit = opens
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|next| next.start())
            .unwrap_or(html.len());
        let body = &html[whole.end()..element_end(html, whole.end(), limit)];

        let raw_tags = attribute(attrs.as_str(), "data-tags").unwrap_or("");
        let kind = attribute(attrs.as_str(), "data-type")
            .and_then(|value| value.parse::<PostKind>().ok())
            .unwrap_or_else(|| {
                tracing::warn!(post = idx, "post without a recognised data-type, assuming original");
                PostKind::Original
            });
        let timestamp = TIME_LABEL
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| text_content(m.as_str()))
            .unwrap_or_default();
        let images = post_images(body);
        posts.push(Post::new(
            raw_tags,
            kind,
            timestamp,
            text_content(body),
            images,
        ));
    }
    posts
}

fn post_images(body: &str) -> Vec<String> {
    let Some(start) = TEXT_START.find(body) else {
        return Vec::new();
    };
    let rest = &body[start.end()..];
    let scope = TEXT_END
        .find(rest)
        .map(|end| &rest[..end.start()])
        .unwrap_or(rest);
    IMG_SRC
        .captures_iter(scope)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
        .collect()
}

pub fn parse_tag_controls(html: &str) -> Vec<String> {
    TAG_CONTROL
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub fn parse_theme_cards(html: &str) -> Vec<ThemeCard> {
    THEME_CARD
        .captures_iter(html)
        .filter_map(|caps| {
            let (whole, attrs) = (caps.get(0)?, caps.get(1)?.as_str());
            let card = &html[whole.end()..element_end(html, whole.end(), html.len())];
            let name = THEME_NAME
                .captures(card)
                .and_then(|name| name.get(1))
                .map(|m| text_content(m.as_str()))?;
            let tags = attribute(attrs, "data-tags")
                .map(decode_entities)
                .unwrap_or_default();
            Some(ThemeCard { name, tags })
        })
        .collect()
}

pub fn parse_archive_index(html: &str) -> ArchiveIndex {
    let Some(raw) = ARCHIVE_DAYS.captures(html).and_then(|caps| caps.get(1)) else {
        return ArchiveIndex::default();
    };
    match serde_json::from_str(raw.as_str()) {
        Ok(index) => index,
        Err(err) => {
            tracing::warn!(?err, "archive day index is not valid JSON, calendar will be empty");
            ArchiveIndex::default()
        }
    }
}

/// Approximates `innerText`: drops markup, decodes entities, collapses blanks.
pub fn text_content(fragment: &str) -> String {
    let without_scripts = SCRIPT_STYLE.replace_all(fragment, " ");
    let flattened = WHITESPACE.replace_all(&without_scripts, " ");
    let with_breaks = BLOCK_BREAK.replace_all(&flattened, "\n");
    let stripped = TAGS.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&stripped);
    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

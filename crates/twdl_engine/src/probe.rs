use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use twdl_core::{Manifest, MediaItem, MediaKind, ProbeOutcome};
use twdl_logging::twdl_debug;

const NOTICES_HELP_URL: &str = "https://help.twitter.com/rules-and-policies/notices-on-twitter";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static SCRIPT_LOAD_FAILURE: LazyLock<Selector> =
    LazyLock::new(|| selector("div#ScriptLoadFailure"));
static ERROR_DETAIL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[data-testid="error-detail"]"#));
static ERROR_DETAIL_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector("div > span:first-child span"));
static TOAST: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-testid="toast"]"#));
static REACT_ROOT: LazyLock<Selector> = LazyLock::new(|| selector("#react-root"));
static MAIN: LazyLock<Selector> = LazyLock::new(|| selector(r#"main[role="main"]"#));
static PRIMARY_COLUMN: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[data-testid="primaryColumn"]"#));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[data-testid="cellInnerDiv"]"#));
static SPINNER: LazyLock<Selector> = LazyLock::new(|| selector(r#"div[role="progressbar"]"#));
static SPINNER_CIRCLE: LazyLock<Selector> = LazyLock::new(|| selector("div > svg > circle"));
static LABELLED_PROGRESSBAR: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[aria-label][role="progressbar"]"#));
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static NOTICE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    selector(&format!(
        r#"a[href="{NOTICES_HELP_URL}"][role="link"][target="_blank"]"#
    ))
});
static MEDIA_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[src^="https://pbs.twimg.com/media/"]"#));
static VIDEO: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"div[data-testid="tweetPhoto"] div[data-testid="videoComponent"] video"#)
});
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>https://pbs\.twimg\.com/media/)(?P<id>[^?]+)\?format=(?P<format>[^&]+)&?.*$")
        .expect("image url pattern is valid")
});
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://video\.twimg\.com/tweet_video/(?P<id>[^.]+)\.(?P<format>.+)$")
        .expect("video url pattern is valid")
});
static POSTER_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://pbs\.twimg\.com/[^/]+/(?P<id>[^.]+)\.(?P<format>.+)$")
        .expect("poster url pattern is valid")
});

/// What a probe sees: the rendered document plus failures captured since the last probe.
pub struct ProbeInput<'a> {
    pub document: &'a Html,
    pub rejections: &'a [String],
}

/// One classification rule. Returns `None` to defer to the next rule.
#[derive(Clone, Copy)]
pub struct ProbeRule {
    pub name: &'static str,
    pub check: fn(&ProbeInput<'_>) -> Option<ProbeOutcome>,
}

/// The tweet-page rules in priority order; the first match wins.
pub const TWEET_PAGE_RULES: &[ProbeRule] = &[
    ProbeRule {
        name: "rejection",
        check: pending_rejections,
    },
    ProbeRule {
        name: "script-load-failure",
        check: script_load_failure,
    },
    ProbeRule {
        name: "error-detail",
        check: error_detail,
    },
    ProbeRule {
        name: "removal-notice",
        check: removal_notice,
    },
    ProbeRule {
        name: "main-region",
        check: missing_main_region,
    },
    ProbeRule {
        name: "loading",
        check: still_loading,
    },
    ProbeRule {
        name: "media",
        check: scan_media,
    },
];

/// Classifies the currently loaded page by walking an ordered rule table.
#[derive(Clone)]
pub struct PageProbe {
    rules: Vec<ProbeRule>,
}

impl Default for PageProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PageProbe {
    pub fn new() -> Self {
        Self::with_rules(TWEET_PAGE_RULES.to_vec())
    }

    pub fn with_rules(rules: Vec<ProbeRule>) -> Self {
        Self { rules }
    }

    /// Classify `html`. Exactly one outcome is produced; a page that no rule
    /// claims counts as rendered without media.
    pub fn classify(&self, html: &str, rejections: &[String]) -> ProbeOutcome {
        let document = Html::parse_document(html);
        let input = ProbeInput {
            document: &document,
            rejections,
        };
        for rule in &self.rules {
            if let Some(outcome) = (rule.check)(&input) {
                twdl_debug!("probe rule {} matched: {}", rule.name, outcome);
                return outcome;
            }
        }
        ProbeOutcome::Found(Manifest::new())
    }
}

fn pending_rejections(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    if input.rejections.is_empty() {
        return None;
    }
    Some(ProbeOutcome::Abort {
        reason: input.rejections.join(","),
    })
}

fn script_load_failure(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    let failure = input
        .document
        .select(&SCRIPT_LOAD_FAILURE)
        .find(|el| child_elements(*el).any(|c| c.value().name() == "form"))?;
    Some(ProbeOutcome::Abort {
        reason: format!(
            "access probably restricted; the page says \"{}\"",
            normalized_text(failure)
        ),
    })
}

fn error_detail(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    let detail = input.document.select(&ERROR_DETAIL).next()?;
    let mut message = leaf_texts(detail, &ERROR_DETAIL_TEXT).join(",");
    if message.is_empty() {
        message = normalized_text(detail);
    }
    Some(ProbeOutcome::Error {
        message,
        retry_later: false,
    })
}

fn removal_notice(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    if let Some(toast) = input.document.select(&TOAST).next() {
        return Some(ProbeOutcome::Error {
            message: normalized_text(toast),
            retry_later: false,
        });
    }
    let article = first_article(input.document)?;
    let link = article.select(&NOTICE_LINK).find(|a| {
        a.prev_siblings()
            .find_map(ElementRef::wrap)
            .is_some_and(|span| {
                span.value().name() == "span"
                    && child_elements(span).any(|c| c.value().name() == "span")
            })
    })?;
    let message = link
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| child_elements(parent).next())
        .map(|first| leaf_texts(first, &SPAN).join(","))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "notice".to_string());
    Some(ProbeOutcome::Error {
        message,
        retry_later: false,
    })
}

fn missing_main_region(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    let Some(react_root) = input.document.select(&REACT_ROOT).next() else {
        return retry("no #react-root");
    };
    let mains: Vec<_> = react_root.select(&MAIN).collect();
    if mains.len() != 1 {
        return retry(&format!("{} <main> elements", mains.len()));
    }
    if mains[0].select(&PRIMARY_COLUMN).next().is_none() {
        return retry("no primaryColumn");
    }
    None
}

fn still_loading(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    let main = input.document.select(&MAIN).next()?;
    for column in main.select(&PRIMARY_COLUMN) {
        if column.select(&CELL).next().is_some() {
            continue;
        }
        if let Some(spinner) = column
            .select(&SPINNER)
            .find(|bar| bar.select(&SPINNER_CIRCLE).next().is_some())
        {
            let label = spinner.value().attr("aria-label").unwrap_or("loading");
            return retry(label);
        }
    }
    if let Some(bar) = main.select(&LABELLED_PROGRESSBAR).next() {
        let mut reason = leaf_texts(bar, &SPAN).join(",");
        if reason.is_empty() {
            reason = bar.value().attr("aria-label").unwrap_or("loading").to_string();
        }
        return retry(&reason);
    }
    None
}

fn scan_media(input: &ProbeInput<'_>) -> Option<ProbeOutcome> {
    let mut manifest = Manifest::new();
    if let Some(article) = first_article(input.document) {
        for element in article.select(&MEDIA_IMAGE) {
            if let Some(src) = element.value().attr("src") {
                add_image(&mut manifest, src);
            }
        }
        for video in article.select(&VIDEO) {
            add_video(&mut manifest, video);
        }
    }
    Some(ProbeOutcome::Found(manifest))
}

fn add_image(manifest: &mut Manifest, src: &str) {
    let Some(caps) = IMAGE_URL.captures(src) else {
        return;
    };
    let name = format!("{}.{}", &caps["id"], &caps["format"]);
    let download_url = format!("{}{}:large", &caps["prefix"], name);
    manifest.insert(
        name,
        MediaItem {
            source_url: src.to_string(),
            download_url,
            kind: MediaKind::Image,
            label: None,
        },
    );
}

fn add_video(manifest: &mut Manifest, video: ElementRef<'_>) {
    let attrs = video.value();
    let label = attrs.attr("aria-label").map(str::to_string);
    if let Some(caps) = attrs.attr("src").and_then(|src| VIDEO_URL.captures(src)) {
        let matched = caps[0].to_string();
        manifest.insert(
            format!("{}.{}", &caps["id"], &caps["format"]),
            MediaItem {
                source_url: matched.clone(),
                download_url: matched,
                kind: MediaKind::Video,
                label: label.clone(),
            },
        );
    }
    if let Some(caps) = attrs.attr("poster").and_then(|p| POSTER_URL.captures(p)) {
        let matched = caps[0].to_string();
        manifest.insert(
            format!("{}.{}", &caps["id"], &caps["format"]),
            MediaItem {
                source_url: matched.clone(),
                download_url: matched,
                kind: MediaKind::Image,
                label,
            },
        );
    }
}

fn retry(reason: &str) -> Option<ProbeOutcome> {
    Some(ProbeOutcome::RetryLater {
        reason: reason.to_string(),
    })
}

fn first_article(document: &Html) -> Option<ElementRef<'_>> {
    let main = document.select(&MAIN).next()?;
    main.select(&ARTICLE).next()
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Texts of matched elements that have no element children, in document order.
fn leaf_texts(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .filter(|el| child_elements(*el).next().is_none())
        .map(|el| el.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_source_derives_large_download_url() {
        let mut manifest = Manifest::new();
        add_image(
            &mut manifest,
            "https://pbs.twimg.com/media/FooBar?format=jpg&name=small",
        );
        let item = manifest.get("FooBar.jpg").unwrap();
        assert_eq!(item.download_url, "https://pbs.twimg.com/media/FooBar.jpg:large");
        assert_eq!(item.kind, MediaKind::Image);
    }

    #[test]
    fn image_source_without_format_is_ignored() {
        let mut manifest = Manifest::new();
        add_image(&mut manifest, "https://pbs.twimg.com/media/FooBar.jpg");
        assert!(manifest.is_empty());
    }
}

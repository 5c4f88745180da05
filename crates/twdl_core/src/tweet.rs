use std::sync::LazyLock;

use regex::Regex;

static TWEET_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>https://(?:twitter|x)\.com/)(?P<user>[^/]+)/status/(?P<id>\d+)$")
        .expect("tweet url pattern is valid")
});

/// A tweet link found in a direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetUrlReference {
    pub id: String,
    pub user: String,
    /// The expanded URL that matched the tweet pattern; this is what gets loaded.
    pub matched_text: String,
    /// The URL as it appears in the archive (usually a `t.co` short link).
    pub original_url: String,
}

/// Match an archive URL entry against the tweet URL pattern.
pub fn match_tweet_url(expanded: &str, original_url: &str) -> Option<TweetUrlReference> {
    let caps = TWEET_URL.captures(expanded)?;
    Some(TweetUrlReference {
        id: caps["id"].to_string(),
        user: caps["user"].to_string(),
        matched_text: caps[0].to_string(),
        original_url: original_url.to_string(),
    })
}

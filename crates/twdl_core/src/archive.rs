use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tweet::{match_tweet_url, TweetUrlReference};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive contains no JSON array")]
    MissingArray,
    #[error("archive is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message {id} has an unparsable createdAt {created_at:?}")]
    Timestamp { id: String, created_at: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub dm_conversation: Conversation,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One element of a conversation's `messages` array.
///
/// Besides `messageCreate` the export may carry other event kinds (joins,
/// reactions); those have no `messageCreate` and are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_create: Option<ArchiveMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMessage {
    pub created_at: String,
    pub id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub urls: Vec<ArchiveUrl>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArchiveMessage {
    pub fn timestamp(&self) -> Result<DateTime<Utc>, ArchiveError> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ArchiveError::Timestamp {
                id: self.id.clone(),
                created_at: self.created_at.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveUrl {
    pub url: String,
    pub expanded: String,
    #[serde(default)]
    pub display: String,
}

/// Parse an exported direct-message archive.
///
/// The export is a script assignment (`window.YTD.direct_messages.part0 = [...]`);
/// everything before the first `[` is skipped.
pub fn parse_archive(text: &str) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let start = text.find('[').ok_or(ArchiveError::MissingArray)?;
    Ok(serde_json::from_str(&text[start..])?)
}

/// A message that links at least one tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMessage {
    pub conversation_id: String,
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    /// `createdAt` as written in the archive.
    pub created_at: String,
    /// Parsed `createdAt`; `None` when the archive value is not RFC 3339.
    pub timestamp: Option<DateTime<Utc>>,
    pub urls: Vec<TweetUrlReference>,
}

/// The work list for one batch, in archive order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetList {
    /// Total number of matched tweet URLs across all messages.
    pub count: usize,
    pub messages: Vec<TargetMessage>,
}

/// Walk conversations and messages in file order and keep the tweet links.
///
/// A message whose `createdAt` does not parse is still kept; the date is only
/// informational.
pub fn collect_targets(entries: &[ArchiveEntry]) -> TargetList {
    let mut list = TargetList::default();
    for entry in entries {
        let conversation = &entry.dm_conversation;
        for message in conversation
            .messages
            .iter()
            .filter_map(|m| m.message_create.as_ref())
        {
            let urls: Vec<_> = message
                .urls
                .iter()
                .filter_map(|u| match_tweet_url(&u.expanded, &u.url))
                .collect();
            if urls.is_empty() {
                continue;
            }
            list.count += urls.len();
            list.messages.push(TargetMessage {
                conversation_id: conversation.conversation_id.clone(),
                id: message.id.clone(),
                sender_id: message.sender_id.clone(),
                recipient_id: message.recipient_id.clone(),
                created_at: message.created_at.clone(),
                timestamp: message.timestamp().ok(),
                urls,
            });
        }
    }
    list
}

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use twdl_core::{
    collect_targets, match_tweet_url, parse_archive, render_archive_script, select_by_date_range,
    ArchiveError,
};

const ARCHIVE: &str = r#"window.YTD.direct_messages.part0 = [
  {
    "dmConversation": {
      "conversationId": "100-200",
      "messages": [
        {
          "messageCreate": {
            "recipientId": "200",
            "reactions": [],
            "urls": [
              {
                "url": "https://t.co/abc",
                "expanded": "https://twitter.com/alice/status/123",
                "display": "twitter.com/alice/status/123"
              },
              {
                "url": "https://t.co/zzz",
                "expanded": "https://example.com/not-a-tweet",
                "display": "example.com"
              }
            ],
            "text": "look https://t.co/abc",
            "mediaUrls": [],
            "senderId": "100",
            "id": "9001",
            "createdAt": "2023-03-01T10:00:00.000Z"
          }
        },
        {
          "messageCreate": {
            "recipientId": "100",
            "urls": [],
            "text": "nice",
            "senderId": "200",
            "id": "9002",
            "createdAt": "2023-03-02T10:00:00.000Z"
          }
        }
      ]
    }
  },
  {
    "dmConversation": {
      "conversationId": "100-300",
      "messages": [
        {
          "joinConversation": { "initiatingUserId": "300" }
        },
        {
          "messageCreate": {
            "recipientId": "300",
            "urls": [
              {
                "url": "https://t.co/def",
                "expanded": "https://x.com/bob/status/456",
                "display": "x.com/bob/status/456"
              },
              {
                "url": "https://t.co/ghi",
                "expanded": "https://x.com/bob/status/789",
                "display": "x.com/bob/status/789"
              }
            ],
            "senderId": "100",
            "id": "9003",
            "createdAt": "2024-01-15T08:30:00.000Z"
          }
        }
      ]
    }
  }
]
"#;

#[test]
fn tweet_url_pattern_accepts_twitter_and_x_hosts() {
    let r = match_tweet_url("https://twitter.com/alice/status/123", "https://t.co/abc").unwrap();
    assert_eq!(r.id, "123");
    assert_eq!(r.user, "alice");
    assert_eq!(r.matched_text, "https://twitter.com/alice/status/123");
    assert_eq!(r.original_url, "https://t.co/abc");

    assert!(match_tweet_url("https://x.com/bob/status/456", "").is_some());
    assert!(match_tweet_url("https://x.com/bob/status/456/photo/1", "").is_none());
    assert!(match_tweet_url("http://twitter.com/alice/status/123", "").is_none());
    assert!(match_tweet_url("https://mobile.twitter.com/alice/status/123", "").is_none());
}

#[test]
fn script_prefix_is_skipped_and_targets_are_in_file_order() {
    let entries = parse_archive(ARCHIVE).unwrap();
    assert_eq!(entries.len(), 2);

    let targets = collect_targets(&entries);
    assert_eq!(targets.count, 3);
    let ids: Vec<_> = targets.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["9001", "9003"]);

    let first = &targets.messages[0];
    assert_eq!(first.conversation_id, "100-200");
    assert_eq!(first.urls.len(), 1);
    assert_eq!(first.urls[0].id, "123");
    assert_eq!(
        first.timestamp,
        Some(Utc.with_ymd_and_hms(2023, 3, 1, 10, 0, 0).unwrap())
    );

    let tweet_ids: Vec<_> = targets.messages[1]
        .urls
        .iter()
        .map(|u| u.id.as_str())
        .collect();
    assert_eq!(tweet_ids, vec!["456", "789"]);
}

#[test]
fn unparsable_created_at_keeps_the_message() {
    let archive = r#"[
  { "dmConversation": { "conversationId": "1-2", "messages": [
    { "messageCreate": { "id": "1", "senderId": "1", "recipientId": "2",
      "createdAt": "2023-01-02T08:00:00.000Z", "urls": [
        { "url": "https://t.co/a", "expanded": "https://twitter.com/alice/status/11" } ] } },
    { "messageCreate": { "id": "2", "senderId": "2", "recipientId": "1",
      "createdAt": "Mon Jan 02 2023", "urls": [
        { "url": "https://t.co/b", "expanded": "https://x.com/bob/status/22" } ] } } ] } }
]"#;
    let targets = collect_targets(&parse_archive(archive).unwrap());

    assert_eq!(targets.count, 2);
    let second = &targets.messages[1];
    assert_eq!(second.id, "2");
    assert_eq!(second.timestamp, None);
    assert_eq!(second.created_at, "Mon Jan 02 2023");
    assert_eq!(second.urls[0].id, "22");
}

#[test]
fn text_without_array_is_rejected() {
    assert!(matches!(
        parse_archive("window.YTD = {}"),
        Err(ArchiveError::MissingArray)
    ));
    assert!(matches!(parse_archive("[{"), Err(ArchiveError::Json(_))));
}

#[test]
fn date_range_drops_messages_and_empty_conversations() {
    let entries = parse_archive(ARCHIVE).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let (kept, stats) = select_by_date_range(entries, Some(since), None, now);
    assert_eq!(stats.conversations_total, 2);
    assert_eq!(stats.conversations_kept, 1);
    // The join event has no timestamp and falls outside any range.
    assert_eq!(stats.messages_total, 4);
    assert_eq!(stats.messages_kept, 1);
    assert_eq!(kept[0].dm_conversation.conversation_id, "100-300");
}

#[test]
fn rendered_selection_parses_back_with_unknown_fields_intact() {
    let entries = parse_archive(ARCHIVE).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let until = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
    let (kept, _) = select_by_date_range(entries, None, Some(until), now);

    let script = render_archive_script(&kept).unwrap();
    assert!(script.starts_with("window.YTD.direct_messages.part0 = ["));
    assert!(script.contains("\"reactions\""));
    assert!(script.contains("\"mediaUrls\""));

    let reparsed = parse_archive(&script).unwrap();
    assert_eq!(reparsed, kept);
}

use chrono::{DateTime, Utc};

use crate::archive::ArchiveEntry;

/// Counts reported after narrowing an archive to a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionStats {
    pub conversations_kept: usize,
    pub conversations_total: usize,
    pub messages_kept: usize,
    pub messages_total: usize,
}

/// Keep messages created within `[since, until]`; drop conversations left empty.
///
/// `since` defaults to the Unix epoch and `until` to `now`. Entries without a
/// parsable `createdAt` are treated as outside the range.
pub fn select_by_date_range(
    entries: Vec<ArchiveEntry>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Vec<ArchiveEntry>, SelectionStats) {
    let since = since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let until = until.unwrap_or(now);
    let mut stats = SelectionStats {
        conversations_total: entries.len(),
        ..SelectionStats::default()
    };

    let kept: Vec<_> = entries
        .into_iter()
        .filter_map(|mut entry| {
            let messages = std::mem::take(&mut entry.dm_conversation.messages);
            stats.messages_total += messages.len();
            entry.dm_conversation.messages = messages
                .into_iter()
                .filter(|m| {
                    m.message_create
                        .as_ref()
                        .and_then(|mc| mc.timestamp().ok())
                        .is_some_and(|at| since <= at && at <= until)
                })
                .collect();
            stats.messages_kept += entry.dm_conversation.messages.len();
            (!entry.dm_conversation.messages.is_empty()).then_some(entry)
        })
        .collect();

    stats.conversations_kept = kept.len();
    (kept, stats)
}

/// Render entries in the export's script form so the result can be fed back in.
pub fn render_archive_script(entries: &[ArchiveEntry]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string_pretty(entries)?;
    Ok(format!("window.YTD.direct_messages.part0 = {json}\n"))
}

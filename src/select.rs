use chrono::{DateTime, Utc};

use crate::feed::FeedItem;

/// Pick the next item to deliver: the chronologically oldest entry strictly
/// newer than the watermark. Items arrive newest first, so the scan runs
/// back to front; posting one item per cycle this way replays a backlog in
/// publication order across successive cycles.
///
/// An item stamped exactly at the watermark never qualifies; that is the
/// item the watermark was advanced for.
pub fn next_unposted(
  items: &[FeedItem],
  watermark: DateTime<Utc>,
) -> Option<&FeedItem> {
  items.iter().rev().find(|item| item.published_at > watermark)
}

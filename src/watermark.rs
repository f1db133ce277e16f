use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::util::date::parse_date;

/// File-backed timestamp marking the last item handed to the webhook.
///
/// The file holds a single timestamp string and is overwritten on every
/// update. An absent or unreadable file defaults to the current time, so a
/// first run never replays the feed's backlog. The value only ever moves
/// forward: the selector hands out items strictly newer than it.
pub struct Watermark {
  path: PathBuf,
  current: DateTime<Utc>,
}

impl Watermark {
  pub fn load(path: PathBuf) -> Self {
    let current = match fs::read_to_string(&path) {
      Ok(raw) => match parse_date(&raw) {
        Some(date) => date,
        None => {
          warn!("unparseable timestamp in {}, starting from now", path.display());
          Utc::now()
        }
      },
      Err(e) => {
        if e.kind() != io::ErrorKind::NotFound {
          warn!("could not read {}: {e}, starting from now", path.display());
        }
        Utc::now()
      }
    };

    Self { path, current }
  }

  pub fn last(&self) -> DateTime<Utc> {
    self.current
  }

  /// Advance and persist. The in-memory value moves even if the write
  /// fails; the failure only costs replay protection across a restart.
  pub fn advance(&mut self, to: DateTime<Utc>) {
    self.current = to;

    // same shape the embed timestamps use: RFC3339, millisecond precision, Z
    let serialized = to.to_rfc3339_opts(SecondsFormat::Millis, true);
    if let Err(e) = fs::write(&self.path, serialized) {
      warn!("failed to persist watermark to {}: {e}", self.path.display());
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_missing_file_defaults_to_now() {
    let dir = tempfile::tempdir().unwrap();
    let before = Utc::now();
    let watermark = Watermark::load(dir.path().join("lastpost"));
    assert!(watermark.last() >= before);
    assert!(watermark.last() <= Utc::now());
  }

  #[test]
  fn test_advance_persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lastpost");
    let stamp = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();

    let mut watermark = Watermark::load(path.clone());
    watermark.advance(stamp);

    assert_eq!(fs::read_to_string(&path).unwrap(), "2023-01-02T03:04:05.000Z");

    let reloaded = Watermark::load(path);
    assert_eq!(reloaded.last(), stamp);
  }

  #[test]
  fn test_garbage_file_defaults_to_now() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lastpost");
    fs::write(&path, "definitely not a timestamp").unwrap();

    let before = Utc::now();
    let watermark = Watermark::load(path);
    assert!(watermark.last() >= before);
  }
}

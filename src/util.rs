pub mod date;

pub const USER_AGENT: &str =
  concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Bad trim pattern")]
  Regex(#[from] regex::Error),
}

/// Failure retrieving or parsing the remote feed. A cycle hitting one of
/// these is skipped and retried on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error("Feed request failed {0:?}")]
  Http(#[from] reqwest::Error),

  #[error("Feed responded with HTTP status {0}")]
  Status(reqwest::StatusCode),

  #[error("RSS parsing error {0:?}")]
  Rss(#[from] rss::Error),

  #[error("Atom parsing error {0:?}")]
  Atom(#[from] atom_syndication::Error),
}

/// Transport-level failure posting to the webhook. Non-2xx responses are
/// not errors at this layer; the delivery engine logs their status instead.
#[derive(Debug, thiserror::Error)]
#[error("Webhook request failed {0:?}")]
pub struct DeliveryError(#[from] pub reqwest::Error);

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Reqwest client error {0:?}")]
  Reqwest(#[from] reqwest::Error),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Fetch(#[from] FetchError),
}

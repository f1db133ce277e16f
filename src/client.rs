use std::time::Duration;

use crate::util::{Result, USER_AGENT};

/// Settings for the single HTTP client shared between the feed fetch and
/// the webhook posts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  timeout: Duration,
}

impl ClientConfig {
  pub fn with_timeout(secs: u64) -> Self {
    Self {
      timeout: Duration::from_secs(secs),
    }
  }

  pub fn build(&self) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .timeout(self.timeout);

    Ok(builder.build()?)
  }
}

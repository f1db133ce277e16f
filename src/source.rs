use url::Url;

use crate::feed::Feed;
use crate::util::FetchError;

/// Fetches and parses the remote feed.
pub struct FeedSource {
  url: Url,
  client: reqwest::Client,
}

impl FeedSource {
  pub fn new(url: Url, client: reqwest::Client) -> Self {
    Self { url, client }
  }

  pub async fn fetch(&self) -> Result<Feed, FetchError> {
    let response = self.client.get(self.url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status(status));
    }

    let body = response.bytes().await?;
    Feed::from_xml_content(&body)
  }
}

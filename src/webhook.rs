use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::util::DeliveryError;
use crate::watermark::Watermark;

/// Optional webhook dressing taken from the configuration. Anything left
/// `None` stays out of the posted JSON entirely.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub username: Option<String>,
  pub avatar: Option<Url>,
  pub content: Option<String>,
  pub footer_icon: Option<Url>,
  pub color: Option<u32>,
}

/// Everything needed to announce one feed item.
pub struct Announcement<'a> {
  pub title: String,
  pub url: &'a str,
  pub published_at: DateTime<Utc>,
  pub footer_text: String,
  pub summary: &'a str,
  pub images: &'a [Option<String>],
}

#[derive(Serialize, Debug)]
struct Payload {
  #[serde(skip_serializing_if = "Option::is_none")]
  username: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  avatar_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  content: Option<String>,
  embeds: Vec<Embed>,
}

#[derive(Serialize, Debug)]
struct Embed {
  url: String,
  timestamp: String,
  title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  description: Option<String>,
  footer: Footer,
  #[serde(skip_serializing_if = "Option::is_none")]
  color: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  image: Option<EmbedImage>,
}

#[derive(Serialize, Debug)]
struct Footer {
  text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  icon_url: Option<String>,
}

#[derive(Serialize, Debug)]
struct EmbedImage {
  url: String,
}

pub struct Webhook {
  url: Url,
  client: reqwest::Client,
  overrides: Overrides,
}

impl Webhook {
  pub fn new(url: Url, client: reqwest::Client, overrides: Overrides) -> Self {
    Self {
      url,
      client,
      overrides,
    }
  }

  /// Deliver one item: the primary embed first, then one payload per
  /// remaining image slot, each POST awaited before the next starts. The
  /// endpoint is a single webhook URL with per-request rate limits and
  /// one-image embeds, hence the sequential fan-out.
  ///
  /// The watermark advances as soon as the primary attempt has an outcome,
  /// delivered or not; retrying a permanently broken item every cycle
  /// would hammer both endpoints. Image payloads never move it.
  pub async fn deliver(
    &self,
    announcement: &Announcement<'_>,
    watermark: &mut Watermark,
  ) {
    let title = &announcement.title;

    match self.post(&self.primary(announcement)).await {
      Ok(status) if status.is_success() => {
        info!("[{}] posted {title:?}", status.as_u16());
      }
      Ok(status) => {
        warn!("[{}] could not post {title:?}", status.as_u16());
      }
      Err(e) => warn!("could not post {title:?}: {e}"),
    }

    watermark.advance(announcement.published_at);

    for (index, slot) in announcement.images.iter().enumerate().skip(1) {
      let number = index + 1;
      if slot.is_none() {
        warn!("image #{number} of {title:?} has no resolvable URL");
      }

      let payload = self.follow_up(announcement, number, slot.clone());
      match self.post(&payload).await {
        Ok(status) if status.is_success() => {
          info!("[{}] posted image #{number} for {title:?}", status.as_u16());
        }
        Ok(status) => {
          warn!(
            "[{}] could not post image #{number} for {title:?}",
            status.as_u16()
          );
        }
        Err(e) => warn!("could not post image #{number} for {title:?}: {e}"),
      }
    }
  }

  async fn post(&self, payload: &Payload) -> Result<StatusCode, DeliveryError> {
    let response = self
      .client
      .post(self.url.clone())
      .json(payload)
      .send()
      .await?;

    Ok(response.status())
  }

  /// Main summary embed, carrying the first image slot when one resolved.
  fn primary(&self, announcement: &Announcement<'_>) -> Payload {
    let description =
      primary_description(announcement.summary, announcement.url);
    let image = announcement.images.first().cloned().flatten();

    self.payload(announcement, Some(description), None, image)
  }

  /// Image-only embed: no description, message content names the slot.
  fn follow_up(
    &self,
    announcement: &Announcement<'_>,
    number: usize,
    image: Option<String>,
  ) -> Payload {
    self.payload(announcement, None, Some(format!("Image #{number}")), image)
  }

  fn payload(
    &self,
    announcement: &Announcement<'_>,
    description: Option<String>,
    content: Option<String>,
    image: Option<String>,
  ) -> Payload {
    Payload {
      username: self.overrides.username.clone(),
      avatar_url: self.overrides.avatar.as_ref().map(Url::to_string),
      content: content.or_else(|| self.overrides.content.clone()),
      embeds: vec![Embed {
        url: announcement.url.to_string(),
        timestamp: announcement
          .published_at
          .to_rfc3339_opts(SecondsFormat::Millis, true),
        title: announcement.title.clone(),
        description,
        footer: Footer {
          text: announcement.footer_text.clone(),
          icon_url: self.overrides.footer_icon.as_ref().map(Url::to_string),
        },
        color: self.overrides.color,
        image: image.map(|url| EmbedImage { url }),
      }],
    }
  }
}

fn primary_description(summary: &str, url: &str) -> String {
  if summary.is_empty() {
    format!("**[Continue reading →]({url})**")
  } else {
    format!("{summary} ...\n**[Continue reading →]({url})**")
  }
}

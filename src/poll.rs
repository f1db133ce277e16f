use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cli::FeedConfig;
use crate::client::ClientConfig;
use crate::digest::{self, Digester};
use crate::select;
use crate::source::FeedSource;
use crate::util::{FetchError, Result};
use crate::watermark::Watermark;
use crate::webhook::{Announcement, Overrides, Webhook};

const DEFAULT_INTERVAL_MS: u64 = 60_000;

/// One feed-to-webhook pipeline, driven cycle by cycle.
pub struct Relay {
  source: FeedSource,
  digester: Digester,
  webhook: Webhook,
  watermark: Watermark,
  prepend: Option<String>,
  footer_text: Option<String>,
  interval: Duration,
}

impl Relay {
  pub fn new(config: FeedConfig) -> Result<Self> {
    let client = ClientConfig::with_timeout(config.timeout).build()?;
    let digester = Digester::new(config.trim_regex.as_deref())?;
    let watermark = Watermark::load(config.lastpost_file);

    let interval = match config.interval {
      Some(millis) => Duration::from_millis(millis),
      None => {
        info!("no interval set, defaulting to 1 minute");
        Duration::from_millis(DEFAULT_INTERVAL_MS)
      }
    };

    let overrides = Overrides {
      username: config.username,
      avatar: config.avatar,
      content: config.content,
      footer_icon: config.footer_icon,
      color: config.color,
    };
    let webhook = Webhook::new(config.webhook, client.clone(), overrides);

    Ok(Self {
      source: FeedSource::new(config.feed, client),
      digester,
      webhook,
      watermark,
      prepend: config.prepend,
      footer_text: config.footer_text,
      interval,
    })
  }

  /// Poll forever. The first cycle runs immediately; afterwards one cycle
  /// per interval tick. Cycles are awaited inline, so a slow cycle can
  /// never overlap the next one and race it for the watermark; ticks
  /// falling due mid-cycle are skipped, not queued.
  pub async fn watch(mut self) -> Result<()> {
    let mut ticker = time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      ticker.tick().await;

      if let Err(e) = self.cycle().await {
        warn!("feed fetch failed: {e}");
      }
    }
  }

  /// Run exactly one cycle, surfacing fetch errors to the caller.
  pub async fn run_once(&mut self) -> Result<()> {
    self.cycle().await?;
    Ok(())
  }

  async fn cycle(&mut self) -> Result<(), FetchError> {
    let feed = self.source.fetch().await?;
    let items = feed.items();

    let Some(item) = select::next_unposted(&items, self.watermark.last())
    else {
      debug!("no new items since {}", self.watermark.last());
      return Ok(());
    };

    info!("attempting to post {:?}", item.title);
    let rendered = self.digester.render(&item.body, &item.url);

    let announcement = Announcement {
      title: digest::format_title(
        self.prepend.as_deref(),
        feed.title(),
        &item.title,
      ),
      url: &item.url,
      published_at: item.published_at,
      footer_text: self
        .footer_text
        .clone()
        .or_else(|| item.author.clone())
        .unwrap_or_default(),
      summary: &rendered.summary,
      images: &rendered.images,
    };

    self.webhook.deliver(&announcement, &mut self.watermark).await;
    Ok(())
  }
}

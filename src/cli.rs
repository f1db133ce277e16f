use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::poll::Relay;
use crate::util::Result;

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
  #[clap(subcommand)]
  subcmd: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
  /// Poll the feed on an interval, delivering new items as they appear
  Watch(FeedConfig),
  /// Run a single poll cycle and exit
  Once(FeedConfig),
}

/// Every knob doubles as an environment variable, so a bare `.env` file is
/// enough to run without any flags.
#[derive(clap::Args, Clone, Debug)]
pub struct FeedConfig {
  /// URL of the RSS/Atom feed to poll
  #[clap(long, env = "FEED")]
  pub feed: Url,

  /// Incoming webhook URL that receives the embeds
  #[clap(long, env = "WEBHOOK")]
  pub webhook: Url,

  /// Poll interval in milliseconds
  #[clap(long, env = "INTERVAL")]
  pub interval: Option<u64>,

  /// Embed footer text; defaults to the item author
  #[clap(long, env = "FOOTER_TEXT")]
  pub footer_text: Option<String>,

  /// Display name the webhook posts under
  #[clap(long, env = "USERNAME")]
  pub username: Option<String>,

  /// Avatar URL the webhook posts under
  #[clap(long, env = "AVATAR")]
  pub avatar: Option<Url>,

  /// Literal message content sent alongside the primary embed
  #[clap(long, env = "CONTENT")]
  pub content: Option<String>,

  /// Footer icon URL
  #[clap(long, env = "FOOTER_ICON")]
  pub footer_icon: Option<Url>,

  /// Embed accent color, as a decimal integer
  #[clap(long, env = "COLOR")]
  pub color: Option<u32>,

  /// Title prefix; the literal `{FEEDTITLE}` prefixes the feed title
  #[clap(long, env = "PREPEND")]
  pub prepend: Option<String>,

  /// Pattern whose first match is cut from the extracted text
  /// (`.` matches newlines)
  #[clap(long, env = "TRIM_REGEX")]
  pub trim_regex: Option<String>,

  /// File the last posted timestamp is persisted to
  #[clap(long, env = "LASTPOST_FILE", default_value = "lastpost")]
  pub lastpost_file: PathBuf,

  /// HTTP request timeout in seconds
  #[clap(long, env = "TIMEOUT", default_value_t = 10)]
  pub timeout: u64,
}

impl Cli {
  pub async fn run(self) -> Result<()> {
    match self.subcmd {
      SubCommand::Watch(config) => Relay::new(config)?.watch().await,
      SubCommand::Once(config) => Relay::new(config)?.run_once().await,
    }
  }
}

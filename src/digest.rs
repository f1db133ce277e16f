use ego_tree::iter::Edge;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use scraper::node::Text;
use scraper::{Html, Node, Selector};

use crate::util::ConfigError;

lazy_static! {
  static ref EMPHASIS_TAGS: Regex =
    Regex::new(r"<(em|i)>\s*|\s*</(em|i)>").expect("bad regex");
  static ref CHAPTER_NAV: Regex =
    Regex::new(r"(?i)(next|prev(ious)?) chapter").expect("bad regex");
  static ref NEWLINE_RUNS: Regex = Regex::new(r"\n+").expect("bad regex");
  static ref SRCSET_DESCRIPTORS: Regex =
    Regex::new(r"\s+(\d+[\w,]+)").expect("bad regex");
  static ref ANCHORS: Selector =
    Selector::parse("a[href]").expect("bad selector");
  static ref IMAGES: Selector = Selector::parse("img").expect("bad selector");
}

/// Elements whose end acts as a line break when flattening to text.
const BLOCK_TAGS: &[&str] = &[
  "article", "blockquote", "br", "div", "figcaption", "figure", "footer",
  "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
  "section", "table", "tr", "ul",
];

/// Character budget shared between the summary and the item link that gets
/// appended after it, so the whole description stays embed-sized.
const SUMMARY_BUDGET: usize = 800;

/// Prepend value asking for the feed title as the title prefix.
pub const FEED_TITLE_SENTINEL: &str = "{FEEDTITLE}";

/// The rendered form of one feed item body.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
  /// Markdown-safe plain text, truncated on a word boundary.
  pub summary: String,
  /// Candidate images in document order. A slot is `None` when the `<img>`
  /// carried no usable `srcset` or `src`; such slots still take part in
  /// the delivery fan-out.
  pub images: Vec<Option<String>>,
}

pub struct Digester {
  trim: Option<Regex>,
}

impl Digester {
  /// The trim pattern is compiled with `.` matching newlines so it can span
  /// block boundaries in the flattened text.
  pub fn new(trim_pattern: Option<&str>) -> Result<Self, ConfigError> {
    let trim = trim_pattern
      .map(|pattern| {
        RegexBuilder::new(pattern).dot_matches_new_line(true).build()
      })
      .transpose()?;

    Ok(Self { trim })
  }

  /// Render an item body into a summary and its image candidates. The step
  /// order is load bearing: links must be rewritten before the tree is
  /// flattened, truncation must happen before marker repair.
  pub fn render(&self, body: &str, url: &str) -> Digest {
    let body = EMPHASIS_TAGS.replace_all(body, "*");
    let mut html = Html::parse_fragment(&body);

    rewrite_links(&mut html);
    let images = extract_images(&html);

    let mut text = flatten_to_text(&html);
    if let Some(trim) = &self.trim {
      text = trim.replace(&text, "").trim().to_string();
    }

    let budget = SUMMARY_BUDGET.saturating_sub(url.chars().count());
    let summary = repair_markers(truncate_at_word(&text, budget));

    Digest { summary, images }
  }
}

/// Title shown on the embed. No prepend rule keeps the item title verbatim;
/// the `{FEEDTITLE}` sentinel asks for the feed title as prefix; any other
/// value is used as the prefix itself.
pub fn format_title(
  prepend: Option<&str>,
  feed_title: &str,
  item_title: &str,
) -> String {
  match prepend {
    None => item_title.to_string(),
    Some(FEED_TITLE_SENTINEL) => format!("{feed_title} — {item_title}"),
    Some(prefix) => format!("{prefix} {item_title}"),
  }
}

/// Replace each anchor's contents with a bold markdown link. Anchors whose
/// visible text is chapter navigation ("Next Chapter", "Prev(ious)
/// Chapter") are left alone so they do not clutter the summary.
fn rewrite_links(html: &mut Html) {
  let anchors: Vec<(ego_tree::NodeId, String, String)> = html
    .select(&ANCHORS)
    .map(|anchor| {
      let text = anchor.text().collect::<String>();
      let href =
        anchor.value().attr("href").unwrap_or_default().to_string();
      (anchor.id(), text, href)
    })
    .collect();

  for (node_id, text, href) in anchors {
    if CHAPTER_NAV.is_match(&text) {
      continue;
    }

    let stripped = text.trim_matches(|c| matches!(c, '[' | ']' | '(' | ')'));
    let markdown = format!("**[{stripped}]({href})**");

    let mut node = html.tree.get_mut(node_id).expect("unreachable");
    while let Some(mut child) = node.first_child() {
      child.detach();
    }
    node.append(Node::Text(Text {
      text: markdown.into(),
    }));
  }
}

/// Flatten the tree to text. Tag boundaries vanish except for block-level
/// elements, which end their line.
fn flatten_to_text(html: &Html) -> String {
  let mut out = String::new();

  for edge in html.root_element().traverse() {
    match edge {
      Edge::Open(node) => {
        if let Node::Text(text) = node.value() {
          out.push_str(text);
        }
      }
      Edge::Close(node) => {
        if let Node::Element(element) = node.value() {
          if BLOCK_TAGS.contains(&element.name()) {
            out.push('\n');
          }
        }
      }
    }
  }

  out
}

/// Clip to `limit` characters, then drop the final (possibly cut-off) word
/// so the result never ends mid-word. Newline runs collapse to exactly one
/// blank line.
fn truncate_at_word(text: &str, limit: usize) -> String {
  let clipped: String = text.chars().take(limit).collect();
  let mut words: Vec<&str> = clipped.trim().split(' ').collect();
  words.pop();

  let joined = words.join(" ");
  NEWLINE_RUNS.replace_all(&joined, "\n\n").into_owned()
}

/// A truncated summary can cut an emphasis pair in half; an unpaired marker
/// would format everything after it as italic on the receiving end.
fn repair_markers(text: String) -> String {
  if text.matches('*').count() % 2 == 0 {
    return text;
  }

  format!("{}*", text.trim_end())
}

/// Candidate images in document order. `srcset` entries conventionally list
/// the largest rendition last, so after stripping the resolution
/// descriptors the last candidate is the one to keep.
fn extract_images(html: &Html) -> Vec<Option<String>> {
  html
    .select(&IMAGES)
    .map(|image| match image.value().attr("srcset") {
      Some(srcset) => SRCSET_DESCRIPTORS
        .replace_all(srcset, "")
        .split_whitespace()
        .last()
        .map(str::to_owned),
      None => image.value().attr("src").map(str::to_owned),
    })
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;

  fn digester() -> Digester {
    Digester::new(None).unwrap()
  }

  #[test]
  fn test_emphasis_becomes_markers() {
    let digest = digester()
      .render("<p>Hello <em>world</em> out there</p>", "https://x.co/1");
    assert_eq!(digest.summary, "Hello *world* out");
  }

  #[test]
  fn test_italic_tag_with_surrounding_whitespace() {
    let digest =
      digester().render("<p>a <i> b </i> c tail</p>", "https://x.co/1");
    assert_eq!(digest.summary, "a *b* c");
  }

  #[test]
  fn test_link_rewritten_to_bold_markdown() {
    let mut html = Html::parse_fragment(
      r#"<p><a href="http://x/12">Chapter 12: Awakening</a></p>"#,
    );
    rewrite_links(&mut html);

    let text = flatten_to_text(&html);
    assert_eq!(text, "**[Chapter 12: Awakening](http://x/12)**\n");
  }

  #[test]
  fn test_navigation_links_left_alone() {
    for nav in ["Next Chapter", "Previous Chapter", "PREV CHAPTER"] {
      let mut html = Html::parse_fragment(&format!(
        r#"<p><a href="http://x/13">{nav}</a></p>"#
      ));
      rewrite_links(&mut html);

      let text = flatten_to_text(&html);
      assert_eq!(text, format!("{nav}\n"), "{nav:?} must not be rewritten");
    }
  }

  #[test]
  fn test_link_text_brackets_stripped() {
    let mut html = Html::parse_fragment(
      r#"<p><a href="http://x/5">[Chapter 5]</a></p>"#,
    );
    rewrite_links(&mut html);

    let text = flatten_to_text(&html);
    assert_eq!(text, "**[Chapter 5](http://x/5)**\n");
  }

  #[test]
  fn test_block_boundaries_become_blank_lines() {
    let digest = digester().render(
      "<p>first para here</p><p>second para here</p>",
      "https://x.co/1",
    );
    assert_eq!(digest.summary, "first para here\n\nsecond para");
  }

  #[test]
  fn test_trim_pattern_spans_newlines() {
    let digester =
      Digester::new(Some("A note:.*?ends here\\.")).unwrap();
    let digest = digester.render(
      "<p>A note: this spans</p><p>lines and ends here.</p><p>Real content stays put</p>",
      "https://x.co/1",
    );
    assert_eq!(digest.summary, "Real content stays");
  }

  #[test]
  fn test_bad_trim_pattern_is_config_error() {
    assert!(matches!(
      Digester::new(Some("(unclosed")),
      Err(ConfigError::Regex(_))
    ));
  }

  #[test]
  fn test_truncation_law_and_word_boundary() {
    let url = "https://example.com/a-rather-long-chapter-permalink";
    let body = format!("<p>{}</p>", "word ".repeat(400));

    let digest = digester().render(&body, url);
    assert!(digest.summary.chars().count() <= 800 - url.chars().count());
    assert!(digest.summary.ends_with("word"));
  }

  #[test]
  fn test_truncated_emphasis_is_repaired() {
    let digest =
      digester().render("<p><em>one two three four</em></p>", "https://x.co");
    assert_eq!(digest.summary, "*one two three*");
  }

  #[test]
  fn test_marker_count_never_odd() {
    let url = "https://x.co";
    for body in [
      "<p><em>a b c</em></p>",
      "<p>a * b * c * d</p>",
      "<p><em>one</em> two <em>three four five</em></p>",
    ] {
      let digest = digester().render(body, url);
      assert_eq!(digest.summary.matches('*').count() % 2, 0, "{body}");
    }
  }

  #[test]
  fn test_url_longer_than_budget() {
    let url = "x".repeat(900);
    let digest = digester().render("<p>some words here</p>", &url);
    assert_eq!(digest.summary, "");
  }

  #[test]
  fn test_image_extraction() {
    let digest = digester().render(
      r#"<p><img srcset="a.jpg 480w, b.jpg 960w"> and <img src="c.jpg"> and <img alt="bare"></p>"#,
      "https://x.co/1",
    );
    assert_eq!(
      digest.images,
      vec![Some("b.jpg".to_string()), Some("c.jpg".to_string()), None]
    );
  }

  #[test]
  fn test_srcset_preferred_over_src() {
    let digest = digester().render(
      r#"<img srcset="small.png 1x, big.png 2x" src="fallback.png">"#,
      "https://x.co/1",
    );
    assert_eq!(digest.images, vec![Some("big.png".to_string())]);
  }

  #[test]
  fn test_format_title() {
    assert_eq!(format_title(None, "Feed", "Item"), "Item");
    assert_eq!(
      format_title(Some(FEED_TITLE_SENTINEL), "Feed", "Item"),
      "Feed — Item"
    );
    assert_eq!(format_title(Some("[New]"), "Feed", "Item"), "[New] Item");
  }
}

use atom_syndication as atom;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::util::date::parse_date;
use crate::util::FetchError;

/// A parsed feed in either supported syndication format.
#[derive(Debug, Clone)]
pub enum Feed {
  Rss(rss::Channel),
  Atom(atom::Feed),
}

/// One feed entry flattened to the fields the relay needs. Order within a
/// feed is the feed-declared order, newest first by convention.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
  pub author: Option<String>,
  pub title: String,
  pub url: String,
  /// Raw HTML body as published.
  pub body: String,
  pub published_at: DateTime<Utc>,
}

impl Feed {
  pub fn from_rss_content(content: &[u8]) -> Result<Self, FetchError> {
    let cursor = std::io::Cursor::new(content);
    let channel = rss::Channel::read_from(cursor)?;
    Ok(Feed::Rss(channel))
  }

  pub fn from_atom_content(content: &[u8]) -> Result<Self, FetchError> {
    let cursor = std::io::Cursor::new(content);
    let feed = atom::Feed::read_from(cursor)?;
    Ok(Feed::Atom(feed))
  }

  pub fn from_xml_content(content: &[u8]) -> Result<Self, FetchError> {
    Feed::from_rss_content(content)
      .or_else(|_| Feed::from_atom_content(content))
  }

  pub fn title(&self) -> &str {
    match self {
      Feed::Rss(channel) => &channel.title,
      Feed::Atom(feed) => feed.title.as_str(),
    }
  }

  /// Flatten to `FeedItem`s, preserving feed order. Entries without a link
  /// or a parseable publish date are dropped: they can be neither compared
  /// against the watermark nor linked from an embed.
  pub fn items(&self) -> Vec<FeedItem> {
    match self {
      Feed::Rss(channel) => {
        channel.items.iter().filter_map(rss_item).collect()
      }
      Feed::Atom(feed) => feed.entries.iter().filter_map(atom_entry).collect(),
    }
  }
}

fn rss_item(item: &rss::Item) -> Option<FeedItem> {
  let dc = item.dublin_core_ext.as_ref();

  let Some(url) = item.link.clone() else {
    debug!("dropping item without link: {:?}", item.title);
    return None;
  };

  let published_at = item
    .pub_date
    .as_deref()
    .or_else(|| dc.and_then(|dc| dc.dates.first().map(String::as_str)))
    .and_then(parse_date);
  let Some(published_at) = published_at else {
    debug!("dropping item without publish date: {:?}", item.title);
    return None;
  };

  // rss-parser style field preference: dc:creator over author,
  // content:encoded over description
  let author = dc
    .and_then(|dc| dc.creators.first().cloned())
    .or_else(|| item.author.clone());
  let body = item
    .content
    .clone()
    .or_else(|| item.description.clone())
    .unwrap_or_default();

  Some(FeedItem {
    author,
    title: item.title.clone().unwrap_or_default(),
    url,
    body,
    published_at,
  })
}

fn atom_entry(entry: &atom::Entry) -> Option<FeedItem> {
  let link = entry
    .links
    .iter()
    .find(|link| link.rel == "alternate")
    .or_else(|| entry.links.first());
  let Some(link) = link else {
    debug!("dropping entry without link: {:?}", entry.title.value);
    return None;
  };

  let published_at = entry.published.unwrap_or(entry.updated);
  let body = entry
    .content
    .as_ref()
    .and_then(|content| content.value.clone())
    .or_else(|| entry.summary.as_ref().map(|summary| summary.value.clone()))
    .unwrap_or_default();

  Some(FeedItem {
    author: entry.authors.first().map(|person| person.name.clone()),
    title: entry.title.value.clone(),
    url: link.href.clone(),
    body,
    published_at: published_at.with_timezone(&Utc),
  })
}

#[cfg(test)]
mod test {
  use super::*;
  use chrono::TimeZone;

  const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example Serial</title>
    <link>https://example.com</link>
    <description>A web serial</description>
    <item>
      <title>Chapter 2</title>
      <link>https://example.com/chapter-2</link>
      <dc:creator>An Author</dc:creator>
      <pubDate>Tue, 03 Jan 2023 00:00:00 GMT</pubDate>
      <content:encoded><![CDATA[<p>Second chapter</p>]]></content:encoded>
    </item>
    <item>
      <title>Chapter 1</title>
      <link>https://example.com/chapter-1</link>
      <pubDate>Mon, 02 Jan 2023 00:00:00 GMT</pubDate>
      <description>&lt;p&gt;First chapter&lt;/p&gt;</description>
    </item>
    <item>
      <title>No date, never selectable</title>
      <link>https://example.com/undated</link>
    </item>
  </channel>
</rss>"#;

  const ATOM_FIXTURE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <id>urn:example</id>
  <updated>2023-01-03T00:00:00Z</updated>
  <entry>
    <title>Entry</title>
    <id>urn:example:1</id>
    <link rel="alternate" href="https://example.com/entry"/>
    <author><name>Atom Author</name></author>
    <updated>2023-01-03T00:00:00Z</updated>
    <published>2023-01-02T00:00:00Z</published>
    <summary>&lt;p&gt;Summary body&lt;/p&gt;</summary>
  </entry>
</feed>"#;

  #[test]
  fn test_rss_flattening() {
    let feed = Feed::from_xml_content(RSS_FIXTURE.as_bytes()).unwrap();
    assert_eq!(feed.title(), "Example Serial");

    let items = feed.items();
    assert_eq!(items.len(), 2, "undated item must be dropped");

    assert_eq!(items[0].title, "Chapter 2");
    assert_eq!(items[0].author.as_deref(), Some("An Author"));
    assert_eq!(items[0].url, "https://example.com/chapter-2");
    assert_eq!(items[0].body, "<p>Second chapter</p>");
    assert_eq!(
      items[0].published_at,
      Utc.with_ymd_and_hms(2023, 1, 3, 0, 0, 0).unwrap()
    );

    // feed-declared order is preserved: newest first
    assert_eq!(items[1].title, "Chapter 1");
    assert_eq!(items[1].author, None);
    assert_eq!(items[1].body, "<p>First chapter</p>");
  }

  #[test]
  fn test_atom_flattening() {
    let feed = Feed::from_xml_content(ATOM_FIXTURE.as_bytes()).unwrap();
    assert_eq!(feed.title(), "Example Atom");

    let items = feed.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].author.as_deref(), Some("Atom Author"));
    assert_eq!(items[0].url, "https://example.com/entry");
    assert_eq!(items[0].body, "<p>Summary body</p>");
    assert_eq!(
      items[0].published_at,
      Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap(),
      "published wins over updated"
    );
  }

  #[test]
  fn test_unparseable_content() {
    assert!(Feed::from_xml_content(b"not xml at all").is_err());
  }
}

//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::post::PostMeta;
use crate::value::post_url;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Person};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, ParseError, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use url::{ParseError as UrlParseError, Url};

/// The feed's file name in the output directory.
pub const FEED_PATH: &str = "feed.atom";

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub author: Option<&'a Author>,

    /// The absolute site URL, ending in a slash. Entry URLs are joined onto
    /// it.
    pub site_url: &'a Url,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// posts (newest first) and writes the result to a [`std::io::Write`].
pub fn write_feed<W: Write>(config: &FeedConfig, posts: &[PostMeta], w: W) -> Result<()> {
    feed(config, posts)?.write_to(w)?;
    Ok(())
}

fn feed(config: &FeedConfig, posts: &[PostMeta]) -> Result<Feed> {
    let entries = posts
        .iter()
        .map(|post| entry(config, post))
        .collect::<Result<Vec<Entry>>>()?;

    // The newest post dates the feed, so rebuilding unchanged posts yields an
    // identical file.
    let updated = match entries.first() {
        Some(entry) => entry.updated,
        None => Utc::now().into(),
    };

    Ok(Feed {
        title: config.title.into(),
        id: config.site_url.to_string(),
        updated,
        authors: author_to_people(config.author),
        links: vec![
            Link {
                href: config.site_url.to_string(),
                rel: "alternate".to_owned(),
                ..Default::default()
            },
            Link {
                href: config.site_url.join(FEED_PATH)?.to_string(),
                rel: "self".to_owned(),
                ..Default::default()
            },
        ],
        entries,
        ..Default::default()
    })
}

fn entry(config: &FeedConfig, post: &PostMeta) -> Result<Entry> {
    let url = config.site_url.join(&post_url("", &post.slug))?.to_string();
    let date = post_date(&post.date)?;
    Ok(Entry {
        id: url.clone(),
        title: post.title.as_str().into(),
        updated: date,
        published: Some(date),
        authors: author_to_people(config.author),
        links: vec![Link {
            href: url,
            rel: "alternate".to_owned(),
            ..Default::default()
        }],
        summary: post.description.as_deref().map(Into::into),
        categories: post
            .tags
            .iter()
            .map(|tag| Category {
                term: tag.clone(),
                scheme: None,
                label: None,
            })
            .collect(),
        ..Default::default()
    })
}

/// Converts a `YYYY-MM-DD` post date into midnight UTC on that day.
fn post_date(date: &str) -> std::result::Result<DateTime<FixedOffset>, ParseError> {
    let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d")?.and_time(NaiveTime::MIN);
    Ok(Utc.from_utc_datetime(&naive).into())
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![Person {
            name: author.name.clone(),
            email: author.email.clone(),
            uri: None,
        }],
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants inlude I/O, Atom, URL and
/// date parsing issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when there is an issue parsing a post's date.
    DateTimeParse(ParseError),

    /// Returned when an entry URL can't be built from the site URL.
    UrlParse(UrlParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::DateTimeParse(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::DateTimeParse(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: ParseError) -> Error {
        Error::DateTimeParse(err)
    }
}

impl From<UrlParseError> for Error {
    fn from(err: UrlParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;

    fn post(slug: &str, date: &str) -> PostMeta {
        PostMeta {
            slug: slug.to_owned(),
            date: date.to_owned(),
            title: format!("Title of {}", slug),
            tags: vec!["rust".to_owned()].into_iter().collect::<BTreeSet<_>>(),
            description: Some("About it".to_owned()),
            image: None,
        }
    }

    #[test]
    fn test_write_feed() -> Result<()> {
        let site_url = Url::parse("https://blog.example.org/").map_err(Error::UrlParse)?;
        let author = Author {
            name: "Ada".to_owned(),
            email: None,
        };
        let config = FeedConfig {
            title: "Blog",
            author: Some(&author),
            site_url: &site_url,
        };
        let mut out = Vec::new();
        write_feed(
            &config,
            &[post("newer", "2021-02-01"), post("older", "2021-01-01")],
            &mut out,
        )?;

        let xml = String::from_utf8_lossy(&out);
        assert!(xml.contains("https://blog.example.org/posts/newer.html"));
        assert!(xml.contains("https://blog.example.org/posts/older.html"));
        assert!(xml.contains("2021-02-01T00:00:00+00:00"));
        assert!(xml.contains("<name>Ada</name>"));
        Ok(())
    }

    #[test]
    fn test_post_date() {
        assert_eq!(
            "2021-04-16T00:00:00+00:00",
            post_date("2021-04-16").unwrap().to_rfc3339()
        );
        assert!(post_date("April 16").is_err());
    }
}

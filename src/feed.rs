//! Support for creating RSS 2.0 and Atom 1.0 feeds from a list of posts.
//!
//! Both documents come from one [`Feed`] model, so they always agree on what
//! they list.

use crate::config::{Author, Site, ATOM_PATH, RSS_PATH};
use crate::post::Posts;
use atom_syndication::{
    Content, Entry as AtomEntry, Error as AtomError, Feed as AtomFeed, FixedDateTime, Link,
    Person, Text,
};
use chrono::{DateTime, Utc};
use rss::extension::atom::{AtomExtension, Link as AtomLink};
use rss::{Channel, Error as RssError, Guid, Item};
use std::fmt;
use std::io::Write;

/// The feed model shared by both output formats.
#[derive(Clone, Debug, PartialEq)]
pub struct Feed {
    pub title: String,
    pub description: String,

    /// Both the feed id and its home link: the site's base URL.
    pub id: String,
    pub language: String,
    pub copyright: String,
    pub rss_link: String,
    pub atom_link: String,
    pub author: Author,

    /// The author's home page.
    pub author_link: String,

    /// The date of the newest entry, or the Unix epoch for an empty feed.
    pub updated: DateTime<Utc>,

    /// Oldest first.
    pub entries: Vec<Entry>,
}

/// One post in a [`Feed`].
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub title: String,

    /// Both the entry id and its link: the post's URL.
    pub id: String,
    pub description: String,

    /// The full HTML body.
    pub content: String,
    pub published: DateTime<Utc>,
}

impl Feed {
    /// Builds the feed for the non-hidden `posts`.
    pub fn new(site: &Site, posts: &Posts) -> Feed {
        let entries: Vec<Entry> = posts
            .published()
            .map(|post| Entry {
                title: post.title.clone(),
                id: post.url.clone(),
                description: post.description.clone(),
                content: post.content.clone(),
                published: post.date,
            })
            .collect();

        Feed {
            title: site.title.clone(),
            description: site.description.clone(),
            id: site.base_url.clone(),
            language: site.language.clone(),
            copyright: site.copyright(),
            rss_link: site.absolute(RSS_PATH),
            atom_link: site.absolute(ATOM_PATH),
            author: site.author.clone(),
            author_link: site.base_url.clone(),
            updated: entries
                .iter()
                .map(|entry| entry.published)
                .max()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            entries,
        }
    }

    fn person(&self) -> Person {
        Person {
            name: self.author.name.clone(),
            email: Some(self.author.email.clone()),
            uri: Some(self.author_link.clone()),
            ..Default::default()
        }
    }

    /// Converts the model into an Atom 1.0 document.
    pub fn to_atom(&self) -> AtomFeed {
        AtomFeed {
            title: Text::plain(self.title.clone()),
            id: self.id.clone(),
            updated: fixed(self.updated),
            authors: vec![self.person()],
            links: vec![
                Link {
                    href: self.id.clone(),
                    rel: "alternate".to_owned(),
                    ..Default::default()
                },
                Link {
                    href: self.atom_link.clone(),
                    rel: "self".to_owned(),
                    mime_type: Some("application/atom+xml".to_owned()),
                    ..Default::default()
                },
            ],
            rights: Some(Text::plain(self.copyright.clone())),
            subtitle: Some(Text::plain(self.description.clone())),
            lang: Some(self.language.clone()),
            entries: self.entries.iter().map(|e| self.atom_entry(e)).collect(),
            ..Default::default()
        }
    }

    fn atom_entry(&self, entry: &Entry) -> AtomEntry {
        AtomEntry {
            title: Text::plain(entry.title.clone()),
            id: entry.id.clone(),
            updated: fixed(entry.published),
            published: Some(fixed(entry.published)),
            authors: vec![self.person()],
            links: vec![Link {
                href: entry.id.clone(),
                rel: "alternate".to_owned(),
                ..Default::default()
            }],
            summary: Some(Text::plain(entry.description.clone())),
            content: Some(Content {
                value: Some(entry.content.clone()),
                content_type: Some("html".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Converts the model into an RSS 2.0 document.
    pub fn to_rss(&self) -> Channel {
        Channel {
            title: self.title.clone(),
            link: self.id.clone(),
            description: self.description.clone(),
            language: Some(self.language.clone()),
            copyright: Some(self.copyright.clone()),
            last_build_date: Some(self.updated.to_rfc2822()),
            atom_ext: Some(AtomExtension {
                links: vec![AtomLink {
                    href: self.rss_link.clone(),
                    rel: "self".to_owned(),
                    mime_type: Some("application/rss+xml".to_owned()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            items: self.entries.iter().map(|e| self.rss_item(e)).collect(),
            ..Default::default()
        }
    }

    fn rss_item(&self, entry: &Entry) -> Item {
        Item {
            title: Some(entry.title.clone()),
            link: Some(entry.id.clone()),
            guid: Some(Guid {
                value: entry.id.clone(),
                permalink: false,
            }),
            description: Some(entry.description.clone()),
            content: Some(entry.content.clone()),
            author: Some(format!("{} ({})", self.author.email, self.author.name)),
            pub_date: Some(entry.published.to_rfc2822()),
            ..Default::default()
        }
    }

    /// Writes the RSS 2.0 document to `w`.
    pub fn write_rss<W: Write>(&self, w: W) -> Result<()> {
        self.to_rss().write_to(w)?;
        Ok(())
    }

    /// Writes the Atom 1.0 document to `w`.
    pub fn write_atom<W: Write>(&self, w: W) -> Result<()> {
        self.to_atom().write_to(w)?;
        Ok(())
    }
}

fn fixed(date: DateTime<Utc>) -> FixedDateTime {
    date.into()
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when the Atom document can't be written.
    Atom(AtomError),

    /// Returned when the RSS document can't be written.
    Rss(RssError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => err.fmt(f),
            Error::Rss(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
            Error::Rss(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<RssError> for Error {
    /// Converts [`RssError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: RssError) -> Error {
        Error::Rss(err)
    }
}

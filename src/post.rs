//! Defines the [`Post`], [`Posts`], [`Parser`], and [`Error`] types, and the
//! logic for parsing posts from the file system into memory.

use crate::frontmatter;
use crate::markdown::Renderer;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

/// One blog post. Built once per source file and never modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The source file name without its extension. Unique across posts.
    pub name: String,

    /// The site-relative URL of the post, `/posts/{name}`.
    pub url: String,

    /// The rendered HTML body (a fragment, no `<html>` wrapper).
    pub content: String,

    pub title: String,
    pub description: String,

    /// When the post was published, normalized to UTC.
    pub date: DateTime<Utc>,

    /// Hidden posts get a page but are left out of the index and the feeds.
    pub hidden: bool,
}

/// The YAML frontmatter of a post file. Every field is optional at this
/// stage so that missing fields can be reported by name.
#[derive(Deserialize)]
struct Meta {
    title: Option<String>,
    date: Option<serde_yaml::Value>,
    description: Option<String>,
    hidden: Option<bool>,
}

impl Post {
    /// Parses a single [`Post`] from its `name` (the file stem) and the
    /// contents of its source file.
    pub fn from_source(name: &str, input: &str, renderer: &Renderer) -> Result<Post> {
        let (meta, body): (Meta, &str) = frontmatter::parse(input)?;
        let title = required(meta.title, "title")?;
        let description = required(meta.description, "description")?;
        let date = match meta.date {
            None | Some(serde_yaml::Value::Null) => return Err(Error::MissingField("date")),
            Some(serde_yaml::Value::String(s)) => parse_date(&s)?,
            Some(serde_yaml::Value::Number(n)) => parse_date(&n.to_string())?,
            Some(other) => return Err(Error::InvalidDate(format!("{:?}", other))),
        };

        Ok(Post {
            name: name.to_owned(),
            url: format!("/posts/{}", name),
            content: renderer.to_html(body),
            title,
            description,
            date,
            hidden: meta.hidden.unwrap_or(false),
        })
    }

    /// The machine-readable date, e.g. `2024-01-01T00:00:00.000Z`.
    pub fn iso_date(&self) -> String {
        self.date.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// The human-readable date, e.g. `January 1, 2024`.
    pub fn readable_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

fn required(field: Option<String>, name: &'static str) -> Result<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingField(name)),
    }
}

/// Parses a frontmatter date. Accepts YAML timestamps: a bare date (midnight
/// UTC), or a date and time separated by `T` or spaces, with optional
/// seconds, fraction and offset. The offset may follow the time after spaces
/// and may be `Z`, `+HH`, `+HHMM` or `+HH:MM`. Times without one are UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || Error::InvalidDate(input.to_owned());
    let caps = timestamp_regex().captures(input).ok_or_else(invalid)?;
    let number = |name: &str| -> u32 {
        caps.name(name)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let date = NaiveDate::from_ymd_opt(
        caps["year"].parse().map_err(|_| invalid())?,
        number("month"),
        number("day"),
    )
    .ok_or_else(invalid)?;

    // Only the first nine digits of the fraction fit in nanoseconds.
    let nanos = caps.name("fraction").map_or(0, |m| {
        let digits: String = m.as_str().chars().chain(std::iter::repeat('0')).take(9).collect();
        digits.parse().unwrap_or(0)
    });
    let naive = date
        .and_hms_nano_opt(number("hour"), number("minute"), number("second"), nanos)
        .ok_or_else(invalid)?;

    let offset = match caps.name("sign") {
        None => 0,
        Some(sign) => {
            let seconds = (number("offset_hour") * 60 + number("offset_minute")) as i32 * 60;
            if sign.as_str() == "-" {
                -seconds
            } else {
                seconds
            }
        }
    };
    FixedOffset::east_opt(offset)
        .and_then(|offset| offset.from_local_datetime(&naive).single())
        .map(|date| date.with_timezone(&Utc))
        .ok_or_else(invalid)
}

fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP.get_or_init(|| {
        Regex::new(
            r"(?x)^
            (?P<year>\d{4})-(?P<month>\d{1,2})-(?P<day>\d{1,2})
            (?:
                (?:[Tt]|[\ \t]+)
                (?P<hour>\d{1,2}):(?P<minute>\d{2})
                (?::(?P<second>\d{2})(?:\.(?P<fraction>\d*))?)?
                (?:[\ \t]*(?:[Zz]|(?P<sign>[-+])(?P<offset_hour>\d{1,2})(?::?(?P<offset_minute>\d{2}))?))?
            )?$",
        )
        .unwrap_or_else(|err| panic!("invalid timestamp pattern: {}", err))
    })
}

/// All posts of a site, sorted by date, oldest first. Filtering and
/// reversing happen in views; the collection itself never changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Posts(Vec<Post>);

impl Posts {
    /// Sorts `posts` by date. The sort is stable, so posts with the same date
    /// keep their relative order.
    pub fn new(mut posts: Vec<Post>) -> Posts {
        posts.sort_by_key(|post| post.date);
        Posts(posts)
    }

    /// Every post, hidden ones included, oldest first.
    pub fn all(&self) -> &[Post] {
        &self.0
    }

    /// The non-hidden posts, oldest first. This is what the feeds list.
    pub fn published(&self) -> impl DoubleEndedIterator<Item = &Post> {
        self.0.iter().filter(|post| !post.hidden)
    }

    /// The non-hidden posts, newest first. This is what the index lists.
    pub fn listed(&self) -> impl Iterator<Item = &Post> {
        self.published().rev()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    renderer: &'a Renderer,
}

impl<'a> Parser<'a> {
    pub fn new(renderer: &'a Renderer) -> Parser<'a> {
        Parser { renderer }
    }

    /// Reads every `.md` file directly inside `source_directory` and returns
    /// the resulting [`Posts`]. Files are visited in file name order, which
    /// decides the order of posts sharing a date. The first bad post aborts
    /// the whole parse.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Posts> {
        let mut posts = Vec::new();
        for result in WalkDir::new(source_directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = result?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(MARKDOWN_EXTENSION)
            {
                continue;
            }
            posts.push(self.parse_post(path)?);
        }
        Ok(Posts::new(posts))
    }

    fn parse_post(&self, path: &Path) -> Result<Post> {
        match self._parse_post(path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(&self, path: &Path) -> Result<Post> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;
        let contents = std::fs::read_to_string(path)?;
        Post::from_source(name, &contents, self.renderer)
    }
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when the frontmatter is missing or malformed.
    Frontmatter(frontmatter::Error),

    /// Returned when a required frontmatter field is absent or empty.
    MissingField(&'static str),

    /// Returned when the `date` field can't be read as a point in time.
    InvalidDate(String),

    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(PathBuf),

    /// Returned for I/O errors reading a post.
    Io(std::io::Error),

    /// Returned for errors listing the posts directory.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    /// Reports whether the post itself is at fault (as opposed to the file
    /// system).
    pub fn is_invalid_post(&self) -> bool {
        match self {
            Error::Frontmatter(_) | Error::MissingField(_) | Error::InvalidDate(_) => true,
            Error::Annotated(_, err) => err.is_invalid_post(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Frontmatter(err) => err.fmt(f),
            Error::MissingField(field) => {
                write!(f, "missing required frontmatter field `{}`", field)
            }
            Error::InvalidDate(date) => write!(f, "invalid date: {}", date),
            Error::InvalidFileName(path) => write!(f, "invalid file name: {:?}", path),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Frontmatter(err) => Some(err),
            Error::MissingField(_) => None,
            Error::InvalidDate(_) => None,
            Error::InvalidFileName(_) => None,
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<frontmatter::Error> for Error {
    fn from(err: frontmatter::Error) -> Error {
        Error::Frontmatter(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while listing directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

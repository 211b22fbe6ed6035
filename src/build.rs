//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::post`]), rendering post and index pages ([`crate::page`]),
//! generating the feeds ([`crate::feed`]), and copying the stylesheet, the
//! assets, and the public files into the output directory.
//!
//! Every build recomputes everything and overwrites whatever is already in
//! the output directory. The first error aborts the build.

use crate::config::{Config, ATOM_PATH, RSS_PATH};
use crate::feed::{Error as FeedError, Feed};
use crate::highlight::ExternalHighlighter;
use crate::markdown::Renderer;
use crate::page::{render_index, render_post};
use crate::post::{Error as ParseError, Parser as PostParser};
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The content of the health-check marker file.
pub const HEALTH: &str = "OK";

/// What a build produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Post pages written, hidden posts included.
    pub posts: usize,

    /// Posts listed on the index page and in the feeds.
    pub listed: usize,

    /// Asset and public files copied.
    pub copied: usize,
}

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`], [`render_post`], [`render_index`], and
/// [`Feed`] which do the heavy-lifting. This function also copies the static
/// files from the source directories to the output directory.
pub fn build_site(config: &Config) -> Result<Summary> {
    let out = &config.output_directory;
    info!("Building into `{}`", out.display());

    // collect all posts
    let renderer = renderer(config);
    let posts = PostParser::new(&renderer).parse_posts(&config.posts_source_directory)?;

    mkdir(out)?;
    if let Some(token) = &config.verification_token {
        write(
            &out.join(format!("ahrefs_{}", token)),
            format!("ahrefs-site-verification_{}", token),
        )?;
    }
    copy_file(&config.stylesheet, &out.join("styles.css"))?;

    let mut copied = copy_dir(&config.assets_source_directory, &out.join("assets"))?;
    copied += copy_dir(&config.public_source_directory, out)?;

    // write the post pages
    let posts_directory = out.join("posts");
    mkdir(&posts_directory)?;
    for post in posts.all() {
        let dir = posts_directory.join(&post.name);
        mkdir(&dir)?;
        write(&dir.join("index.html"), render_post(&config.site, post))?;
    }

    // create the feeds
    let feed = Feed::new(&config.site, &posts);
    let mut rss = Vec::new();
    feed.write_rss(&mut rss)?;
    write(&site_path(out, RSS_PATH), rss)?;
    let mut atom = Vec::new();
    feed.write_atom(&mut atom)?;
    write(&site_path(out, ATOM_PATH), atom)?;

    write(&out.join("index.html"), render_index(&config.site, &posts))?;
    write(&out.join("health"), HEALTH)?;

    let summary = Summary {
        posts: posts.len(),
        listed: feed.entries.len(),
        copied,
    };
    info!(
        "Built {} posts ({} listed) and copied {} files",
        summary.posts, summary.listed, summary.copied
    );
    Ok(summary)
}

/// Builds the Markdown renderer, wiring in the external highlighter when one
/// is configured.
fn renderer(config: &Config) -> Renderer {
    let renderer = Renderer::new();
    match &config.highlighter {
        Some(highlighter) => match ExternalHighlighter::new(&highlighter.command) {
            Some(external) => renderer.with_external(&highlighter.language, external),
            None => renderer,
        },
        None => renderer,
    }
}

/// Maps a site-relative path like `/rss.xml` into the output directory.
fn site_path(out: &Path, path: &str) -> PathBuf {
    out.join(path.trim_start_matches('/'))
}

fn mkdir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|err| Error::Write {
        path: dir.to_owned(),
        err,
    })
}

fn write<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<()> {
    debug!("Writing `{}`", path.display());
    std::fs::write(path, contents).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    debug!("Copying `{}` to `{}`", src.display(), dst.display());
    match std::fs::copy(src, dst) {
        Ok(_) => Ok(()),
        Err(err) => Err(Error::Copy {
            src: src.to_owned(),
            dst: dst.to_owned(),
            err,
        }),
    }
}

/// Recursively copies the contents of `src` into `dst`, returning the number
/// of files copied.
fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    mkdir(dst)?;
    let mut copied = 0;
    for result in WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = result?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            mkdir(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, feed
/// generation, or file system I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors writing the feeds.
    Feed(FeedError),

    /// Returned for I/O problems while writing output files or directories.
    Write { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying a file.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        err: std::io::Error,
    },

    /// Returned for errors walking a source directory.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Copy { src, dst, err } => write!(
                f,
                "Copying '{}' to '{}': {}",
                src.display(),
                dst.display(),
                err
            ),
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Write { path: _, err } => Some(err),
            Error::Copy { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

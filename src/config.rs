//! Loads the project file (`blog.yaml`) into an immutable [`Config`].
//!
//! Everything page and feed rendering needs is gathered in [`Site`], which is
//! passed around explicitly. The copyright year is resolved here, once, so the
//! renderers never look at the clock.

use crate::util::read_source;
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "blog.yaml";

/// Where the RSS feed is written, relative to the site root.
pub const RSS_PATH: &str = "/rss.xml";

/// Where the Atom feed is written, relative to the site root.
pub const ATOM_PATH: &str = "/atom.xml";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// A titled hyperlink, e.g. in the footer.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Link {
    pub title: String,
    pub href: String,
}

/// The social profile linked from the page header with an icon.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Social {
    pub href: String,
    pub icon: String,
    #[serde(default)]
    pub alt: String,
}

/// The external highlighter for the author's own markup language.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Highlighter {
    /// The fenced code block tag it handles, e.g. `typ`.
    pub language: String,

    /// The command line to run, program first.
    pub command: Vec<String>,
}

#[derive(Deserialize)]
struct Layout {
    #[serde(default = "Layout::posts")]
    posts: PathBuf,
    #[serde(default = "Layout::assets")]
    assets: PathBuf,
    #[serde(default = "Layout::public")]
    public: PathBuf,
    #[serde(default = "Layout::stylesheet")]
    stylesheet: PathBuf,
    #[serde(default = "Layout::output")]
    output: PathBuf,
}

impl Layout {
    fn posts() -> PathBuf {
        PathBuf::from("posts")
    }
    fn assets() -> PathBuf {
        PathBuf::from("assets")
    }
    fn public() -> PathBuf {
        PathBuf::from("public")
    }
    fn stylesheet() -> PathBuf {
        PathBuf::from("styles.css")
    }
    fn output() -> PathBuf {
        PathBuf::from("dist")
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            posts: Layout::posts(),
            assets: Layout::assets(),
            public: Layout::public(),
            stylesheet: Layout::stylesheet(),
            output: Layout::output(),
        }
    }
}

fn default_language() -> String {
    String::from("en")
}

#[derive(Deserialize)]
struct Project {
    title: String,
    description: String,
    base_url: Url,
    #[serde(default = "default_language")]
    language: String,
    author: Author,
    #[serde(default)]
    social: Option<Social>,
    #[serde(default)]
    footer_links: Vec<Link>,
    #[serde(default)]
    verification_token: Option<String>,
    #[serde(default)]
    copyright_year: Option<i32>,
    #[serde(default)]
    highlighter: Option<Highlighter>,
    #[serde(default)]
    layout: Layout,
}

/// Site-wide constants used by the page renderer and the feed builder.
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub title: String,
    pub description: String,

    /// The canonical site URL without a trailing slash, e.g.
    /// `https://example.org`.
    pub base_url: String,

    pub language: String,
    pub author: Author,
    pub social: Option<Social>,

    /// Extra links shown in the footer of the index page after the feeds.
    pub footer_links: Vec<Link>,

    pub copyright_year: i32,
}

impl Site {
    /// Turns a site-relative path (`/posts/foo`) into an absolute URL.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn copyright(&self) -> String {
        format!(
            "All rights reserved {}, {}",
            self.copyright_year, self.author.name
        )
    }
}

/// Everything needed for one build.
pub struct Config {
    pub site: Site,
    pub posts_source_directory: PathBuf,
    pub assets_source_directory: PathBuf,
    pub public_source_directory: PathBuf,
    pub stylesheet: PathBuf,
    pub output_directory: PathBuf,
    pub highlighter: Option<Highlighter>,

    /// When set, `ahrefs_{token}` is written to the output root.
    pub verification_token: Option<String>,
}

impl Config {
    /// Looks for [`PROJECT_FILE`] in `dir` and then in each of its parents.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_str(&read_source(path, "project")?)
            .with_context(|| format!("Parsing project file `{}`", path.display()))?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Ok(Config::from_project(project_root, project)),
        }
    }

    /// Parses a project file's contents. Relative paths resolve against
    /// `project_root`.
    pub fn from_yaml(project_root: &Path, yaml: &str) -> Result<Config> {
        Ok(Config::from_project(project_root, serde_yaml::from_str(yaml)?))
    }

    fn from_project(project_root: &Path, project: Project) -> Config {
        Config {
            site: Site {
                title: project.title,
                description: project.description,
                base_url: project.base_url.as_str().trim_end_matches('/').to_owned(),
                language: project.language,
                author: project.author,
                social: project.social,
                footer_links: project.footer_links,
                copyright_year: project
                    .copyright_year
                    .unwrap_or_else(|| Utc::now().year()),
            },
            posts_source_directory: project_root.join(project.layout.posts),
            assets_source_directory: project_root.join(project.layout.assets),
            public_source_directory: project_root.join(project.layout.public),
            stylesheet: project_root.join(project.layout.stylesheet),
            output_directory: project_root.join(project.layout.output),
            highlighter: project.highlighter,
            verification_token: project.verification_token,
        }
    }
}

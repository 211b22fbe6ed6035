//! The library code for the `blogpress` static blog generator. A build is a
//! single synchronous pass:
//!
//! 1. Parsing posts from source files on disk ([`crate::post`]). Each file is
//!    split into frontmatter and body ([`crate::frontmatter`]) and the body is
//!    rendered to HTML ([`crate::markdown`]), with code blocks going through
//!    [`crate::highlight`].
//! 2. Rendering the post pages and the index page ([`crate::page`]).
//! 3. Building the RSS and Atom feeds ([`crate::feed`]).
//! 4. Writing all of it, plus the copied static files, to the output
//!    directory ([`crate::build`]).
//!
//! Site-wide settings come from the project file ([`crate::config`]) and are
//! passed explicitly to every step that needs them.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod frontmatter;
pub mod highlight;
pub mod htmlrenderer;
pub mod markdown;
pub mod page;
pub mod post;
mod util;

//! Splits a post source file into its YAML frontmatter and its Markdown body.
//!
//! A post file looks like this:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! description: A greeting.
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! Only the first two fences count. Any `---` appearing later belongs to the
//! body.

use serde::de::DeserializeOwned;
use std::fmt;

const FENCE: &str = "---";

/// The two halves of a post source file. Both borrow from the input.
#[derive(Debug, PartialEq, Eq)]
pub struct Split<'a> {
    /// The raw YAML between the fences.
    pub yaml: &'a str,

    /// Everything after the second fence, verbatim.
    pub body: &'a str,
}

/// Splits `input` into a [`Split`] without interpreting the YAML.
pub fn split(input: &str) -> Result<Split<'_>> {
    fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
        if !input.starts_with(FENCE) {
            return Err(Error::MissingStartFence);
        }
        match input[FENCE.len()..].find(FENCE) {
            None => Err(Error::MissingEndFence),
            Some(offset) => Ok((
                FENCE.len(),                        // yaml_start
                FENCE.len() + offset,               // yaml_stop
                FENCE.len() + offset + FENCE.len(), // body_start
            )),
        }
    }

    let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
    Ok(Split {
        yaml: &input[yaml_start..yaml_stop],
        body: &input[body_start..],
    })
}

/// Splits `input` and deserializes the frontmatter into `T`, returning it
/// alongside the body.
pub fn parse<T: DeserializeOwned>(input: &str) -> Result<(T, &str)> {
    let Split { yaml, body } = split(input)?;
    Ok((serde_yaml::from_str(yaml)?, body))
}

/// The result of a fallible frontmatter operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a malformed frontmatter block.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file doesn't begin with a fence (`---`).
    MissingStartFence,

    /// Returned when the starting fence was found but the closing one was
    /// missing.
    MissingEndFence,

    /// Returned when the frontmatter isn't valid YAML or doesn't have the
    /// expected shape.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingStartFence => write!(f, "post must begin with `---`"),
            Error::MissingEndFence => write!(f, "missing closing `---`"),
            Error::DeserializeYaml(err) => write!(f, "malformed frontmatter: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingStartFence => None,
            Error::MissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

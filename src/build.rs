//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: indexing the posts
//! ([`crate::context`]), rendering the home, post and tag pages
//! ([`crate::write`]), copying the static source directory into the output
//! directory, and generating the Atom feed.

use crate::config::Config;
use crate::context::BuildContext;
use crate::feed::{Error as FeedError, *};
use crate::index::Error as IndexError;
use crate::util::{copy_dir, rmdir};
use crate::write::{Error as WriteError, *};
use log::{info, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

/// What a build produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub posts: usize,
    pub tags: usize,
    pub static_files: usize,
    pub feed: bool,
}

/// Builds the site from a [`Config`] object. The post index is built once
/// into a [`BuildContext`] which every page-writing step then shares. The
/// output directory is emptied first, so it must not contain any of the
/// build's inputs.
pub fn build_site(config: &Config) -> Result<Summary> {
    check_output_directory(config)?;

    let ctx = BuildContext::from_config(config)?;
    if ctx.index().is_empty() {
        warn!("no posts found in `{}`", config.posts_directory.display());
    }

    // Parse the templates before touching the output directory so that a
    // broken theme leaves the previous build in place.
    let templates = Templates::load(&config.theme)?;

    rmdir(&config.output_directory).map_err(|err| Error::Clean {
        path: config.output_directory.clone(),
        err,
    })?;
    std::fs::create_dir_all(&config.output_directory)?;

    let writer = Writer {
        templates: &templates,
        output_directory: &config.output_directory,
        title: &config.title,
        feed_path: config.site_url.as_ref().map(|_| FEED_PATH),
    };
    let written = writer.write_site(&ctx)?;
    info!(
        "wrote {} post pages and {} tag pages to `{}`",
        written.posts,
        written.tags,
        config.output_directory.display()
    );

    let static_files = match config.static_directory.is_dir() {
        true => copy_dir(&config.static_directory, &config.output_directory).map_err(|err| {
            Error::CopyStatic {
                path: config.static_directory.clone(),
                err,
            }
        })?,
        false => 0,
    };
    info!("copied {} static files", static_files);

    let feed = match &config.site_url {
        Some(site_url) => {
            let path = config.output_directory.join(FEED_PATH);
            write_feed(
                &FeedConfig {
                    title: &config.title,
                    author: config.author.as_ref(),
                    site_url,
                },
                ctx.index().posts(),
                BufWriter::new(File::create(&path)?),
            )?;
            info!("wrote feed `{}`", path.display());
            true
        }
        None => false,
    };

    Ok(Summary {
        posts: written.posts,
        tags: written.tags,
        static_files,
        feed,
    })
}

/// Fails if emptying the output directory would delete the posts, the static
/// files or a theme template. Paths that don't exist yet can't be deleted and
/// are not checked.
fn check_output_directory(config: &Config) -> Result<()> {
    let output = match config.output_directory.canonicalize() {
        Ok(output) => output,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    let theme = &config.theme;
    let inputs = [
        Some(&config.posts_directory),
        Some(&config.static_directory),
        theme.index.as_ref(),
        theme.post.as_ref(),
        theme.tag.as_ref(),
    ];
    for input in inputs.iter().flatten() {
        let canonical = match input.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => continue,
        };
        if canonical.starts_with(&output) {
            return Err(Error::OutputContainsInput {
                output: config.output_directory.clone(),
                input: input.to_path_buf(),
            });
        }
    }
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during indexing,
/// writing, cleaning the output directory, copying static files, and other
/// I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors while indexing or loading posts.
    Index(IndexError),

    /// Returned for errors templating and writing pages.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying static files.
    CopyStatic { path: PathBuf, err: std::io::Error },

    /// Returned when an input lives inside the output directory, which is
    /// emptied before pages are written.
    OutputContainsInput { output: PathBuf, input: PathBuf },

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Index(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::CopyStatic { path, err } => {
                write!(f, "Copying static files from '{}': {}", path.display(), err)
            }
            Error::OutputContainsInput { output, input } => write!(
                f,
                "Output directory '{}' contains input '{}' and would delete it",
                output.display(),
                input.display()
            ),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::CopyStatic { path: _, err } => Some(err),
            Error::OutputContainsInput { .. } => None,
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<IndexError> for Error {
    /// Converts [`IndexError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: IndexError) -> Error {
        Error::Index(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

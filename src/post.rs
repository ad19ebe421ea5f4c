//! Defines the post record types ([`PostMeta`], [`PostLink`], [`PostData`])
//! and the logic for splitting a post source file into its YAML frontmatter
//! and markdown body.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

/// The extension a file must carry to be picked up as a post.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// The metadata for a single post, as read from its frontmatter. The body is
/// not kept; it is re-read and rendered on demand (see
/// [`crate::context::BuildContext::post_data`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostMeta {
    /// The file name of the post less the `.md` extension.
    pub slug: String,

    /// The publication date in `YYYY-MM-DD` form. Posts are ordered by
    /// comparing this string lexically, which is why the format is enforced
    /// by [`validate_date`].
    pub date: String,

    pub title: String,

    pub tags: BTreeSet<String>,

    pub description: Option<String>,

    /// An image path or URL used for social previews.
    pub image: Option<String>,
}

/// A reference to a neighbouring post, used for prev/next navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostLink {
    pub slug: String,
    pub title: String,
    pub date: String,
}

impl From<&PostMeta> for PostLink {
    fn from(meta: &PostMeta) -> PostLink {
        PostLink {
            slug: meta.slug.clone(),
            title: meta.title.clone(),
            date: meta.date.clone(),
        }
    }
}

/// Everything a post page needs: the frontmatter fields, the rendered body
/// and the adjacent posts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostData {
    pub slug: String,
    pub date: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub content_html: String,

    /// The newer neighbour, if any.
    pub prev: Option<PostLink>,

    /// The older neighbour, if any.
    pub next: Option<PostLink>,
}

#[derive(Deserialize)]
struct Frontmatter {
    date: Option<String>,
    title: Option<String>,
    tags: Option<serde_yaml::Value>,
    description: Option<String>,
    image: Option<String>,
}

/// Reads the `tags` frontmatter field. It is normally a comma-separated
/// string, but a YAML sequence is accepted as well. Numbers and booleans are
/// taken as written, so `tags: 2021` yields the tag `2021`.
fn tags_from_yaml(field: serde_yaml::Value) -> Result<BTreeSet<String>> {
    fn scalar(value: serde_yaml::Value) -> Result<String> {
        match value {
            serde_yaml::Value::String(s) => Ok(s),
            serde_yaml::Value::Number(n) => Ok(n.to_string()),
            serde_yaml::Value::Bool(b) => Ok(b.to_string()),
            _ => Err(Error::InvalidTags),
        }
    }

    match field {
        serde_yaml::Value::Null => Ok(BTreeSet::new()),
        serde_yaml::Value::Sequence(items) => {
            let mut tags = BTreeSet::new();
            for item in items {
                let tag = scalar(item)?;
                let tag = tag.trim();
                if !tag.is_empty() {
                    tags.insert(tag.to_owned());
                }
            }
            Ok(tags)
        }
        other => Ok(parse_tags(&scalar(other)?)),
    }
}

/// Splits a comma-separated tags field into a set. Whitespace around each
/// entry is trimmed and empty entries are dropped, so `""`, `","` and `" "`
/// all yield the empty set.
pub fn parse_tags(field: &str) -> BTreeSet<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Checks that `date` is a zero-padded `YYYY-MM-DD` calendar date. Only dates
/// of this shape sort chronologically when compared as strings.
pub fn validate_date(date: &str) -> Result<()> {
    let shape_ok = date.len() == 10
        && date.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(Error::InvalidDate {
            date: date.to_owned(),
            err: None,
        });
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|err| Error::InvalidDate {
            date: date.to_owned(),
            err: Some(err),
        })
}

/// Checks that `slug` can be used as a URL path segment without escaping:
/// letters, digits, `-`, `_`, `.` and `~` only.
pub fn validate_slug(slug: &str) -> Result<()> {
    let ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
    match ok {
        true => Ok(()),
        false => Err(Error::InvalidSlug(slug.to_owned())),
    }
}

/// Parses a post's source text into its metadata and its markdown body. The
/// source must be structured as follows:
///
/// 1. Initial frontmatter fence (`---`)
/// 2. YAML frontmatter with fields `date`, `title`, and optionally `tags`,
///    `description` and `image`
/// 3. Terminal frontmatter fence (`---`) at the start of a line
/// 4. Post body
///
/// For example:
///
/// ```md
/// ---
/// title: Hello, world!
/// date: 2021-04-16
/// tags: greet, meta
/// ---
/// # Hello
///
/// World
/// ```
pub fn parse_post<'a>(slug: &str, input: &'a str) -> Result<(PostMeta, &'a str)> {
    fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
        const FENCE: &str = "---";
        if !input.starts_with(FENCE) {
            return Err(Error::FrontmatterMissingStartFence);
        }
        match input[FENCE.len()..].find("\n---") {
            None => Err(Error::FrontmatterMissingEndFence),
            Some(offset) => {
                let yaml_stop = FENCE.len() + offset + 1;
                Ok((
                    FENCE.len(),             // yaml_start
                    yaml_stop,               // yaml_stop
                    yaml_stop + FENCE.len(), // body_start
                ))
            }
        }
    }

    validate_slug(slug)?;
    let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
    let frontmatter: Frontmatter = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;

    let date = frontmatter.date.ok_or(Error::MissingField("date"))?;
    validate_date(&date)?;
    let title = frontmatter.title.ok_or(Error::MissingField("title"))?;

    let tags = match frontmatter.tags {
        Some(field) => tags_from_yaml(field)?,
        None => BTreeSet::new(),
    };

    let meta = PostMeta {
        slug: slug.to_owned(),
        date,
        title,
        tags,
        description: frontmatter.description,
        image: frontmatter.image,
    };
    Ok((meta, &input[body_start..]))
}

/// Reads the post at `path` and returns its metadata together with its
/// markdown body. Errors are annotated with the path.
pub fn read_post(path: &Path, slug: &str) -> Result<(PostMeta, String)> {
    fn read(path: &Path, slug: &str) -> Result<(PostMeta, String)> {
        let contents = std::fs::read_to_string(path)?;
        let (meta, body) = parse_post(slug, &contents)?;
        Ok((meta, body.to_owned()))
    }

    read(path, slug).map_err(|e| Error::Annotated(path.to_owned(), Box::new(e)))
}

/// Returns the slug for a post file name, or `None` if the name doesn't
/// carry the markdown extension.
pub fn slug_from_file_name(file_name: &str) -> Option<&str> {
    match file_name.strip_suffix(MARKDOWN_EXTENSION) {
        Some(slug) if !slug.is_empty() => Some(slug),
        _ => None,
    }
}

/// Represents the result of a post-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a post.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when the starting fence was found but the ending one was
    /// missing.
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a required frontmatter field is absent.
    MissingField(&'static str),

    /// Returned when the `date` field isn't a zero-padded `YYYY-MM-DD` date.
    InvalidDate {
        date: String,
        err: Option<chrono::ParseError>,
    },

    /// Returned when the `tags` field is neither a string nor a sequence of
    /// strings.
    InvalidTags,

    /// Returned when a post's file name can't be used as a URL path segment.
    InvalidSlug(String),

    /// Returned for I/O errors reading the source file.
    Io(std::io::Error),

    /// An error annotated with the source file it came from.
    Annotated(PathBuf, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::MissingField(field) => {
                write!(f, "missing required frontmatter field `{}`", field)
            }
            Error::InvalidDate { date, err: None } => {
                write!(f, "invalid date `{}`: expected YYYY-MM-DD", date)
            }
            Error::InvalidDate {
                date,
                err: Some(err),
            } => write!(f, "invalid date `{}`: {}", date, err),
            Error::InvalidTags => {
                write!(f, "`tags` must be a comma-separated string or a list")
            }
            Error::InvalidSlug(slug) => write!(
                f,
                "invalid slug `{}`: only letters, digits, `-`, `_`, `.` and `~` are allowed",
                slug
            ),
            Error::Io(err) => err.fmt(f),
            Error::Annotated(path, err) => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::MissingField(_) => None,
            Error::InvalidDate { err: None, .. } => None,
            Error::InvalidDate { err: Some(err), .. } => Some(err),
            Error::InvalidTags => None,
            Error::InvalidSlug(_) => None,
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
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

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

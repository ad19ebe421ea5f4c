use crate::config::Theme;
use crate::context::BuildContext;
use crate::index;
use crate::tag::Tag;
use crate::value::{escaped, post_url, post_value, summary_value, tag_value};
use gtmpl::{Template, Value};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const DEFAULT_INDEX_TEMPLATE: &str = include_str!("../theme/index.html");
const DEFAULT_POST_TEMPLATE: &str = include_str!("../theme/post.html");
const DEFAULT_TAG_TEMPLATE: &str = include_str!("../theme/tag.html");

/// The parsed templates for the three kinds of page.
pub struct Templates {
    pub index: Template,
    pub post: Template,
    pub tag: Template,
}

impl Templates {
    /// Parses the built-in templates, replacing each with the file named in
    /// `theme` where one is given.
    pub fn load(theme: &Theme) -> Result<Templates> {
        Ok(Templates {
            index: parse_template(theme.index.as_deref(), DEFAULT_INDEX_TEMPLATE)?,
            post: parse_template(theme.post.as_deref(), DEFAULT_POST_TEMPLATE)?,
            tag: parse_template(theme.tag.as_deref(), DEFAULT_TAG_TEMPLATE)?,
        })
    }
}

fn parse_template(path: Option<&Path>, default: &str) -> Result<Template> {
    let contents = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?,
        None => default.to_owned(),
    };

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

/// Responsible for templating and writing HTML pages to disk from a
/// [`BuildContext`].
pub struct Writer<'a> {
    pub templates: &'a Templates,

    /// The directory in which pages are written. The home page lands at
    /// `{output_directory}/index.html`, post pages at
    /// `{output_directory}/posts/{slug}.html` and tag pages at
    /// `{output_directory}/tags/{tag_slug}.html`.
    pub output_directory: &'a Path,

    /// The site title, made available to every template as `site.title`.
    pub title: &'a str,

    /// The feed's path relative to the output root, if a feed is written.
    pub feed_path: Option<&'a str>,
}

/// An output HTML file: the values handed to its template and where it goes.
struct Page<'a> {
    /// Page-specific template values. `site` is added by
    /// [`Writer::write_page`].
    values: HashMap<String, Value>,

    /// The path from the page back to the output root (`""` or `"../"`).
    root: &'static str,

    file_path: PathBuf,

    template: &'a Template,
}

/// Counts of what a [`Writer`] wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Written {
    pub posts: usize,
    pub tags: usize,
}

impl Writer<'_> {
    fn site_value(&self, root: &str) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), escaped(self.title));
        m.insert("home".to_owned(), escaped(&format!("{}index.html", root)));
        m.insert(
            "feed_url".to_owned(),
            match self.feed_path {
                Some(path) => escaped(&format!("{}{}", root, path)),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }

    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, mut page: Page) -> Result<()> {
        page.values.insert("site".to_owned(), self.site_value(page.root));
        if let Some(dir) = page.file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut w = BufWriter::new(std::fs::File::create(&page.file_path)?);
        page.template.execute(
            &mut w,
            &gtmpl::Context::from(Value::Object(page.values))?,
        )?;
        w.flush()?;
        debug!("wrote `{}`", page.file_path.display());
        Ok(())
    }

    /// Writes the home page, one page per post and one page per tag.
    pub fn write_site(&self, ctx: &BuildContext) -> Result<Written> {
        let index = ctx.index();
        let tags = collect_tags(index.tags())?;

        let tags_value =
            |root: &str| Value::Array(tags.iter().map(|t| tag_value(root, t)).collect());

        // home page
        let mut values = HashMap::new();
        values.insert(
            "posts".to_owned(),
            Value::Array(index.posts().iter().map(|p| summary_value("", p)).collect()),
        );
        values.insert("tags".to_owned(), tags_value(""));
        self.write_page(Page {
            values,
            root: "",
            file_path: self.output_directory.join("index.html"),
            template: &self.templates.index,
        })?;

        // post pages
        for slug in index.slugs() {
            let post = ctx.post_data(slug)?;
            let mut values = HashMap::new();
            values.insert("post".to_owned(), post_value("../", &post));
            self.write_page(Page {
                values,
                root: "../",
                file_path: self.output_directory.join(post_url("", slug)),
                template: &self.templates.post,
            })?;
        }

        // tag pages
        for tag in &tags {
            let mut values = HashMap::new();
            values.insert("tag".to_owned(), tag_value("../", tag));
            values.insert(
                "posts".to_owned(),
                Value::Array(
                    ctx.posts_by_tag(&tag.name)
                        .into_iter()
                        .map(|p| summary_value("../", p))
                        .collect(),
                ),
            );
            values.insert("tags".to_owned(), tags_value("../"));
            self.write_page(Page {
                values,
                root: "../",
                file_path: self.output_directory.join(tag.path()),
                template: &self.templates.tag,
            })?;
        }

        Ok(Written {
            posts: index.len(),
            tags: tags.len(),
        })
    }
}

/// Pairs every tag with its page slug, failing if a tag has no usable slug or
/// two tags would share a page.
fn collect_tags<'a>(names: impl Iterator<Item = &'a str>) -> Result<Vec<Tag>> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut tags = Vec::new();
    for name in names {
        let tag = Tag::new(name);
        if tag.slug.is_empty() {
            return Err(Error::InvalidTag(tag.name));
        }
        if let Some(other) = seen.insert(tag.slug.clone(), tag.name.clone()) {
            return Err(Error::TagCollision {
                first: other,
                second: tag.name,
            });
        }
        tags.push(tag);
    }
    Ok(tags)
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening a theme template.
    OpenTemplateFile { path: PathBuf, err: io::Error },

    /// Returned for errors parsing a template.
    ParseTemplate(String),

    /// An error during templating.
    Template(String),

    /// Returned when loading a post for its page fails.
    Index(index::Error),

    /// Returned when a tag slugifies to nothing.
    InvalidTag(String),

    /// Returned when two distinct tags slugify to the same page name.
    TagCollision { first: String, second: String },

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<index::Error> for Error {
    fn from(err: index::Error) -> Error {
        Error::Index(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing template: {}", err),
            Error::Template(err) => err.fmt(f),
            Error::Index(err) => err.fmt(f),
            Error::InvalidTag(name) => {
                write!(f, "tag `{}` has no characters usable in a file name", name)
            }
            Error::TagCollision { first, second } => write!(
                f,
                "tags `{}` and `{}` would share the same tag page",
                first, second
            ),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Template(_) => None,
            Error::Index(err) => Some(err),
            Error::InvalidTag(_) => None,
            Error::TagCollision { .. } => None,
            Error::Io(err) => Some(err),
        }
    }
}

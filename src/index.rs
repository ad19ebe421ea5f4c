//! Defines [`PostIndex`], the date-ordered collection of every post's
//! metadata, along with the tag and adjacency lookups derived from it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::post::{
    self, read_post, slug_from_file_name, validate_date, validate_slug, PostMeta,
    MARKDOWN_EXTENSION,
};

/// The posts of a site, newest first.
#[derive(Debug, Default)]
pub struct PostIndex {
    posts: Vec<PostMeta>,

    /// Maps each slug to its position in `posts`.
    positions: HashMap<String, usize>,

    /// Maps each tag to the positions of the posts carrying it, in ascending
    /// order.
    tags: BTreeMap<String, Vec<usize>>,
}

/// The neighbours of a post in a [`PostIndex`]. `prev` is the newer post
/// (the one before it in the index) and `next` the older one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjacency<'a> {
    pub prev: Option<&'a PostMeta>,
    pub next: Option<&'a PostMeta>,
}

impl PostIndex {
    /// Reads every `*.md` file directly inside `dir` and indexes the
    /// metadata from their frontmatter. Files are visited in file-name order
    /// so that posts sharing a date always come out in the same order.
    pub fn from_directory(dir: &Path) -> Result<PostIndex> {
        let entries = read_dir(dir).map_err(|err| Error::ReadDirectory {
            path: dir.to_owned(),
            err,
        })?;

        let mut files = Vec::new();
        for result in entries {
            let entry = result?;
            if !entry.file_type()?.is_file() {
                debug!("skipping non-file entry `{}`", entry.path().display());
                continue;
            }
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            match slug_from_file_name(&file_name) {
                Some(slug) => files.push((slug.to_owned(), entry.path())),
                None => debug!("skipping non-markdown file `{}`", entry.path().display()),
            }
        }
        files.sort();

        let mut posts = Vec::with_capacity(files.len());
        for (slug, path) in files {
            let (meta, _) = read_post(&path, &slug)?;
            debug!("read post `{}` ({})", meta.slug, meta.date);
            posts.push(meta);
        }

        let index = Self::from_posts(posts)?;
        info!(
            "indexed {} posts with {} tags from `{}`",
            index.len(),
            index.tags.len(),
            dir.display()
        );
        Ok(index)
    }

    /// Builds an index from already-parsed metadata. The posts are sorted by
    /// date, newest first; posts with equal dates keep their relative order.
    pub fn from_posts(mut posts: Vec<PostMeta>) -> Result<PostIndex> {
        for meta in &posts {
            validate_slug(&meta.slug)
                .and_then(|_| validate_date(&meta.date))
                .map_err(|e| {
                    let file_name = format!("{}{}", meta.slug, MARKDOWN_EXTENSION);
                    post::Error::Annotated(PathBuf::from(file_name), Box::new(e))
                })?;
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date));

        let mut positions = HashMap::with_capacity(posts.len());
        let mut tags: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, post) in posts.iter().enumerate() {
            if positions.insert(post.slug.clone(), i).is_some() {
                return Err(Error::DuplicateSlug(post.slug.clone()));
            }
            for tag in &post.tags {
                tags.entry(tag.clone()).or_default().push(i);
            }
        }

        Ok(PostIndex {
            posts,
            positions,
            tags,
        })
    }

    /// All posts, newest first.
    pub fn posts(&self) -> &[PostMeta] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&PostMeta> {
        self.positions.get(slug).map(|&i| &self.posts[i])
    }

    /// Every slug in index order.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.posts.iter().map(|p| p.slug.as_str())
    }

    /// Every tag used by at least one post, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// The posts carrying `tag`, in index order. Unknown tags yield an empty
    /// list.
    pub fn posts_by_tag(&self, tag: &str) -> Vec<&PostMeta> {
        match self.tags.get(tag) {
            Some(positions) => positions.iter().map(|&i| &self.posts[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Looks up the neighbours of the post identified by `slug`.
    pub fn adjacency(&self, slug: &str) -> Result<Adjacency> {
        let i = *self
            .positions
            .get(slug)
            .ok_or_else(|| Error::NotFound(slug.to_owned()))?;
        Ok(Adjacency {
            prev: match i {
                0 => None,
                _ => self.posts.get(i - 1),
            },
            next: self.posts.get(i + 1),
        })
    }
}

/// The result of a fallible index operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building or querying a [`PostIndex`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the posts directory can't be listed (usually because it
    /// doesn't exist).
    ReadDirectory { path: PathBuf, err: std::io::Error },

    /// Returned when a post fails to parse.
    Post(post::Error),

    /// Returned when two posts share a slug.
    DuplicateSlug(String),

    /// Returned when a slug has no matching post.
    NotFound(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ReadDirectory { path, err } => {
                write!(f, "reading posts directory `{}`: {}", path.display(), err)
            }
            Error::Post(err) => err.fmt(f),
            Error::DuplicateSlug(slug) => write!(f, "duplicate post slug `{}`", slug),
            Error::NotFound(slug) => write!(f, "no post with slug `{}`", slug),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ReadDirectory { path: _, err } => Some(err),
            Error::Post(err) => Some(err),
            Error::DuplicateSlug(_) => None,
            Error::NotFound(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;

    fn meta(slug: &str, date: &str, tags: &[&str]) -> PostMeta {
        PostMeta {
            slug: slug.to_owned(),
            date: date.to_owned(),
            title: slug.to_uppercase(),
            tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            description: None,
            image: None,
        }
    }

    fn slugs<'a>(posts: impl IntoIterator<Item = &'a PostMeta>) -> Vec<&'a str> {
        posts.into_iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_sorted_newest_first() -> Result<()> {
        let index = PostIndex::from_posts(vec![
            meta("old", "2019-01-01", &[]),
            meta("new", "2021-06-30", &[]),
            meta("mid", "2020-12-31", &[]),
        ])?;
        assert_eq!(vec!["new", "mid", "old"], slugs(index.posts()));
        for pair in index.posts().windows(2) {
            assert!(pair[0].date >= pair[1].date);
        }
        Ok(())
    }

    #[test]
    fn test_equal_dates_keep_input_order() -> Result<()> {
        let index = PostIndex::from_posts(vec![
            meta("first", "2020-01-01", &[]),
            meta("second", "2020-01-01", &[]),
            meta("newest", "2020-02-01", &[]),
        ])?;
        assert_eq!(vec!["newest", "first", "second"], slugs(index.posts()));
        Ok(())
    }

    #[test]
    fn test_adjacency() -> Result<()> {
        let index = PostIndex::from_posts(vec![
            meta("p2", "2020-01-01", &[]),
            meta("p0", "2020-03-01", &[]),
            meta("p1", "2020-02-01", &[]),
        ])?;

        let middle = index.adjacency("p1")?;
        assert_eq!(Some("p0"), middle.prev.map(|p| p.slug.as_str()));
        assert_eq!(Some("p2"), middle.next.map(|p| p.slug.as_str()));

        let first = index.adjacency("p0")?;
        assert_eq!(None, first.prev);
        assert_eq!(Some("p1"), first.next.map(|p| p.slug.as_str()));

        let last = index.adjacency("p2")?;
        assert_eq!(Some("p1"), last.prev.map(|p| p.slug.as_str()));
        assert_eq!(None, last.next);
        Ok(())
    }

    #[test]
    fn test_adjacency_single_post() -> Result<()> {
        let index = PostIndex::from_posts(vec![meta("only", "2020-01-01", &[])])?;
        assert_eq!(
            Adjacency {
                prev: None,
                next: None
            },
            index.adjacency("only")?
        );
        Ok(())
    }

    #[test]
    fn test_adjacency_unknown_slug() -> Result<()> {
        let index = PostIndex::from_posts(vec![meta("only", "2020-01-01", &[])])?;
        match index.adjacency("missing") {
            Err(Error::NotFound(slug)) => assert_eq!("missing", slug),
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_posts_by_tag() -> Result<()> {
        let index = PostIndex::from_posts(vec![
            meta("x", "2020-03-01", &["a"]),
            meta("y", "2020-02-01", &["a", "b"]),
            meta("z", "2020-01-01", &["b"]),
        ])?;
        assert_eq!(vec!["x", "y"], slugs(index.posts_by_tag("a")));
        assert_eq!(vec!["y", "z"], slugs(index.posts_by_tag("b")));
        assert!(index.posts_by_tag("c").is_empty());
        assert_eq!(vec!["a", "b"], index.tags().collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_duplicate_slug() {
        match PostIndex::from_posts(vec![
            meta("same", "2020-01-01", &[]),
            meta("same", "2020-02-01", &[]),
        ]) {
            Err(Error::DuplicateSlug(slug)) => assert_eq!("same", slug),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unpadded_date() {
        match PostIndex::from_posts(vec![meta("bad", "2020-1-01", &[])]) {
            Err(Error::Post(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_slug_unsafe_in_urls() {
        match PostIndex::from_posts(vec![meta("c#-tips", "2020-01-01", &[])]) {
            Err(Error::Post(post::Error::Annotated(path, err))) => {
                assert_eq!(PathBuf::from("c#-tips.md"), path);
                assert!(matches!(*err, post::Error::InvalidSlug(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_directory() -> Result<()> {
        let index = PostIndex::from_directory(Path::new("./testdata/posts/"))?;
        assert_eq!(3, index.len());
        assert_eq!(
            vec!["tagging-things", "second-steps", "hello-world"],
            index.slugs().collect::<Vec<_>>()
        );
        assert_eq!(
            vec!["second-steps", "tagging-things"]
                .into_iter()
                .collect::<BTreeSet<_>>(),
            slugs(index.posts_by_tag("rust"))
                .into_iter()
                .collect::<BTreeSet<_>>()
        );
        assert_eq!(Some("Hello, world!"), index.get("hello-world").map(|p| p.title.as_str()));
        Ok(())
    }

    #[test]
    fn test_from_missing_directory() {
        match PostIndex::from_directory(Path::new("./testdata/does-not-exist/")) {
            Err(Error::ReadDirectory { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_directory_malformed() {
        match PostIndex::from_directory(Path::new("./testdata/malformed/")) {
            Err(Error::Post(post::Error::Annotated(path, _))) => {
                assert!(path.ends_with("no-title.md"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

//! Loads the project file (`quire.yaml`) and resolves it into a [`Config`].

use crate::util::open;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "quire.yaml";

#[derive(Deserialize)]
struct Project {
    title: String,

    #[serde(default)]
    site_url: Option<Url>,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default = "default_posts_directory")]
    posts_directory: PathBuf,

    #[serde(default = "default_static_directory")]
    static_directory: PathBuf,

    #[serde(default = "default_output_directory")]
    output_directory: PathBuf,

    #[serde(default)]
    theme: Theme,
}

fn default_posts_directory() -> PathBuf {
    PathBuf::from("posts")
}

fn default_static_directory() -> PathBuf {
    PathBuf::from("public")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("out")
}

/// Template files overriding the built-in ones. Paths are relative to the
/// project file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Theme {
    #[serde(default)]
    pub index: Option<PathBuf>,

    #[serde(default)]
    pub post: Option<PathBuf>,

    #[serde(default)]
    pub tag: Option<PathBuf>,
}

/// The author credited in the Atom feed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// The resolved configuration for a build. All paths are absolute or
/// relative to the working directory.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub title: String,
    pub site_url: Option<Url>,
    pub author: Option<Author>,
    pub posts_directory: PathBuf,
    pub static_directory: PathBuf,
    pub output_directory: PathBuf,
    pub theme: Theme,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a `quire.yaml` and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for candidate in dir.ancestors() {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .with_context(|| format!("Loading configuration `{}`", path.display()));
            }
        }
        Err(anyhow!(
            "Could not find `{}` in `{}` or any parent directory",
            PROJECT_FILE,
            dir.display()
        ))
    }

    /// Loads a project file. Relative paths inside it are resolved against
    /// the directory containing the file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = match path.parent() {
            Some(parent) => parent,
            None => {
                return Err(anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                ))
            }
        };

        if let Some(url) = &project.site_url {
            if url.cannot_be_a_base() {
                return Err(anyhow!("`site_url` must be an absolute URL, got `{}`", url));
            }
        }

        let resolve = |relpath: &Path| project_root.join(relpath);
        Ok(Config {
            title: project.title,
            site_url: project.site_url.map(with_trailing_slash),
            author: project.author,
            posts_directory: resolve(&project.posts_directory),
            static_directory: resolve(&project.static_directory),
            output_directory: resolve(&project.output_directory),
            theme: Theme {
                index: project.theme.index.as_deref().map(resolve),
                post: project.theme.post.as_deref().map(resolve),
                tag: project.theme.tag.as_deref().map(resolve),
            },
        })
    }
}

// `Url::join` treats the last path segment as a file name unless the path
// ends in a slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let config = Config::from_directory(Path::new("./testdata/posts"))?;
        assert_eq!("Test blog", config.title);
        assert_eq!(Path::new("./testdata/posts"), config.posts_directory);
        assert_eq!(Path::new("./testdata/public"), config.static_directory);
        assert_eq!(
            Some("https://blog.example.org/"),
            config.site_url.as_ref().map(Url::as_str)
        );
        assert_eq!(
            Some(Author {
                name: "Test Author".to_owned(),
                email: None,
            }),
            config.author
        );
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        writeln!(std::fs::File::create(&path)?, "title: Minimal")?;

        let config = Config::from_project_file(&path)?;
        assert_eq!(dir.path().join("posts"), config.posts_directory);
        assert_eq!(dir.path().join("public"), config.static_directory);
        assert_eq!(dir.path().join("out"), config.output_directory);
        assert_eq!(None, config.site_url);
        assert_eq!(Theme::default(), config.theme);
        Ok(())
    }

    #[test]
    fn test_theme_paths_resolved() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        writeln!(
            std::fs::File::create(&path)?,
            "title: Themed\nsite_url: https://example.org/blog\ntheme:\n  post: theme/post.html"
        )?;

        let config = Config::from_project_file(&path)?;
        assert_eq!(Some(dir.path().join("theme/post.html")), config.theme.post);
        assert_eq!(None, config.theme.index);
        assert_eq!(
            Some("https://example.org/blog/"),
            config.site_url.as_ref().map(Url::as_str)
        );
        Ok(())
    }

    #[test]
    fn test_missing_title() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        writeln!(std::fs::File::create(&path)?, "posts_directory: posts")?;
        assert!(Config::from_project_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(Config::from_directory(dir.path()).is_err());
        Ok(())
    }
}

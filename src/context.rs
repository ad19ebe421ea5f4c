//! Defines [`BuildContext`], the state shared by every page generated in a
//! single build. It is constructed once, up front, and passed by reference to
//! each page-generation step.

use std::path::{Path, PathBuf};

use log::debug;
use url::Url;

use crate::config::Config;
use crate::index::{Error, PostIndex, Result};
use crate::markdown::Renderer;
use crate::post::{read_post, PostData, PostLink, PostMeta, MARKDOWN_EXTENSION};

pub struct BuildContext {
    posts_directory: PathBuf,
    index: PostIndex,
    renderer: Renderer,
}

impl BuildContext {
    /// Indexes the posts in `posts_directory`. `site_url`, if known, lets the
    /// markdown renderer recognize absolute links back to the site.
    pub fn new(posts_directory: &Path, site_url: Option<&Url>) -> Result<BuildContext> {
        Ok(BuildContext {
            posts_directory: posts_directory.to_owned(),
            index: PostIndex::from_directory(posts_directory)?,
            renderer: Renderer::new(site_url),
        })
    }

    pub fn from_config(config: &Config) -> Result<BuildContext> {
        Self::new(&config.posts_directory, config.site_url.as_ref())
    }

    pub fn index(&self) -> &PostIndex {
        &self.index
    }

    pub fn posts_by_tag(&self, tag: &str) -> Vec<&PostMeta> {
        self.index.posts_by_tag(tag)
    }

    /// The source path for the post identified by `slug`.
    pub fn source_path(&self, slug: &str) -> PathBuf {
        self.posts_directory
            .join(format!("{}{}", slug, MARKDOWN_EXTENSION))
    }

    /// Loads a post's full content: its frontmatter, its body rendered to
    /// HTML and its neighbours in the index. Fails with [`Error::NotFound`]
    /// if no indexed post has this slug or its file has gone missing.
    pub fn post_data(&self, slug: &str) -> Result<PostData> {
        let adjacency = self.index.adjacency(slug)?;
        let path = self.source_path(slug);
        if !path.is_file() {
            return Err(Error::NotFound(slug.to_owned()));
        }

        let (meta, body) = read_post(&path, slug)?;
        let content_html = self.renderer.render(&body)?;
        debug!("rendered post `{}`", slug);

        Ok(PostData {
            slug: meta.slug,
            date: meta.date,
            title: meta.title,
            tags: meta.tags,
            description: meta.description,
            image: meta.image,
            content_html,
            prev: adjacency.prev.map(PostLink::from),
            next: adjacency.next.map(PostLink::from),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn context() -> Result<BuildContext> {
        BuildContext::new(Path::new("./testdata/posts/"), None)
    }

    #[test]
    fn test_post_data() -> Result<()> {
        let ctx = context()?;
        let post = ctx.post_data("second-steps")?;
        assert_eq!("Second steps", post.title);
        assert_eq!("2021-02-14", post.date);
        assert_eq!(
            Some("Where to go after hello world.".to_owned()),
            post.description
        );
        assert_eq!(Some("tagging-things"), post.prev.as_ref().map(|p| p.slug.as_str()));
        assert_eq!(Some("hello-world"), post.next.as_ref().map(|p| p.slug.as_str()));
        assert!(post.content_html.contains("<h2>Next</h2>"));
        let link = format!(
            r#"<a href="https://www.rust-lang.org/" {}>"#,
            crate::htmlrenderer::EXTERNAL_LINK_ATTRS
        );
        assert!(post.content_html.contains(&link));
        Ok(())
    }

    #[test]
    fn test_post_data_newest_has_no_prev() -> Result<()> {
        let ctx = context()?;
        let post = ctx.post_data("tagging-things")?;
        assert_eq!(None, post.prev);
        assert_eq!(Some("second-steps"), post.next.as_ref().map(|p| p.slug.as_str()));
        Ok(())
    }

    #[test]
    fn test_post_data_not_found() -> Result<()> {
        let ctx = context()?;
        match ctx.post_data("nope") {
            Err(Error::NotFound(slug)) => assert_eq!("nope", slug),
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_posts_by_tag() -> Result<()> {
        let ctx = context()?;
        let slugs: Vec<&str> = ctx
            .posts_by_tag("rust")
            .into_iter()
            .map(|p| p.slug.as_str())
            .collect();
        assert_eq!(vec!["tagging-things", "second-steps"], slugs);
        Ok(())
    }
}

//! Converts post bodies from markdown to sanitized HTML. Raw HTML in the
//! source is escaped, links with unsafe schemes are emptied, and links to
//! other hosts are annotated by [`crate::htmlrenderer`].

use crate::htmlrenderer;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};
use std::io;
use url::{ParseError, Url};

/// URL schemes a link or image may point at. Anything else (e.g.
/// `javascript:`) is replaced with an empty destination.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Schemes that make a link external when its host isn't the site's own.
const EXTERNAL_SCHEMES: &[&str] = &["http", "https"];

/// Renders markdown into HTML. A `Renderer` that knows the site's URL treats
/// absolute links to that host as internal.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    site_host: Option<String>,
}

impl Renderer {
    pub fn new(site_url: Option<&Url>) -> Renderer {
        Renderer {
            site_host: site_url.and_then(|url| url.host_str()).map(str::to_owned),
        }
    }

    /// Returns `true` if `dest` is an absolute `http`/`https` URL pointing
    /// somewhere other than the site itself.
    pub fn is_external(&self, dest: &str) -> bool {
        match Url::parse(dest) {
            Ok(url) => {
                EXTERNAL_SCHEMES.contains(&url.scheme())
                    && match (&self.site_host, url.host_str()) {
                        (Some(site), Some(host)) => !site.eq_ignore_ascii_case(host),
                        _ => true,
                    }
            }
            Err(_) => false,
        }
    }

    /// Converts `markdown` into HTML.
    pub fn render(&self, markdown: &str) -> io::Result<String> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut html = String::with_capacity(markdown.len() * 3 / 2);
        let is_external = |dest: &str| self.is_external(dest);
        htmlrenderer::push_html(
            &mut html,
            Parser::new_ext(markdown, options).map(sanitize),
            &is_external,
        )?;
        Ok(html)
    }
}

/// Renders `markdown` with a [`Renderer`] that considers every absolute
/// `http`/`https` link external.
pub fn render(markdown: &str) -> io::Result<String> {
    Renderer::default().render(markdown)
}

fn is_safe_url(dest: &str) -> bool {
    match Url::parse(dest) {
        Ok(url) => SAFE_SCHEMES.contains(&url.scheme()),
        // Relative paths, fragments and email autolinks.
        Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn sanitize_dest(dest: CowStr) -> CowStr {
    match is_safe_url(&dest) {
        true => dest,
        false => CowStr::Borrowed(""),
    }
}

fn sanitize_tag(tag: Tag) -> Tag {
    match tag {
        Tag::Link(link_type, dest, title) => Tag::Link(link_type, sanitize_dest(dest), title),
        Tag::Image(link_type, dest, title) => Tag::Image(link_type, sanitize_dest(dest), title),
        _ => tag,
    }
}

// Raw HTML is demoted to text so the renderer escapes it.
fn sanitize(ev: Event) -> Event {
    match ev {
        Event::Start(tag) => Event::Start(sanitize_tag(tag)),
        Event::End(tag) => Event::End(sanitize_tag(tag)),
        Event::Html(html) => Event::Text(html),
        _ => ev,
    }
}

//! Implements a custom [`push_html`] so that links leaving the site can be
//! annotated. [`pulldown_cmark::html::push_html`] writes every link the same
//! way, but links to other hosts should open in a new browsing context
//! without handing it a reference back to the blog.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::fmt::{self, Display};
use std::io;

/// The attributes added to links that point away from the site.
pub const EXTERNAL_LINK_ATTRS: &str = r#"target="_blank" rel="nofollow noopener noreferrer""#;

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

struct EscapeHref<'a>(CowStr<'a>);

impl<'a> Display for EscapeHref<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, &self.0);
        adaptor.result
    }
}

struct EscapeHtml<'a>(CowStr<'a>);

impl<'a> Display for EscapeHtml<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };

        let _ = escape_html(&mut adaptor, &self.0);
        adaptor.result
    }
}

enum TableState {
    Head,
    Body,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private `HtmlWriter` struct.
struct HtmlRenderer<'r> {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    /// Titles of the images whose alt text is currently being written. While
    /// this is non-empty, events are flattened into plain alt text.
    image_titles: Vec<String>,

    /// Decides whether a link destination leaves the site.
    is_external: &'r dyn Fn(&str) -> bool,
}

impl<'a> HtmlRenderer<'_> {
    fn on_event<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        if !self.image_titles.is_empty() {
            return self.on_alt_event(w, event);
        }
        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => self.on_code(w, code),
            Event::FootnoteReference(name) => {
                let name = EscapeHtml(name);
                write!(
                    w,
                    r##"<sup class="footnote-reference"><a href="#{}">{}</a></sup>"##,
                    &name, &name,
                )
            }
            Event::HardBreak => self.on_hard_break(w),
            Event::Html(html) => escape_html(w, &html),
            Event::Rule => self.on_rule(w),
            Event::SoftBreak => self.on_soft_break(w),
            Event::TaskListMarker(checked) => self.on_task_list_marker(w, checked),
            Event::Text(text) => self.on_text(w, text),
        }
    }

    /// Handles events nested inside an image, whose text becomes the
    /// `alt` attribute.
    fn on_alt_event<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        match event {
            Event::Start(Tag::Image(..)) => {
                self.image_titles.push(String::new());
                Ok(())
            }
            Event::End(Tag::Image(..)) => {
                let title = self.image_titles.pop().unwrap_or_default();
                if !self.image_titles.is_empty() {
                    return Ok(());
                }
                if title.is_empty() {
                    w.write_str(r#"" />"#)
                } else {
                    write!(w, r#"" title="{}" />"#, EscapeHtml(CowStr::from(title)))
                }
            }
            Event::Text(text) | Event::Code(text) => escape_html(w, &text),
            Event::SoftBreak | Event::HardBreak => w.write_str(" "),
            _ => Ok(()),
        }
    }
}

impl<'a, 'r> HtmlRenderer<'r> {
    fn new(is_external: &'r dyn Fn(&str) -> bool) -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            image_titles: Vec::default(),
            is_external,
        }
    }

    fn on_start<W: StrWrite>(&mut self, w: &mut W, tag: Tag<'a>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>"),
            Tag::CodeBlock(kind) => match kind {
                CodeBlockKind::Fenced(info) => match info.split(' ').next() {
                    Some(lang) if !lang.is_empty() => write!(
                        w,
                        r#"<pre><code class="language-{}">"#,
                        EscapeHtml(CowStr::from(lang))
                    ),
                    _ => w.write_str("<pre><code>"),
                },
                CodeBlockKind::Indented => w.write_str("<pre><code>"),
            },
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => {
                let name = EscapeHtml(name);
                write!(
                    w,
                    r#"<div class="footnote-definition" id="{}"><sup class="footnote-definition-label">{}</sup>"#,
                    &name, &name,
                )
            }
            Tag::Heading(level) => write!(w, "<h{}>", level),
            Tag::Image(_link_type, dest, title) => {
                write!(w, r#"<img src="{}" alt=""#, EscapeHref(dest))?;
                self.image_titles.push(title.to_string());
                Ok(())
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(LinkType::Email, dest, title) => {
                write!(w, r#"<a href="mailto:{}""#, EscapeHref(dest))?;
                self.write_title(w, title)?;
                w.write_str(">")
            }
            Tag::Link(_link_type, dest, title) => {
                let external = (self.is_external)(&*dest);
                write!(w, r#"<a href="{}""#, EscapeHref(dest))?;
                self.write_title(w, title)?;
                if external {
                    write!(w, " {}", EXTERNAL_LINK_ATTRS)?;
                }
                w.write_str(">")
            }
            Tag::List(None) => w.write_str("<ul>"),
            Tag::List(Some(1)) => w.write_str("<ol>"),
            Tag::List(Some(start)) => write!(w, r#"<ol start="{}">"#, start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_end<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>"),
            Tag::Heading(level) => write!(w, "</h{}>", level),
            Tag::Image(..) => Ok(()), // closed by `on_alt_event`
            Tag::Item => w.write_str("</li>"),
            Tag::Link(..) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>"),
            Tag::List(None) => w.write_str("</ul>"),
            Tag::Paragraph => w.write_str("</p>"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn write_title<W: StrWrite>(&mut self, w: &mut W, title: CowStr) -> io::Result<()> {
        match title.is_empty() {
            true => Ok(()),
            false => write!(w, r#" title="{}""#, EscapeHtml(title)),
        }
    }

    fn on_text<W: StrWrite>(&mut self, w: &mut W, s: CowStr) -> io::Result<()> {
        escape_html(w, &s)
    }

    fn on_code<W: StrWrite>(&mut self, w: &mut W, s: CowStr) -> io::Result<()> {
        write!(w, "<code>{}</code>", EscapeHtml(s))
    }

    fn on_soft_break<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_str("\n")
    }

    fn on_hard_break<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_str("<br />")
    }

    fn on_rule<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_str("<hr />")
    }

    fn on_task_list_marker<W: StrWrite>(&mut self, w: &mut W, checked: bool) -> io::Result<()> {
        write!(
            w,
            r#"<input disabled="" type="checkbox" {}/>"#,
            match checked {
                true => r#"checked="" "#,
                false => "",
            }
        )
    }
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html` except that links for which
/// `is_external` returns `true` carry [`EXTERNAL_LINK_ATTRS`] and image alt
/// text is flattened from the image's inline content. Raw HTML is written
/// as escaped text.
pub fn push_html<'a, I>(
    out: &mut String,
    events: I,
    is_external: &dyn Fn(&str) -> bool,
) -> io::Result<()>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new(is_external);
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pulldown_cmark::Parser;

    fn render(markdown: &str) -> String {
        let mut out = String::new();
        push_html(&mut out, Parser::new(markdown), &|dest: &str| {
            dest.starts_with("https://")
        })
        .unwrap();
        out
    }

    #[test]
    fn test_external_link() {
        assert_eq!(
            r#"<p><a href="https://example.org/" target="_blank" rel="nofollow noopener noreferrer">out</a></p>"#,
            render("[out](https://example.org/)").trim_end()
        );
    }

    #[test]
    fn test_internal_link_with_title() {
        assert_eq!(
            r#"<p><a href="/posts/a.html" title="A &amp; B">in</a></p>"#,
            render(r#"[in](/posts/a.html "A & B")"#).trim_end()
        );
    }

    #[test]
    fn test_image_alt_text() {
        assert_eq!(
            r#"<p><img src="cat.png" alt="a fat cat" title="Cat" /></p>"#,
            render(r#"![a *fat* `cat`](cat.png "Cat")"#).trim_end()
        );
    }

    #[test]
    fn test_raw_html_escaped() {
        let out = render("<script>alert(1)</script>\n\nhi <b>there</b>");
        assert!(out.contains("&lt;script&gt;alert(1)&lt;/script&gt;"), "{}", out);
        assert!(out.contains("hi &lt;b&gt;there&lt;/b&gt;"), "{}", out);
        assert!(!out.contains("<script>"));
        assert!(!out.contains("<b>"));
    }

    #[test]
    fn test_heading_and_code_block() {
        assert_eq!(
            "<h2>Title</h2><pre><code class=\"language-rust\">fn main() {}\n</code></pre>",
            render("## Title\n\n```rust\nfn main() {}\n```\n").trim_end()
        );
    }
}

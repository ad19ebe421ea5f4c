//! Conversions from posts and tags into template [`Value`]s. Every metadata
//! string is HTML-escaped on the way in; rendered post bodies are passed
//! through untouched. URLs are relative to the page being rendered, whose
//! distance from the output root is given as `root` (`""` or `"../"`).

use crate::post::{PostData, PostLink, PostMeta};
use crate::tag::Tag;
use gtmpl::Value;
use pulldown_cmark::escape::escape_html;
use std::collections::{BTreeSet, HashMap};

pub fn escaped(s: &str) -> Value {
    let mut out = String::with_capacity(s.len());
    // Writing into a `String` can't fail.
    let _ = escape_html(&mut out, s);
    Value::String(out)
}

fn optional(s: &Option<String>) -> Value {
    match s {
        Some(s) => escaped(s),
        None => Value::Nil,
    }
}

pub fn post_url(root: &str, slug: &str) -> String {
    format!("{}posts/{}.html", root, slug)
}

pub fn tag_value(root: &str, tag: &Tag) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("name".to_owned(), escaped(&tag.name));
    m.insert("url".to_owned(), escaped(&format!("{}{}", root, tag.path())));
    Value::Object(m)
}

fn tags_value(root: &str, tags: &BTreeSet<String>) -> Value {
    Value::Array(tags.iter().map(|t| tag_value(root, &Tag::new(t))).collect())
}

/// The summary of a post used on index and tag pages.
pub fn summary_value(root: &str, post: &PostMeta) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("slug".to_owned(), escaped(&post.slug));
    m.insert("url".to_owned(), escaped(&post_url(root, &post.slug)));
    m.insert("title".to_owned(), escaped(&post.title));
    m.insert("date".to_owned(), escaped(&post.date));
    m.insert("description".to_owned(), optional(&post.description));
    m.insert("tags".to_owned(), tags_value(root, &post.tags));
    Value::Object(m)
}

fn link_value(root: &str, link: &Option<PostLink>) -> Value {
    match link {
        Some(link) => {
            let mut m: HashMap<String, Value> = HashMap::new();
            m.insert("url".to_owned(), escaped(&post_url(root, &link.slug)));
            m.insert("title".to_owned(), escaped(&link.title));
            m.insert("date".to_owned(), escaped(&link.date));
            Value::Object(m)
        }
        None => Value::Nil,
    }
}

/// The full post, including its rendered body and neighbours.
pub fn post_value(root: &str, post: &PostData) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("slug".to_owned(), escaped(&post.slug));
    m.insert("title".to_owned(), escaped(&post.title));
    m.insert("date".to_owned(), escaped(&post.date));
    m.insert("description".to_owned(), optional(&post.description));
    m.insert("image".to_owned(), optional(&post.image));
    m.insert("tags".to_owned(), tags_value(root, &post.tags));
    m.insert(
        "content_html".to_owned(),
        Value::String(post.content_html.clone()),
    );
    m.insert("prev".to_owned(), link_value(root, &post.prev));
    m.insert("next".to_owned(), link_value(root, &post.next));
    Value::Object(m)
}

#[cfg(test)]
mod test {
    use super::*;

    fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
        match value {
            Value::Object(m) => &m[key],
            _ => panic!("not an object"),
        }
    }

    fn string<'a>(value: &'a Value) -> &'a str {
        match value {
            Value::String(s) => s,
            _ => panic!("not a string"),
        }
    }

    #[test]
    fn test_summary_escapes_title() {
        let post = PostMeta {
            slug: "amp".to_owned(),
            date: "2020-01-01".to_owned(),
            title: "Tom & <Jerry>".to_owned(),
            tags: vec!["Web Dev".to_owned()].into_iter().collect(),
            description: None,
            image: None,
        };
        let value = summary_value("../", &post);
        assert_eq!("Tom &amp; &lt;Jerry&gt;", string(field(&value, "title")));
        assert_eq!("../posts/amp.html", string(field(&value, "url")));
        assert!(matches!(field(&value, "description"), Value::Nil));
        match field(&value, "tags") {
            Value::Array(tags) => {
                assert_eq!(1, tags.len());
                assert_eq!("Web Dev", string(field(&tags[0], "name")));
                assert_eq!("../tags/web-dev.html", string(field(&tags[0], "url")));
            }
            _ => panic!("tags is not an array"),
        }
    }

    #[test]
    fn test_post_value_keeps_html() {
        let post = PostData {
            slug: "p".to_owned(),
            date: "2020-01-01".to_owned(),
            title: "P".to_owned(),
            tags: BTreeSet::new(),
            description: None,
            image: None,
            content_html: "<p>hi</p>".to_owned(),
            prev: None,
            next: Some(PostLink {
                slug: "older".to_owned(),
                title: "Older".to_owned(),
                date: "2019-01-01".to_owned(),
            }),
        };
        let value = post_value("../", &post);
        assert_eq!("<p>hi</p>", string(field(&value, "content_html")));
        assert!(matches!(field(&value, "prev"), Value::Nil));
        assert_eq!(
            "../posts/older.html",
            string(field(field(&value, "next"), "url"))
        );
    }
}

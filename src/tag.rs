//! Defines the [`Tag`] type, which pairs a tag as written in a post's
//! frontmatter with the file name of its tag page.

use std::hash::{Hash, Hasher};

/// A tag together with its page location. Two tags are equal when their
/// names are equal.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as written in the frontmatter.
    pub name: String,

    /// The slugified name, so that e.g. `C++` and `Web Dev` can be dropped
    /// into a file name or URL. The tag page lives at `tags/{slug}.html`.
    pub slug: String,
}

impl Tag {
    pub fn new(name: &str) -> Tag {
        Tag {
            name: name.to_owned(),
            slug: slug::slugify(name),
        }
    }

    /// The page path relative to the output root.
    pub fn path(&self) -> String {
        format!("tags/{}.html", self.slug)
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!("web-dev", Tag::new("Web Dev").slug);
        assert_eq!("tags/rust.html", Tag::new("rust").path());
    }

    #[test]
    fn test_equality_by_name() {
        assert_eq!(Tag::new("rust"), Tag::new("rust"));
        assert_ne!(Tag::new("Rust"), Tag::new("rust"));
    }
}

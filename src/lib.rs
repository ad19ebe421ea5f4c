//! The library code for the `quire` static blog generator. A build runs in
//! two steps:
//!
//! 1. Indexing the posts on disk ([`crate::index`]): every markdown file's
//!    frontmatter is parsed ([`crate::post`]) and the posts are ordered by
//!    date, grouped by tag and linked to their neighbours. The resulting
//!    [`crate::context::BuildContext`] is built once and shared by every page.
//! 2. Writing the site ([`crate::write`]): the home page, one page per post
//!    (its body rendered by [`crate::markdown`]), one page per tag, the Atom
//!    feed ([`crate::feed`]) and the static assets.
//!
//! [`crate::build::build_site`] runs both steps for a [`crate::config::Config`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod context;
pub mod feed;
pub mod htmlrenderer;
pub mod index;
pub mod markdown;
pub mod post;
pub mod tag;
pub mod util;
pub mod value;
pub mod write;

//! Technology product catalog lookups

pub mod matcher;
pub mod slug;

pub use matcher::{ProductMatch, ProductMatcher};
pub use slug::slugify;

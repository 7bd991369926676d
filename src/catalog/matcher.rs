//! Linear lookup cascade from a free-text product name to a catalog entry.

use std::collections::HashMap;

use super::slug::slugify;
use crate::core::models::{MatchConfidence, MatchType, ProductAlias, TechProduct};

/// Shortest slug that may take part in a substring match.
pub const MIN_SUBSTRING_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductMatch {
    pub product: TechProduct,
    pub confidence: MatchConfidence,
    pub match_type: MatchType,
}

/// In-memory view of the catalog, kept in load order so that "first hit" is stable.
pub struct ProductMatcher {
    products: Vec<TechProduct>,
    aliases: HashMap<String, String>,
}

impl ProductMatcher {
    #[must_use]
    pub fn new(products: Vec<TechProduct>, aliases: Vec<ProductAlias>) -> Self {
        let mut alias_map = HashMap::with_capacity(aliases.len());
        for alias in aliases {
            let key = slugify(&alias.alias);
            if !key.is_empty() {
                alias_map.entry(key).or_insert(alias.product_slug);
            }
        }

        Self {
            products,
            aliases: alias_map,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[must_use]
    pub fn by_slug(&self, slug: &str) -> Option<&TechProduct> {
        self.products.iter().find(|p| p.slug == slug)
    }

    /// Runs alias, exact-slug, exact-name and substring checks in that order.
    #[must_use]
    pub fn find(&self, input: &str) -> Option<ProductMatch> {
        let slug = slugify(input);
        if slug.is_empty() {
            return None;
        }

        if let Some(product) = self.aliases.get(&slug).and_then(|target| self.by_slug(target)) {
            return Some(hit(product, MatchConfidence::High, MatchType::Alias));
        }

        if let Some(product) = self.by_slug(&slug) {
            return Some(hit(product, MatchConfidence::High, MatchType::Slug));
        }

        let wanted = normalise_name(input);
        if let Some(product) = self
            .products
            .iter()
            .find(|p| normalise_name(&p.product_name) == wanted)
        {
            return Some(hit(product, MatchConfidence::Medium, MatchType::Name));
        }

        if slug.chars().count() < MIN_SUBSTRING_LEN {
            return None;
        }

        self.products
            .iter()
            .filter(|p| p.slug.chars().count() >= MIN_SUBSTRING_LEN)
            .find(|p| slug.contains(p.slug.as_str()) || p.slug.contains(slug.as_str()))
            .map(|p| hit(p, MatchConfidence::Low, MatchType::Substring))
    }
}

fn hit(product: &TechProduct, confidence: MatchConfidence, match_type: MatchType) -> ProductMatch {
    ProductMatch {
        product: product.clone(),
        confidence,
        match_type,
    }
}

fn normalise_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

//! Resolves a product name typed by a client to a catalog entry, researching
//! unknown products with the LLM and adding them to the catalog for review.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::catalog::{ProductMatcher, slugify};
use crate::clients::llm_client::{ChatModel, CompletionRequest, build_messages};
use crate::clients::store::{Query, Store};
use crate::core::config::AppConfig;
use crate::core::models::{
    DiscoverRequest, DiscoverResponse, MatchConfidence, MatchType, ProductAlias, TechProduct,
};
use crate::errors::PortalError;
use crate::features::typed_rows;
use crate::prompt::discovery::{DISCOVERY_SYSTEM_PROMPT, build_discovery_prompt};
use crate::prompt::sanitize_product_name;
use crate::utils::json_extract::parse_llm_json;
use crate::utils::lenient::{lenient_opt_f64, lenient_string, null_as_default};

/// What the LLM reports about an unknown product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResearchedProduct {
    #[serde(deserialize_with = "lenient_bool")]
    pub is_real_product: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub product_name: String,
    pub vendor: Option<String>,
    pub category: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub pricing_model: Option<String>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub price_entry_gbp: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub uk_strong: Option<bool>,
    #[serde(deserialize_with = "null_as_default")]
    pub has_zapier: Option<bool>,
    pub market_position: Option<String>,
}

/// `true`, `"true"`, `"yes"` and non-zero numbers count as true.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ResearchedProduct {
    /// Catalog entry for the researched product, falling back to the
    /// client's category when the LLM gave none.
    #[must_use]
    pub fn to_product(&self, category_hint: Option<&str>) -> TechProduct {
        let name = self.product_name.trim();
        TechProduct {
            slug: slugify(name),
            product_name: name.to_string(),
            vendor: non_blank(self.vendor.as_deref()),
            category: non_blank(self.category.as_deref()).or_else(|| non_blank(category_hint)),
            market_position: non_blank(self.market_position.as_deref()),
            uk_strong: self.uk_strong,
            has_zapier: self.has_zapier,
            pricing_model: non_blank(self.pricing_model.as_deref()),
            price_entry_gbp: self.price_entry_gbp,
            website: non_blank(self.website.as_deref()),
            description: non_blank(self.description.as_deref()),
        }
    }
}

/// # Errors
///
/// Returns a store error when the catalog cannot be read.
pub async fn load_catalog(store: &dyn Store) -> Result<ProductMatcher, PortalError> {
    let products_q = Query::table("sa_tech_products").order("product_name", true);
    let aliases_q = Query::table("sa_tech_product_aliases").select("alias, product_slug");

    let (products, aliases) =
        futures::try_join!(store.select(&products_q), store.select(&aliases_q))?;

    let products: Vec<TechProduct> = typed_rows("sa_tech_products", products);
    let aliases: Vec<ProductAlias> = typed_rows("sa_tech_product_aliases", aliases);
    Ok(ProductMatcher::new(products, aliases))
}

fn alias_row(alias: &str, product_slug: &str) -> Value {
    json!({
        "alias": alias,
        "alias_slug": slugify(alias),
        "product_slug": product_slug,
    })
}

fn product_row(product: &TechProduct) -> Result<Value, PortalError> {
    let mut row = serde_json::to_value(product)
        .map_err(|e| PortalError::StoreError(format!("Cannot serialise product: {e}")))?;
    if let Value::Object(map) = &mut row {
        map.insert("discovery_source".to_string(), json!("ai"));
        map.insert("needs_review".to_string(), json!(true));
    }
    Ok(row)
}

async fn queue_for_review(
    store: &dyn Store,
    request: &DiscoverRequest,
    product_name: &str,
    message: &str,
    raw: &str,
) {
    let row = json!({
        "product_name": product_name,
        "product_slug": slugify(product_name),
        "category_hint": request.category,
        "status": "pending",
        "error": message,
        "raw_llm_output": raw,
    });
    if let Err(e) = store.insert("sa_tech_discovery_queue", row).await {
        error!(product_name = %product_name, "Failed to queue product for review: {}", e);
    }
}

/// Matches `request.product_name` against the catalog, researching it with
/// the LLM on a miss when discovery is allowed.
///
/// # Errors
///
/// Returns a validation error for a bad product name, a config error when
/// discovery needs an LLM that is not configured, and store or LLM
/// transport errors.
#[tracing::instrument(level = "info", skip(store, llm, config))]
pub async fn discover_product(
    store: &dyn Store,
    llm: Option<&dyn ChatModel>,
    config: &AppConfig,
    request: &DiscoverRequest,
) -> Result<DiscoverResponse, PortalError> {
    let product_name =
        sanitize_product_name(&request.product_name).map_err(PortalError::ValidationError)?;

    let catalog = load_catalog(store).await?;
    info!(products = catalog.len(), "Catalog loaded");

    if let Some(hit) = catalog.find(&product_name) {
        info!(
            slug = %hit.product.slug,
            match_type = ?hit.match_type,
            confidence = ?hit.confidence,
            "Matched catalog product"
        );
        return Ok(DiscoverResponse::matched(hit.product, hit.confidence, hit.match_type));
    }

    if !request.allow_discovery {
        return Ok(DiscoverResponse::not_found(&format!(
            "No catalog match for \"{product_name}\""
        )));
    }

    let llm = llm.ok_or_else(PortalError::llm_not_configured)?;
    let completion = llm
        .complete(CompletionRequest {
            model: config.discovery_model.clone(),
            messages: build_messages(
                Some(DISCOVERY_SYSTEM_PROMPT),
                &build_discovery_prompt(&product_name, request.category.as_deref()),
            ),
            temperature: 0.1,
            max_tokens: 1000,
            title: "SA Tech Discovery".to_string(),
        })
        .await?;

    let researched: ResearchedProduct = match parse_llm_json(&completion.text) {
        Ok(r) => r,
        Err(PortalError::LlmParse { message, raw }) => {
            warn!(product_name = %product_name, "Discovery reply parse error: {}", message);
            queue_for_review(store, request, &product_name, &message, &raw).await;
            return Ok(DiscoverResponse {
                pending_review: true,
                ..DiscoverResponse::not_found("Product queued for manual review")
            });
        }
        Err(e) => return Err(e),
    };

    let canonical = researched.product_name.trim();
    if !researched.is_real_product || slugify(canonical).is_empty() {
        info!(product_name = %product_name, "LLM did not recognise product");
        return Ok(DiscoverResponse::not_found(&format!(
            "\"{product_name}\" is not a recognised product"
        )));
    }

    let input_slug = slugify(&product_name);

    // The LLM's canonical name may already be in the catalog under another spelling.
    if let Some(existing) = catalog
        .find(canonical)
        .filter(|hit| hit.match_type != MatchType::Substring)
    {
        store
            .upsert(
                "sa_tech_product_aliases",
                alias_row(&product_name, &existing.product.slug),
                "alias_slug",
            )
            .await?;
        info!(
            alias = %product_name,
            slug = %existing.product.slug,
            "Recorded alias for existing product"
        );
        return Ok(DiscoverResponse::matched(
            existing.product,
            MatchConfidence::Medium,
            MatchType::DiscoveredAlias,
        ));
    }

    let product = researched.to_product(request.category.as_deref());
    store
        .upsert("sa_tech_products", product_row(&product)?, "slug")
        .await?;
    if product.slug != input_slug {
        store
            .upsert(
                "sa_tech_product_aliases",
                alias_row(&product_name, &product.slug),
                "alias_slug",
            )
            .await?;
    }

    info!(
        slug = %product.slug,
        tokens = completion.usage.total_tokens,
        time_ms = completion.elapsed_ms,
        "Discovered new product"
    );
    Ok(DiscoverResponse::discovered(product))
}

use super::section;

pub const DISCOVERY_SYSTEM_PROMPT: &str = "You are a research assistant cataloguing business software used by UK \
small and medium businesses. You only describe products you are confident exist. \
Always return valid JSON and nothing else.";

/// Research prompt for a product name that the catalog does not know.
#[must_use]
pub fn build_discovery_prompt(product_name: &str, category_hint: Option<&str>) -> String {
    let hint = category_hint
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("The client listed it under the category: {c}\n"))
        .unwrap_or_default();

    format!(
        r#"
{header}

A client listed the following system in their technology inventory:
"{product_name}"
{hint}
Identify the software product they most likely mean. Correct obvious typos and
expand abbreviations (e.g. "QBO" is QuickBooks Online). If you cannot identify a
real, commercially available product, set "isRealProduct" to false.

Return a JSON object with this structure:

{{
  "isRealProduct": true,
  "productName": "Canonical product name",
  "vendor": "Company that sells it",
  "category": "accounting|crm|project_management|payroll|hr|practice_management|time_tracking|invoicing|payments|reporting|document_management|communication|other",
  "website": "https://...",
  "description": "One sentence describing what it does",
  "pricingModel": "per_user|flat|tiered|usage|free|unknown",
  "priceEntryGbp": number or null,
  "ukStrong": true|false,
  "hasZapier": true|false,
  "marketPosition": "leader|challenger|niche|legacy"
}}

Return ONLY valid JSON.
"#,
        header = section("PRODUCT RESEARCH"),
    )
}

use practice_portal::clients::store::{Filter, Query, scalar};
use practice_portal::clients::SupabaseClient;
use serde_json::json;

fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[test]
fn test_query_params_order() {
    let query = Query::table("ma_financial_snapshots")
        .select("id, period_end_date")
        .eq("engagement_id", "eng-1")
        .lt("period_end_date", "2025-03-31")
        .order("period_end_date", false)
        .limit(12);

    assert_eq!(
        pairs(&query.to_params()),
        vec![
            ("select", "id,period_end_date"),
            ("engagement_id", "eq.eng-1"),
            ("period_end_date", "lt.2025-03-31"),
            ("order", "period_end_date.desc"),
            ("limit", "12"),
        ]
    );
}

#[test]
fn test_default_select_is_everything() {
    let params = Query::table("sa_tech_products").order("product_name", true).to_params();
    assert_eq!(
        pairs(&params),
        vec![("select", "*"), ("order", "product_name.asc")]
    );
}

#[test]
fn test_filter_expressions() {
    assert_eq!(Filter::Gte("period_year".into(), json!(2023)).expression(), "gte.2023");
    assert_eq!(Filter::Eq("is_active".into(), json!(true)).expression(), "eq.true");
    assert_eq!(
        Filter::In("status".into(), vec![json!("draft"), json!("edited")]).expression(),
        "in.(draft,edited)"
    );
    assert_eq!(scalar(&json!(null)), "null");
}

#[test]
fn test_supabase_table_url() {
    let client = SupabaseClient::with_credentials("https://abc.supabase.co/", "service-key")
        .expect("client should build");
    let query = Query::table("sa_engagements").eq("id", "e 1");
    let url = client
        .table_url(&query.table, &query.to_params())
        .expect("url should build");

    assert_eq!(url.path(), "/rest/v1/sa_engagements");
    let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        decoded,
        vec![
            ("select".to_string(), "*".to_string()),
            ("id".to_string(), "eq.e 1".to_string()),
        ]
    );
}

#[test]
fn test_supabase_rejects_unusable_key() {
    assert!(SupabaseClient::with_credentials("https://abc.supabase.co", "bad\nkey").is_err());
}

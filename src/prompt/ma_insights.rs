use chrono::NaiveDate;
use serde_json::Value;

use super::{sanitize_interpolated, section};
use crate::features::ma_insights::types::{ClientContext, FinancialSnapshot, IndustryBenchmark};
use crate::utils::format::{format_currency, format_percent, or_na};

/// Trend tables never show more than a year of history.
pub const MAX_TREND_ROWS: usize = 12;

pub const MA_SYSTEM_PROMPT: &str = "You are a senior management accountant. You translate financial data into actionable insights that connect to the client's life goals. Always return valid JSON. Be specific with numbers. Use the client's exact words when available.";

fn period_date(period_end_date: &str) -> Option<NaiveDate> {
    let day = period_end_date.get(..10).unwrap_or(period_end_date);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// `2025-03-31` → `Mar 25`
#[must_use]
pub fn short_month(period_end_date: &str) -> String {
    period_date(period_end_date)
        .map_or_else(|| period_end_date.to_string(), |d| d.format("%b %y").to_string())
}

/// `2025-03-31` → `March 2025`
#[must_use]
pub fn long_month(period_end_date: &str) -> String {
    period_date(period_end_date)
        .map_or_else(|| period_end_date.to_string(), |d| d.format("%B %Y").to_string())
}

/// Markdown table of prior periods, newest first.
#[must_use]
pub fn build_trend_table(snapshots: &[FinancialSnapshot]) -> String {
    if snapshots.is_empty() {
        return "No historical data available".to_string();
    }

    let mut table =
        String::from("| Month | Revenue | Gross % | Net % | Cash |\n|---|---|---|---|---|");
    for s in snapshots.iter().take(MAX_TREND_ROWS) {
        table.push_str(&format!(
            "\n| {} | {} | {} | {} | {} |",
            short_month(&s.period_end_date),
            format_currency(s.revenue),
            or_na(s.gross_margin_pct, "%"),
            or_na(s.net_margin_pct, "%"),
            format_currency(s.cash_position),
        ));
    }
    table
}

fn quoted_list(phrases: &[String]) -> String {
    phrases
        .iter()
        .map(|p| format!("- \"{}\"", sanitize_interpolated(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn client_block(ctx: &ClientContext) -> String {
    let mut out = format!(
        "Company: {}\nIndustry: {}\nClient Name: {}\n",
        ctx.company_name, ctx.industry, ctx.client_name
    );

    if let Some(north_star) = &ctx.north_star {
        out.push_str(&format!(
            "\nNORTH STAR (their ultimate life goal):\n\"{}\"\n",
            sanitize_interpolated(north_star)
        ));
    }
    if let Some(archetype) = &ctx.archetype {
        out.push_str(&format!("\nClient Archetype: {archetype}\n"));
    }
    if !ctx.desire_phrases.is_empty() {
        out.push_str(&format!(
            "\nWHAT THEY WANT (use these exact words):\n{}\n",
            quoted_list(&ctx.desire_phrases)
        ));
    }
    if !ctx.pain_phrases.is_empty() {
        out.push_str(&format!(
            "\nWHAT THEY'RE TRYING TO ESCAPE (use these exact words):\n{}\n",
            quoted_list(&ctx.pain_phrases)
        ));
    }
    if !ctx.known_goals.is_empty() {
        let goals = ctx
            .known_goals
            .iter()
            .map(|g| format!("- {}", sanitize_interpolated(g)))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!("\nKNOWN GOALS/DECISIONS THEY'RE CONSIDERING:\n{goals}\n"));
    }
    out
}

fn numbers_block(s: &FinancialSnapshot) -> String {
    format!(
        r"PROFIT & LOSS
Revenue: {revenue}
  vs Prior Month: {vs_month}
  vs Prior Year: {vs_year}
  vs Budget: {vs_budget}

Gross Profit: {gross} ({gross_pct})
Operating Profit: {operating} ({operating_pct})
Net Profit: {net} ({net_pct})

BALANCE SHEET
Cash: {cash}
  vs Prior Month: {cash_delta}
Debtors: {debtors} ({debtor_days})
Creditors: {creditors} ({creditor_days})

EFFICIENCY
Headcount: {headcount}
Revenue per Head: {per_head}
Staff Costs as % Revenue: {staff_pct}",
        revenue = format_currency(s.revenue),
        vs_month = format_percent(s.revenue_vs_prior_month_pct),
        vs_year = format_percent(s.revenue_vs_prior_year_pct),
        vs_budget = format_percent(s.revenue_vs_budget_pct),
        gross = format_currency(s.gross_profit),
        gross_pct = or_na(s.gross_margin_pct, "%"),
        operating = format_currency(s.operating_profit),
        operating_pct = or_na(s.operating_margin_pct, "%"),
        net = format_currency(s.net_profit),
        net_pct = or_na(s.net_margin_pct, "%"),
        cash = format_currency(s.cash_position),
        cash_delta = format_currency(s.cash_vs_prior_month),
        debtors = format_currency(s.debtors_total),
        debtor_days = or_na(s.debtors_days, " days"),
        creditors = format_currency(s.creditors_total),
        creditor_days = or_na(s.creditors_days, " days"),
        headcount = or_na(s.headcount, ""),
        per_head = format_currency(s.revenue_per_head),
        staff_pct = or_na(s.staff_cost_pct_revenue, "%"),
    )
}

fn benchmark_block(s: &FinancialSnapshot, b: &IndustryBenchmark) -> String {
    format!(
        r"{heading}

Your Position vs Industry:
- Gross Margin: Client {gm} vs Median {gm_median} (Top quartile: {gm_top})
- Net Margin: Client {nm} vs Median {nm_median} (Top quartile: {nm_top})
- Debtor Days: Client {dd} vs Median {dd_median} (Top quartile: {dd_top})
- Revenue per Head: Client {rph} vs Median {rph_median}
",
        heading = section(&format!(
            "INDUSTRY BENCHMARKS ({})\nRevenue Band: {} | Sample: {} companies",
            b.industry_name,
            b.revenue_band.replace('_', " "),
            or_na(b.sample_size, "")
        )),
        gm = or_na(s.gross_margin_pct, "%"),
        gm_median = or_na(b.median_gross_margin_pct, "%"),
        gm_top = or_na(b.top_quartile_gross_margin_pct, "%"),
        nm = or_na(s.net_margin_pct, "%"),
        nm_median = or_na(b.median_net_margin_pct, "%"),
        nm_top = or_na(b.top_quartile_net_margin_pct, "%"),
        dd = or_na(s.debtors_days, ""),
        dd_median = or_na(b.median_debtor_days, ""),
        dd_top = or_na(b.top_quartile_debtor_days, ""),
        rph = format_currency(s.revenue_per_head),
        rph_median = format_currency(b.median_revenue_per_head),
    )
}

const INSTRUCTIONS: &str = r#"1. USE THEIR EXACT WORDS from emotional anchors where possible
2. BE SPECIFIC WITH NUMBERS - no vague statements like "strong performance"
3. THE HEADLINE should be quotable - something they'd text to their partner
4. CONNECT EVERYTHING to their life goal, not just business metrics
5. LIMIT TO 3-5 INSIGHTS MAXIMUM - quality over quantity
6. BE HONEST about bad news but frame constructively
7. DECISIONS ENABLED should answer questions they were probably wondering about

BANNED PHRASES (never use these):
- "Here's the truth:" or "Here's what I see:"
- "In a world where..."
- "I want to be direct with you" (just BE direct)
- "Strong performance" or "solid results" (too vague)
- "Moving forward" or "going forward""#;

const OUTPUT_FORMAT: &str = r#"Generate a JSON response with this exact structure:

{
  "headline": {
    "text": "One quotable sentence with specific numbers capturing this month",
    "sentiment": "positive|neutral|warning|critical"
  },
  "insights": [
    {
      "category": "revenue|margin|cash|efficiency|growth|risk",
      "finding": "What the numbers objectively show (include specific figures)",
      "implication": "What this means for their business and LIFE goals",
      "action": "Specific thing they could do about it (optional)",
      "urgency": "info|consider|action_needed"
    }
  ],
  "decisionsEnabled": [
    {
      "decision": "A decision they can now confidently make",
      "supportingData": ["Data point 1", "Data point 2"],
      "consideration": "One thing to keep in mind before acting (optional)"
    }
  ],
  "watchList": [
    {
      "metric": "What to monitor",
      "currentValue": "Where it is now (with units)",
      "threshold": "When it becomes concerning",
      "checkDate": "When to check again"
    }
  ],
  "northStarConnection": {
    "narrative": "2-3 sentences connecting this month to their North Star, using their exact words",
    "sentiment": "closer|stable|further"
  },
  "benchmarkHighlights": {
    "strengths": ["Where they beat the industry median"],
    "concerns": ["Where they trail it"]
  }
}

QUALITY RULES:
- Maximum 5 insights, 3 decisions enabled and 4 watch list items
- Every insight must have a specific number in the finding
- The headline must be under 25 words
- If data is missing, don't make up numbers - just note it's unavailable

Return ONLY valid JSON. No markdown, no explanation, just the JSON object."#;

/// Monthly-pack prompt for one financial snapshot.
#[must_use]
pub fn build_snapshot_prompt(
    snapshot: &FinancialSnapshot,
    prior: &[FinancialSnapshot],
    ctx: &ClientContext,
    benchmark: Option<&IndustryBenchmark>,
) -> String {
    let benchmark_text = benchmark
        .map(|b| format!("\n{}", benchmark_block(snapshot, b)))
        .unwrap_or_default();

    format!(
        r"You are a senior management accountant preparing narrative insights for a monthly management pack.
Your role is to translate numbers into decisions, connecting financial reality to life goals.

{instructions_heading}

{instructions}

{client_heading}

{client}
{numbers_heading}

{numbers}

{trend_heading}

{trend}
{benchmark_text}
{task_heading}

{output_format}
",
        instructions_heading = section("CRITICAL INSTRUCTIONS"),
        instructions = INSTRUCTIONS,
        client_heading = section("CLIENT CONTEXT"),
        client = client_block(ctx),
        numbers_heading = section(&format!(
            "THIS MONTH'S NUMBERS ({})",
            long_month(&snapshot.period_end_date)
        )),
        numbers = numbers_block(snapshot),
        trend_heading = section("TREND CONTEXT (12-Month History)"),
        trend = build_trend_table(prior),
        task_heading = section("YOUR TASK"),
        output_format = OUTPUT_FORMAT,
    )
}

fn pretty(value: Option<&Value>) -> String {
    let value = value.cloned().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    serde_json::to_string_pretty(&value)
        .map(|s| sanitize_interpolated(&s))
        .unwrap_or_default()
}

fn member_field<'a>(client: Option<&'a Value>, key: &str) -> &'a str {
    client
        .and_then(|c| c.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Unknown")
}

/// Prompt for a client who has answered the management-accounts assessment
/// but has no financial snapshot yet.
#[must_use]
pub fn build_assessment_prompt(
    client: Option<&Value>,
    assessment: &Value,
    documents_uploaded: usize,
) -> String {
    format!(
        r#"You are a management accounts advisor generating personalized insights for a client.

## CLIENT INFORMATION
Name: {name}
Company: {company}
Industry: {industry}

## ASSESSMENT RESPONSES
{responses}

## EXTRACTED INSIGHTS
{insights}

## DOCUMENTS UPLOADED
{documents_uploaded} documents uploaded

## YOUR TASK
Based on the client's assessment responses, generate:

1. **Headline** (1 sentence): A personalized summary of their financial visibility situation
2. **Key Insights** (3-5): Observations about their relationship with numbers and what they need
3. **Quick Wins** (2-3): Immediate actions that would help them
4. **Recommended Approach**: How we should approach their management accounts engagement
5. **Connection to Goals**: How better financial visibility connects to what they said they want

Use their exact words and phrases where possible. Be specific, not generic.

Respond with ONLY valid JSON, starting with {{ and ending with }}:
{{
  "headline": {{ "text": "...", "sentiment": "positive|neutral|warning" }},
  "keyInsights": [{{ "finding": "...", "implication": "...", "action": "..." }}],
  "quickWins": [{{ "action": "...", "impact": "...", "timeframe": "..." }}],
  "recommendedApproach": {{ "summary": "...", "frequency": "...", "focusAreas": ["..."] }},
  "goalsConnection": {{ "narrative": "...", "theirWords": ["..."] }}
}}
"#,
        name = member_field(client, "name"),
        company = member_field(client, "company"),
        industry = member_field(client, "industry"),
        responses = pretty(assessment.get("responses")),
        insights = pretty(assessment.get("extracted_insights")),
    )
}

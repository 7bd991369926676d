use serde_json::Value;

use super::{sanitize_interpolated, section};
use crate::features::sa_report::types::{DeepDiveRow, Pass1Output, SystemInventoryRow};
use crate::utils::lenient::value_as_string;

const NOT_PROVIDED: &str = "Not provided";

fn field(row: &Value, key: &str) -> String {
    let text = row.get(key).map(value_as_string).unwrap_or_default();
    if text.trim().is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        sanitize_interpolated(&text)
    }
}

fn list_field(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(value_as_string)
            .collect::<Vec<_>>()
            .join(", "),
        _ => NOT_PROVIDED.to_string(),
    }
}

fn opt_num(value: Option<f64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn system_details(system: &SystemInventoryRow) -> String {
    let manual = if system.manual_transfer_required {
        format!(
            "YES - {} hrs/mo",
            opt_num(system.manual_hours_monthly)
        )
    } else {
        "No".to_string()
    };

    format!(
        r#"
**{name}** ({category})
- Criticality: {criticality}
- Cost: £{cost}/mo
- Users: {users} ({primary_users})
- Integration: {integration}
- Manual transfer required: {manual}
- Data quality: {quality}/5
- User satisfaction: {satisfaction}/5
- Known issues: "{issues}"
- Workarounds: "{workarounds}"
- Future plan: {plan}
"#,
        name = system.system_name,
        category = system.category_code,
        criticality = system.criticality.as_deref().unwrap_or("unknown"),
        cost = system.monthly_cost.unwrap_or(0.0),
        users = opt_num(system.number_of_users),
        primary_users = system.primary_users.join(", "),
        integration = system.integration_method.as_deref().unwrap_or("none"),
        quality = opt_num(system.data_quality_score),
        satisfaction = opt_num(system.user_satisfaction),
        issues = system.known_issues.as_deref().unwrap_or("None specified"),
        workarounds = system.workarounds_in_use.as_deref().unwrap_or("None specified"),
        plan = system.future_plan.as_deref().unwrap_or("keep"),
    )
}

/// `quote_to_cash` → `QUOTE TO CASH`
#[must_use]
pub fn chain_heading(chain_code: &str) -> String {
    chain_code.to_uppercase().replace('_', " ")
}

fn deep_dive_details(dive: &DeepDiveRow) -> String {
    let pains = dive
        .key_pain_points
        .iter()
        .map(|p| format!("- \"{}\"", sanitize_interpolated(p)))
        .collect::<Vec<_>>()
        .join("\n");
    let responses = dive
        .responses
        .iter()
        .map(|(k, v)| format!("- {k}: {}", sanitize_interpolated(&v.to_string())))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\n### {}\n\n**Pain Points (their words):**\n{pains}\n\n**All Responses:**\n{responses}\n",
        chain_heading(&dive.chain_code)
    )
}

/// Extraction prompt: turns discovery answers, the system inventory and the
/// process deep dives into structured facts, findings and scores.
#[must_use]
pub fn build_pass1_prompt(
    discovery: &Value,
    systems: &[SystemInventoryRow],
    deep_dives: &[DeepDiveRow],
    client_name: &str,
) -> String {
    let system_block = systems.iter().map(system_details).collect::<Vec<_>>().join("\n");
    let dive_block = deep_dives
        .iter()
        .map(deep_dive_details)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"
You are extracting structured data from a Systems Audit assessment. Your job is to:
1. Extract ALL facts, numbers, and quotes
2. Analyze each system's integration status
3. Analyze each process chain's gaps
4. Generate specific findings tied to systems and processes
5. Calculate realistic hours wasted

{discovery_header}

Company: {client_name}
Team Size: {team_size} → {team_size_12mo} (12mo)
Revenue: {revenue}
Industry: {industry}

**BREAKING POINT (verbatim):**
"{breaking_point}"

**MONTH-END SHAME (verbatim):**
"{month_end_shame}"

**EXPENSIVE MISTAKE (verbatim):**
"{expensive_mistake}"

**MAGIC FIX - THEIR EXACT GOAL (verbatim):**
"{magic_fix}"

Operations diagnosis: {diagnosis}
Manual hours estimate: {manual_hours}
Month-end close: {close}
Data errors: {errors}
Integration rating: {integration_rating}
Critical spreadsheets: {spreadsheets}
Change appetite: {appetite}
Fears: {fears}
Champion: {champion}

{systems_header}

{system_block}

{dives_header}

{dive_block}

{task_header}

Analyze the data and return a JSON object with this structure:

{{
  "facts": {{
    "companyName": "{client_name}",
    "teamSize": number,
    "projectedTeamSize": number,
    "growthMultiplier": number,
    "revenueBand": "string",
    "industry": "string",
    "breakingPoint": "EXACT verbatim quote",
    "monthEndShame": "EXACT verbatim quote",
    "expensiveMistake": "EXACT verbatim quote",
    "magicFix": "EXACT verbatim quote - do not paraphrase",
    "northStar": null,
    "fears": ["fear1", "fear2"],
    "systems": [
      {{
        "name": "System name",
        "category": "category",
        "criticality": "critical|important|nice_to_have",
        "monthlyCost": number,
        "integrationMethod": "native|zapier_make|custom_api|manual|none",
        "integratesWith": ["other system names"],
        "gaps": ["specific integration gap"],
        "strengths": ["what it does well"],
        "manualHours": number per month,
        "dataQuality": 1-5,
        "userSatisfaction": 1-5,
        "painPoints": ["pain from deep dives relating to this system"]
      }}
    ],
    "totalSystemCost": number,
    "criticalSystems": ["names"],
    "disconnectedSystems": ["systems with no/manual integration"],
    "integrationGaps": ["System A doesn't talk to System B, causing X"],
    "processes": [
      {{
        "chainCode": "quote_to_cash",
        "chainName": "Quote-to-Cash",
        "keyPainPoints": ["verbatim pain points"],
        "specificMetrics": {{ "quoteTimeMins": 90 }},
        "hoursWasted": hours per month,
        "criticalGaps": ["gap causing waste"],
        "clientQuotes": ["relevant quotes"]
      }}
    ],
    "metrics": {{
      "quoteTimeMins": number,
      "invoiceLagDays": number,
      "reportingLagDays": number,
      "monthEndCloseDays": number,
      "targetCloseDays": number,
      "debtorDays": number,
      "transactionVolume": number,
      "invoiceVolume": number,
      "apVolume": number,
      "employeeCount": number
    }},
    "hoursWastedWeekly": number,
    "annualCostOfChaos": hours * 35 * 52,
    "projectedCostAtScale": annual * growth multiplier,
    "allClientQuotes": ["every significant verbatim quote"]
  }},
  "findings": [
    {{
      "severity": "critical|high|medium|low",
      "category": "integration_gap|manual_process|data_silo|single_point_failure|scalability_risk",
      "title": "Specific title referencing system or process",
      "description": "What's broken and why, using their words",
      "evidence": ["Specific data point"],
      "clientQuote": "Their exact words",
      "affectedSystems": ["Xero"],
      "affectedProcesses": ["quote_to_cash"],
      "hoursWastedWeekly": number,
      "annualCostImpact": number,
      "scalabilityImpact": "What happens at 1.5x growth",
      "recommendation": "Specific fix"
    }}
  ],
  "quickWins": [
    {{
      "title": "Action with system name",
      "action": "Step 1, Step 2, Step 3",
      "systems": ["Xero"],
      "timeToImplement": "X hours",
      "hoursSavedWeekly": number,
      "annualBenefit": number,
      "impact": "Specific outcome"
    }}
  ],
  "recommendations": [
    {{
      "priorityRank": 1,
      "title": "Recommendation with systems",
      "description": "How this fixes their specific problems",
      "category": "quick_win|foundation|strategic|optimization",
      "implementationPhase": "immediate|short_term|medium_term|long_term",
      "systemsInvolved": ["Xero"],
      "processesFixed": ["quote_to_cash"],
      "estimatedCost": number,
      "hoursSavedWeekly": number,
      "annualBenefit": number,
      "paybackMonths": number,
      "freedomUnlocked": "Connects to their magic fix verbatim"
    }}
  ],
  "scores": {{
    "integration": {{ "score": 0-100, "evidence": "X of Y systems have no integration" }},
    "automation": {{ "score": 0-100, "evidence": "Specific manual processes" }},
    "dataAccessibility": {{ "score": 0-100, "evidence": "Reporting lag and unanswerable questions" }},
    "scalability": {{ "score": 0-100, "evidence": "At 1.5x growth, X breaks because Y" }}
  }}
}}

RULES:
1. Every finding must reference specific systems AND processes
2. Every recommendation must list which systems and processes it fixes
3. Use EXACT verbatim quotes - do not paraphrase their magic fix
4. Calculate hours realistically based on their actual volumes
5. Integration gaps must name both systems involved
6. Quick wins must be implementable in under 1 week

Return ONLY valid JSON.
"#,
        discovery_header = section("DISCOVERY DATA"),
        team_size = field(discovery, "team_size"),
        team_size_12mo = field(discovery, "expected_team_size_12mo"),
        revenue = field(discovery, "revenue_band"),
        industry = field(discovery, "industry_sector"),
        breaking_point = field(discovery, "systems_breaking_point"),
        month_end_shame = field(discovery, "month_end_shame"),
        expensive_mistake = field(discovery, "expensive_systems_mistake"),
        magic_fix = field(discovery, "magic_process_fix"),
        diagnosis = field(discovery, "operations_self_diagnosis"),
        manual_hours = field(discovery, "manual_hours_monthly"),
        close = field(discovery, "month_end_close_duration"),
        errors = field(discovery, "data_error_frequency"),
        integration_rating = field(discovery, "integration_rating"),
        spreadsheets = field(discovery, "critical_spreadsheets"),
        appetite = field(discovery, "change_appetite"),
        fears = list_field(discovery, "systems_fears"),
        champion = field(discovery, "internal_champion"),
        systems_header = section(&format!("SYSTEM INVENTORY ({} systems)", systems.len())),
        dives_header = section(&format!("PROCESS DEEP DIVES ({} processes)", deep_dives.len())),
        task_header = section("YOUR TASK"),
    )
}

/// Narrative prompt: writes the prose sections from the extraction output.
#[must_use]
pub fn build_pass2_prompt(pass1: &Pass1Output) -> String {
    let f = &pass1.facts;

    let system_names = f.systems.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ");
    let process_names = f
        .processes
        .iter()
        .map(|p| p.chain_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let system_lines = f
        .systems
        .iter()
        .map(|s| {
            if s.gaps.is_empty() {
                format!("- {}: Working well", s.name)
            } else {
                format!("- {}: GAPS: {}", s.name, s.gaps.join("; "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let gap_lines = f
        .integration_gaps
        .iter()
        .map(|g| format!("- {g}"))
        .collect::<Vec<_>>()
        .join("\n");

    let process_lines = f
        .processes
        .iter()
        .map(|p| {
            let pains = p
                .key_pain_points
                .iter()
                .map(|pp| format!("\"{pp}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "\n**{}**\n- Pain points: {pains}\n- Hours wasted: {}/month\n- Critical gaps: {}\n",
                p.chain_name,
                p.hours_wasted,
                p.critical_gaps.join("; ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let finding_lines = pass1
        .findings
        .iter()
        .enumerate()
        .map(|(i, finding)| {
            format!(
                "\n{}. [{}] {}\n   Systems: {}\n   Processes: {}\n   Quote: \"{}\"\n   Cost: £{}/year\n",
                i + 1,
                finding.severity.label(),
                finding.title,
                finding.affected_systems.join(", "),
                finding.affected_processes.join(", "),
                finding.client_quote,
                finding.annual_cost_impact
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let quote_lines = f
        .all_client_quotes
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. \"{q}\"", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let m = &f.metrics;

    format!(
        r#"
You are a senior consultant writing the narrative sections of a Systems Audit report.

You have been given structured facts, findings, and recommendations extracted from the
client's assessment. Write compelling, specific prose that:

1. LEADS WITH THEIR EXPENSIVE MISTAKE as proof this matters
2. QUOTES THEIR MAGIC FIX VERBATIM - not paraphrased
3. References SPECIFIC SYSTEMS by name ({system_names})
4. References SPECIFIC PROCESSES ({process_names})
5. Uses THEIR EXACT WORDS throughout
6. Could only apply to THIS specific business

{words_header}

BREAKING POINT:
"{breaking_point}"

MONTH-END SHAME:
"{month_end_shame}"

EXPENSIVE MISTAKE (lead with this as proof):
"{expensive_mistake}"

MAGIC FIX (quote this exactly - this is their goal):
"{magic_fix}"

{systems_header}

{system_lines}

Integration gaps identified:
{gap_lines}

{processes_header}

{process_lines}

{metrics_header}

- Team: {team} → {projected_team} ({growth}x growth)
- Hours wasted weekly: {hours}
- Annual cost: {annual_cost}
- At scale: {scale_cost}

Key metrics from deep dives:
- Quote creation: {quote_mins} mins (should be 30)
- Invoice lag: {invoice_lag} days (should be 2)
- Reporting lag: {reporting_lag} days (should be 5-7)
- Month-end close: {close_days} days (target: {target_close})

{findings_header}

{finding_lines}

{quotes_header}

{quote_lines}

{task_header}

Write these narrative sections:

{{
  "headline": "Under 25 words. Must include a specific number AND reference their goal. Quotable.",
  "executiveSummary": "Three paragraphs. 1: lead with their expensive mistake and connect it to their breaking point. 2: name the systems that don't talk to each other, using their numbers ({quote_mins}-min quotes, {invoice_lag}-day invoice lag, {reporting_lag}-day reporting) and quoting their month-end shame. 3: quote their magic fix verbatim and show how the recommendations deliver each part of it.",
  "costOfChaosNarrative": "One paragraph breaking down where the {hours} hours come from by process, using their expensive mistake as proof and showing what {growth}x growth means for each pain point.",
  "timeFreedomNarrative": "One paragraph quoting their magic fix exactly and mapping each recommendation to each part of their goal."
}}

WRITING RULES:
- NO generic phrases: streamline, leverage, optimize, best practices, digital transformation
- NO AI patterns: "I want to be direct", "Let me be honest", "Here's the truth"
- EVERY paragraph must name specific systems or processes
- EVERY paragraph must include at least one verbatim client quote
- The magic fix must be quoted EXACTLY, not paraphrased

Return ONLY valid JSON with these four fields.
"#,
        words_header = section("THEIR WORDS (use these verbatim)"),
        breaking_point = f.breaking_point,
        month_end_shame = f.month_end_shame,
        expensive_mistake = f.expensive_mistake,
        magic_fix = f.magic_fix,
        systems_header = section("THEIR SYSTEMS (reference by name)"),
        processes_header = section("THEIR PROCESSES (reference by name)"),
        metrics_header = section("CALCULATED METRICS"),
        team = f.team_size,
        projected_team = f.projected_team_size,
        growth = f.growth_multiplier,
        hours = f.hours_wasted_weekly,
        annual_cost = crate::utils::format::format_currency(Some(f.annual_cost_of_chaos)),
        scale_cost = crate::utils::format::format_currency(Some(f.projected_cost_at_scale)),
        quote_mins = m.quote_time_mins,
        invoice_lag = m.invoice_lag_days,
        reporting_lag = m.reporting_lag_days,
        close_days = m.month_end_close_days,
        target_close = m.target_close_days,
        findings_header = section("FINDINGS TO REFERENCE"),
        quotes_header = section("CLIENT QUOTES AVAILABLE"),
        task_header = section("YOUR TASK"),
    )
}

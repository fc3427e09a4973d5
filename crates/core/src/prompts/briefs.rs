use crate::errors::ForceError;
use crate::fiscal::DateRange;
use crate::soql::{contains_pattern, escape_literal};

use super::{check_range, Brief, PromptContext, DAYS_STALLED_RANGE, LIMIT_RANGE};

const OPPORTUNITY_FIELDS: &str = "Id, Name, Amount, StageName, Stage_Detail__c, CloseDate, Probability,
       Account.Name, Account.BillingCountry, Owner.Name,
       Channel_Manager__c, Partner__c, Partner__r.Name, Partner_Source_Influence__c";

const OPPORTUNITY_FIELDS_EXTENDED: &str = "Id, Name, Amount, StageName, Stage_Detail__c, CloseDate, Probability,
       Account.Name, Account.BillingCountry, Owner.Name,
       Channel_Manager__c, Partner__c, Partner__r.Name, Partner_Source_Influence__c,
       Primary_Partner_Total__c, Partner_Reseller_Percentage__c, Type";

const PARTNER_ID_PLACEHOLDER: &str = "<PARTNER_ACCOUNT_ID>";

fn intro(ctx: &PromptContext, focus: &str) -> String {
    format!(
        "You are assisting a Channel Director covering {} ({}) {focus}.",
        ctx.region_name,
        ctx.countries_prose()
    )
}

fn region_filter(ctx: &PromptContext) -> String {
    format!("  AND Account.BillingCountry IN {}", ctx.countries_soql())
}

fn year_close_filter(ctx: &PromptContext) -> String {
    format!("  AND {}", ctx.fiscal.year.soql_filter("CloseDate"))
}

/// Resolves an optional quarter to `(label, range)`; blank means the full year.
fn period(ctx: &PromptContext, quarter: Option<&str>) -> Result<(String, DateRange), ForceError> {
    match quarter.map(str::trim).filter(|value| !value.is_empty()) {
        Some(name) => {
            let (quarter, range) = ctx.fiscal.resolve(name)?;
            Ok((ctx.fiscal.quarter_label(quarter), range))
        }
        None => Ok((ctx.fiscal.label.clone(), ctx.fiscal.year)),
    }
}

fn required_quarter(
    ctx: &PromptContext,
    quarter: Option<&str>,
) -> Result<(String, DateRange), ForceError> {
    period(ctx, Some(quarter.map(str::trim).filter(|value| !value.is_empty()).unwrap_or("Q1")))
}

pub fn quarterly_pipeline_analysis(
    ctx: &PromptContext,
    quarter: Option<&str>,
) -> Result<Brief, ForceError> {
    let (label, range) = required_quarter(ctx, quarter)?;

    Ok(Brief::new(format!("Quarterly Open Pipeline Analysis: {label}"))
        .context(intro(ctx, "with quarterly pipeline reviews"))
        .context(ctx.fiscal_year_line())
        .task(format!("Analyze all OPEN opportunities closing in {label}."))
        .query(
            "SOQL Query to execute",
            &[
                &format!("SELECT {OPPORTUNITY_FIELDS}"),
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &format!("  AND {}", range.soql_filter("CloseDate")),
                &region_filter(ctx),
                "ORDER BY Amount DESC",
            ],
        )
        .section("Pipeline by Country", &["Total value and count per country"])
        .section(
            "Partner Coverage",
            &["Opportunities WITH a partner vs WITHOUT a partner (count and value)"],
        )
        .section("Top 5 Deals", &["Largest opportunities by Amount"])
        .section("Stage Distribution", &["Pipeline value by StageName"])
        .section("Partner Source vs Influence", &["Breakdown by Partner_Source_Influence__c"])
        .closing(
            "Present findings as a structured report with tables where appropriate. \
             Highlight any country with less than 30% partner coverage as a concern.",
        ))
}

/// `full_year` wins when set; otherwise a given quarter narrows the period.
/// `full_year = false` without a quarter has no period to analyse.
pub fn closed_won_partner_analysis(
    ctx: &PromptContext,
    quarter: Option<&str>,
    full_year: Option<bool>,
) -> Result<Brief, ForceError> {
    let quarter = quarter.map(str::trim).filter(|value| !value.is_empty());
    let (label, range) = match (full_year, quarter) {
        (Some(true), _) | (None, None) => period(ctx, None)?,
        (_, Some(name)) => period(ctx, Some(name))?,
        (Some(false), None) => {
            return Err(ForceError::validation(
                "closed_won_partner_analysis needs a quarter when full_year is false",
            ))
        }
    };

    Ok(Brief::new(format!("Closed-Won Partner Contribution: {label}"))
        .context(intro(ctx, "with partner revenue attribution"))
        .context(ctx.fiscal_year_line())
        .task(format!("Analyze all CLOSED-WON opportunities in {label}."))
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Id, Name, Amount, CloseDate, Account.Name, Account.BillingCountry,",
                "       Owner.Name, Channel_Manager__c, Partner__c, Partner__r.Name,",
                "       Partner_Source_Influence__c, Primary_Partner_Total_Contract_Value__c",
                "FROM Opportunity",
                "WHERE IsWon = true",
                &format!("  AND {}", range.soql_filter("CloseDate")),
                &region_filter(ctx),
                "ORDER BY Amount DESC NULLS LAST",
            ],
        )
        .section("Total Closed-Won Revenue", &["Sum of Amount"])
        .section(
            "Partner Contribution Breakdown",
            &[
                "Source (partner originated the deal)",
                "Influence (partner helped close)",
                "Fulfillment (partner delivers or implements)",
            ],
        )
        .section("Top 10 Partners", &["Ranked by Primary_Partner_Total_Contract_Value__c"])
        .section("Partner Share", &["Percentage of total revenue involving a partner"])
        .section("Country Performance", &["Closed-won by country with partner percentage"])
        .closing("Flag any country where partner contribution is below 40%."))
}

pub fn partner_engagement_health(ctx: &PromptContext) -> Brief {
    Brief::new("Partner Engagement Health Check")
        .context(intro(ctx, "focused on partner engagement"))
        .task("Audit partner engagement health across all active opportunities.")
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Account.Id, Account.Name, Account.BillingCountry, Account.Type,",
                "       Name, Amount, StageName, Stage_Detail__c,",
                "       Partner__c, Partner__r.Name, Partner_Source_Influence__c",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &region_filter(ctx),
                "ORDER BY Amount DESC",
            ],
        )
        .section(
            "Partner Engagement by Country",
            &[
                "Count of opportunities WITH a partner",
                "Count of opportunities WITHOUT a partner",
                "Partner coverage percentage per country",
            ],
        )
        .section(
            "High-Value Gaps",
            &[
                "Opportunities above 100K with NO partner attached",
                "List: Name, Amount, Stage, Account, Country",
            ],
        )
        .section(
            "Late-Stage Alerts (URGENT)",
            &[
                "Opportunities in 'Negotiation', 'Contracts' or 'Submitted to Finance' with NO partner",
                "These need immediate partner engagement or an explanation",
            ],
        )
        .section(
            "Account Multi-Opportunity Analysis",
            &[
                "Accounts with 3 or more active opportunities",
                "Flag if any of those opportunities lack a partner",
            ],
        )
        .closing("Provide specific recommendations for partner attachment.")
}

pub fn partner_sourced_pipeline(ctx: &PromptContext, limit: Option<u32>) -> Result<Brief, ForceError> {
    let limit = check_range("limit", limit.unwrap_or(10), LIMIT_RANGE)?;
    let year = year_close_filter(ctx);
    let region = region_filter(ctx);

    Ok(Brief::new(format!("Top {limit} Partner-Sourced Opportunities"))
        .context(intro(ctx, "tracking partner-sourced business"))
        .context(ctx.fiscal_year_line())
        .task(format!(
            "Identify the top {limit} PARTNER-SOURCED opportunities (the partner originated the deal)."
        ))
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Id, Name, Amount, StageName, Stage_Detail__c, CloseDate,",
                "       Account.Name, Account.BillingCountry, Owner.Name,",
                "       Partner__c, Partner__r.Name, Primary_Partner_Average_Percentage__c",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                "  AND Partner_Source_Influence__c = 'Source'",
                &year,
                &region,
                "ORDER BY Amount DESC NULLS LAST",
                &format!("LIMIT {limit}"),
            ],
        )
        .query(
            "Also run this aggregation",
            &[
                "SELECT Partner_Source_Influence__c, COUNT(Id) opp_count, SUM(Amount) total_value",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &year,
                &region,
                "GROUP BY Partner_Source_Influence__c",
            ],
        )
        .section(
            format!("Top {limit} Sourced Deals"),
            &["Table with Amount, Partner, Stage and Close Date"],
        )
        .section("Source vs Influence vs Fulfillment", &["Pipeline split (count and value)"])
        .section("Partner Leaderboard", &["Which partners source the most pipeline"])
        .section(
            "Average Partner Percentage",
            &["Mean Primary_Partner_Average_Percentage__c for sourced deals"],
        )
        .section("Stage Health", &["Are sourced deals progressing or stuck?"])
        .closing(
            "Sourced deals indicate strong partner relationships. Highlight top-performing partners.",
        ))
}

pub fn at_risk_pipeline(ctx: &PromptContext) -> Brief {
    Brief::new("At-Risk Pipeline")
        .context(intro(ctx, "with pipeline risk assessment"))
        .context(ctx.fiscal_year_line())
        .task("Identify AT-RISK opportunities: late stage with low probability.")
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Id, Name, Amount, Probability, StageName, Stage_Detail__c,",
                "       CloseDate, Owner.Name, Channel_Manager__c, Partner__c, Partner__r.Name,",
                "       Account.Name, Account.BillingCountry",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                "  AND StageName IN ('Contracts','Submitted to Finance','Negotiation')",
                "  AND Probability < 50",
                &year_close_filter(ctx),
                &region_filter(ctx),
                "ORDER BY Amount DESC",
            ],
        )
        .section(
            "Risk Summary",
            &[
                "Total count of at-risk opportunities",
                "Total value at risk (sum of Amount)",
                "Average probability of at-risk deals",
            ],
        )
        .section(
            "Risk Detail Table",
            &["| Opportunity | Amount | Stage | Probability | Partner | Owner | Close Date |"],
        )
        .section(
            "Partner Factor",
            &[
                "How many at-risk deals have a partner attached?",
                "Do partnered deals have higher or lower probability on average?",
            ],
        )
        .section("Overdue Analysis", &["Deals whose CloseDate has passed but are still open"])
        .section(
            "Recommended Actions",
            &["Prioritize by value", "Suggest partner engagement for unpartnered at-risk deals"],
        )
        .closing("Alert level: RED above 500K at risk, AMBER for 100K-500K, GREEN below 100K.")
}

pub fn new_vs_existing_business(
    ctx: &PromptContext,
    quarter: Option<&str>,
) -> Result<Brief, ForceError> {
    let (label, range) = period(ctx, quarter)?;

    Ok(Brief::new(format!("New vs Existing Business: {label}"))
        .context(intro(ctx, "analyzing business mix"))
        .context(ctx.fiscal_year_line())
        .task(format!("Analyze NEW vs EXISTING business pipeline for {label}."))
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Id, Name, Amount, StageName, CloseDate, Type,",
                "       Account.Name, Account.BillingCountry,",
                "       Partner__c, Partner__r.Name, Partner_Source_Influence__c",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &format!("  AND {}", range.soql_filter("CloseDate")),
                &region_filter(ctx),
                "ORDER BY Type, Amount DESC",
            ],
        )
        .section(
            "Business Mix Overview",
            &[
                "| Type | Count | Total Value | Avg Deal Size |",
                "New Business",
                "Existing Business",
                "Operational Only",
            ],
        )
        .section(
            "Partner Coverage by Type",
            &[
                "Percentage of New Business with a partner attached",
                "Percentage of Existing Business with a partner attached",
                "Which type has stronger partner engagement?",
            ],
        )
        .section("Country x Type Matrix", &["| Country | New Biz | Existing Biz | Partner % |"])
        .section(
            "Partner-Sourced New Business",
            &[
                "Count and value of new business where Partner_Source_Influence__c = 'Source'",
                "These are pure partner wins",
            ],
        )
        .section(
            "Strategic Insight",
            &[
                "Is the partner channel driving net-new logos or mainly upsell?",
                "Recommendations for improving partner sourcing of new business",
            ],
        ))
}

pub fn lead_conversion_analysis(ctx: &PromptContext) -> Brief {
    let year = &ctx.fiscal.year;
    let created = format!(
        "WHERE CreatedDate >= {}T00:00:00Z AND CreatedDate <= {}T23:59:59Z",
        year.start, year.end
    );

    Brief::new("Lead Conversion and Partner Attribution")
        .context(intro(ctx, "analyzing the lead funnel"))
        .context(ctx.fiscal_year_line())
        .task(format!(
            "Analyze leads created in {} with conversion and partner attribution.",
            ctx.fiscal.label
        ))
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Id, Name, Company, Status, Activity_Stage__c, Type__c,",
                "       LeadSource, Lead_Source_Attribution__c, Lead_Source_Detail__c,",
                "       Lead_Source_Sub_Detail__c, Matched_Account_Owner__c, IsConverted,",
                "       ConvertedDate, ConvertedOpportunityId, Country",
                "FROM Lead",
                &created,
                &format!("  AND Country IN {}", ctx.countries_soql()),
                "ORDER BY CreatedDate DESC",
            ],
        )
        .section(
            "Funnel Overview",
            &[
                "| Status | Count | % of Total |",
                "Open leads",
                "Converted leads",
                "Disqualified leads",
            ],
        )
        .section(
            "Conversion Rate",
            &["Overall conversion rate", "Conversion rate by country", "Conversion rate by LeadSource"],
        )
        .section(
            "Partner Attribution",
            &[
                "Leads where Lead_Source_Attribution__c indicates a partner",
                "Conversion rate of partner-attributed leads vs direct",
                "Top lead sources generating converted opportunities",
            ],
        )
        .section("Lead Source Breakdown", &["| LeadSource | Total | Converted | Conv Rate |"])
        .section(
            "Activity Stage Analysis",
            &["Distribution by Activity_Stage__c", "Identify bottlenecks in the funnel"],
        )
        .section(
            "Recommendations",
            &[
                "Which lead sources should get more investment?",
                "Partner channel lead generation effectiveness",
            ],
        )
}

pub fn stalled_opportunities(
    ctx: &PromptContext,
    days_stalled: Option<u32>,
) -> Result<Brief, ForceError> {
    let days = check_range("days_stalled", days_stalled.unwrap_or(60), DAYS_STALLED_RANGE)?;

    Ok(Brief::new(format!("Stalled Opportunities ({days}+ days)"))
        .context(intro(ctx, "identifying stalled deals"))
        .context(ctx.fiscal_year_line())
        .task(format!("Find open opportunities with NO modification in the last {days} days."))
        .query(
            "SOQL Query to execute",
            &[
                "SELECT Id, Name, Amount, StageName, Stage_Detail__c, CloseDate,",
                "       Account.Name, Account.BillingCountry, Owner.Name,",
                "       Channel_Manager__c, Partner__c, Partner__r.Name,",
                "       LastModifiedDate, LastActivityDate",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &year_close_filter(ctx),
                &region_filter(ctx),
                &format!("  AND LastModifiedDate < LAST_N_DAYS:{days}"),
                "ORDER BY Amount DESC",
            ],
        )
        .section(
            "Stalled Pipeline Summary",
            &[
                "Total count of stalled opportunities",
                "Total value of stalled pipeline",
                "Percentage of total open pipeline that is stalled",
            ],
        )
        .section(
            "Stalled Deals Table",
            &["| Opportunity | Amount | Stage | Last Modified | Partner | Owner |"],
        )
        .section(
            "Partner Impact",
            &[
                "Stalled deals WITH a partner vs WITHOUT a partner",
                "Are partnered deals less likely to stall?",
            ],
        )
        .section(
            "Stage Distribution of Stalled Deals",
            &[
                "Which stages have the most stalled opportunities?",
                "Early-stage stalls vs late-stage stalls",
            ],
        )
        .section(
            "Owner Analysis",
            &["Which owners have the most stalled pipeline?", "Total stalled value per Owner.Name"],
        )
        .section("Country View", &["Stalled pipeline by country"])
        .closing("List the top 10 stalled deals by value with recommended next steps."))
}

pub fn country_pipeline_dashboard(
    ctx: &PromptContext,
    quarter: Option<&str>,
) -> Result<Brief, ForceError> {
    let (label, range) = period(ctx, quarter)?;
    let dates = format!("  AND {}", range.soql_filter("CloseDate"));
    let region = region_filter(ctx);

    Ok(Brief::new(format!("Country Pipeline Dashboard: {label}"))
        .context(intro(ctx, "with a regional dashboard"))
        .context(ctx.fiscal_year_line())
        .task(format!("Generate a country-level pipeline dashboard for {label}."))
        .query(
            "Primary SOQL Query",
            &[
                &format!("SELECT {OPPORTUNITY_FIELDS_EXTENDED}"),
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &dates,
                &region,
                "ORDER BY Account.BillingCountry, Amount DESC",
            ],
        )
        .query(
            "Aggregation Query",
            &[
                "SELECT Account.BillingCountry, COUNT(Id) opp_count, SUM(Amount) total_pipeline",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &dates,
                &region,
                "GROUP BY Account.BillingCountry",
                "ORDER BY SUM(Amount) DESC",
            ],
        )
        .sections_heading("Required Dashboard Sections")
        .section(
            "Executive Summary",
            &["| Country | Pipeline Value | Opp Count | Avg Deal Size | (sorted by pipeline value)"],
        )
        .section(
            "Partner Coverage Matrix",
            &[
                "| Country | Partner Pipeline | Direct Pipeline | Partner % |",
                "GREEN above 50% partner, AMBER 30-50%, RED below 30%",
            ],
        )
        .section("Stage Health by Country", &["Pipeline by StageName for each country"])
        .section("Top 3 Deals per Country", &["The 3 largest opportunities for each country"])
        .section("Partner Source Analysis", &["| Country | Sourced by Partner | Influenced | Direct |"])
        .section(
            "Risk Flags",
            &[
                "Countries with declining pipeline vs last quarter",
                "Countries with low partner engagement",
                "Countries with high concentration in single deals",
            ],
        )
        .closing("If possible, present the result as a regional scorecard."))
}

pub fn forecast_vs_actuals(ctx: &PromptContext, quarter: Option<&str>) -> Result<Brief, ForceError> {
    let (label, range) = required_quarter(ctx, quarter)?;

    Ok(Brief::new(format!("Forecast vs Actuals: {label}"))
        .context(intro(ctx, "with forecast analysis"))
        .context(ctx.fiscal_year_line())
        .task(format!("Compare FORECAST vs ACTUALS for {label}."))
        .query(
            "SOQL Query (open and closed opportunities)",
            &[
                "SELECT Id, Name, Amount, Probability, StageName, CloseDate, IsWon, IsClosed,",
                "       Account.Name, Account.BillingCountry,",
                "       Partner__c, Partner__r.Name, Partner_Source_Influence__c",
                "FROM Opportunity",
                &format!("WHERE {}", range.soql_filter("CloseDate")),
                &region_filter(ctx),
                "ORDER BY Amount DESC",
            ],
        )
        .section(
            "Forecast Summary",
            &[
                "Total pipeline (open): SUM(Amount) where IsClosed = false",
                "Weighted forecast: SUM(Amount x Probability / 100)",
                "Closed-won: SUM(Amount) where IsWon = true",
                "Closed-lost: SUM(Amount) where IsClosed = true AND IsWon = false",
            ],
        )
        .section(
            "Forecast Accuracy",
            &[
                "Forecast vs actual ratio",
                "Upside (deals that closed above forecast)",
                "Downside (deals that were lost or slipped)",
            ],
        )
        .section(
            "Partner Contribution to Actuals",
            &[
                "| Category | Closed-Won Value | % of Total |",
                "Partner-sourced",
                "Partner-influenced",
                "Direct (no partner)",
            ],
        )
        .section("Country Forecast Accuracy", &["| Country | Forecast | Actual | Accuracy % |"])
        .section(
            "Stage Conversion Analysis",
            &[
                "What percentage of 'Contracts' stage converted to won?",
                "What percentage of 'Negotiation' stage converted?",
            ],
        )
        .section(
            "Lessons Learned",
            &[
                "Deals that were forecast but lost (why?)",
                "Surprise wins (not forecast but closed)",
                "Recommendations for next quarter forecasting",
            ],
        ))
}

pub fn partner_scorecard(ctx: &PromptContext, partner_name: Option<&str>) -> Brief {
    let partner = partner_name.map(str::trim).filter(|name| !name.is_empty());
    let partner_filter = match partner {
        Some(_) => format!("  AND Partner__c = '{PARTNER_ID_PLACEHOLDER}'"),
        None => String::new(),
    };
    let subject = match partner {
        Some(name) => format!("partner '{}'", escape_literal(name)),
        None => "ALL partners".to_string(),
    };
    let year = year_close_filter(ctx);
    let region = region_filter(ctx);

    let mut brief = Brief::new("Partner Performance Scorecard")
        .context(intro(ctx, "with partner performance reviews"))
        .context(ctx.fiscal_year_line())
        .context("Partner__c is a LOOKUP to Account, not a text field.")
        .task(format!("Generate a performance scorecard for {subject}."));
    if let Some(name) = partner {
        brief = brief
            .step(format!(
                "Use salesforce_find_partner to find the Account Id for '{}'.",
                escape_literal(name)
            ))
            .step(format!("Replace {PARTNER_ID_PLACEHOLDER} in the queries with that Account Id."));
    }
    brief
        .step("Use Partner__r.Name to display partner names in results.")
        .query(
            "Query 1 - Open Pipeline",
            &[
                "SELECT Partner__c, COUNT(Id) opp_count, SUM(Amount) pipeline_value,",
                "       AVG(Probability) avg_probability",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                "  AND Partner__c != null",
                &year,
                &region,
                &partner_filter,
                "GROUP BY Partner__c",
                "ORDER BY SUM(Amount) DESC",
                "LIMIT 20",
            ],
        )
        .query(
            "Query 2 - Closed Won",
            &[
                "SELECT Partner__c, COUNT(Id) won_count, SUM(Amount) won_value,",
                "       SUM(Primary_Partner_Total_Contract_Value__c) partner_tcv",
                "FROM Opportunity",
                "WHERE IsWon = true",
                "  AND Partner__c != null",
                &year,
                &region,
                &partner_filter,
                "GROUP BY Partner__c",
                "ORDER BY SUM(Amount) DESC",
                "LIMIT 20",
            ],
        )
        .query(
            "Query 3 - Source vs Influence",
            &[
                "SELECT Partner__c, Partner_Source_Influence__c, COUNT(Id) deal_count, SUM(Amount) deal_value",
                "FROM Opportunity",
                "WHERE Partner__c != null",
                &year,
                &region,
                &partner_filter,
                "GROUP BY Partner__c, Partner_Source_Influence__c",
                "ORDER BY Partner__c, Partner_Source_Influence__c",
            ],
        )
        .sections_heading("Required Scorecard")
        .section(
            "Partner Leaderboard",
            &["| Rank | Partner | Pipeline | Won Revenue | Win Rate | Sourced % |"],
        )
        .section(
            "Individual Partner Cards (Top 10)",
            &[
                "Total pipeline value",
                &format!("Closed-won value ({})", ctx.fiscal.label),
                "Number of opportunities",
                "Average deal size",
                "Source vs influence ratio",
                "Countries covered",
            ],
        )
        .section(
            "Partner Tier Analysis",
            &["Tier 1 (above 1M pipeline)", "Tier 2 (250K-1M)", "Tier 3 (below 250K)"],
        )
        .section(
            "Engagement Gaps",
            &[
                "Countries with no partner activity",
                "Partners with pipeline but no closed deals",
                "Partners with declining engagement vs last quarter",
            ],
        )
        .section(
            "Strategic Recommendations",
            &[
                "Partners to invest more in",
                "Partners needing enablement",
                "New partner recruitment opportunities by country",
            ],
        )
}

pub fn weekly_briefing(ctx: &PromptContext) -> Brief {
    let region = region_filter(ctx);

    Brief::new("Weekly Channel Briefing")
        .context(intro(ctx, "with their weekly briefing"))
        .context(ctx.fiscal_year_line())
        .task("Generate a concise WEEKLY BRIEFING covering the most important updates.")
        .query(
            "1. Pipeline Movement (last 7 days)",
            &[
                "SELECT Id, Name, Amount, StageName, Account.BillingCountry, Partner__c, Partner__r.Name",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                "  AND LastModifiedDate = LAST_N_DAYS:7",
                &year_close_filter(ctx),
                &region,
                "ORDER BY Amount DESC",
                "LIMIT 20",
            ],
        )
        .query(
            "2. Deals Closed This Week",
            &[
                "SELECT Id, Name, Amount, IsWon, CloseDate, Account.BillingCountry, Partner__c, Partner__r.Name",
                "FROM Opportunity",
                "WHERE IsClosed = true",
                "  AND CloseDate = LAST_N_DAYS:7",
                &region,
                "ORDER BY Amount DESC",
            ],
        )
        .query(
            "3. Deals Closing Next Week",
            &[
                "SELECT Id, Name, Amount, Probability, StageName, CloseDate,",
                "       Account.Name, Account.BillingCountry, Partner__c, Partner__r.Name",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                "  AND CloseDate = NEXT_N_DAYS:7",
                &region,
                "ORDER BY CloseDate, Amount DESC",
            ],
        )
        .sections_heading("Required Briefing Sections")
        .section(
            "Executive Summary",
            &[
                "Total open pipeline value",
                "Closed-won this week",
                "Closed-lost this week",
                "Net pipeline change",
            ],
        )
        .section("This Week's Wins", &["List all closed-won deals", "Highlight partner contribution"])
        .section("This Week's Losses", &["List all closed-lost deals", "Note if a partner was attached"])
        .section(
            "Next Week Outlook",
            &["Deals expected to close", "Total expected value", "Key meetings or actions needed"],
        )
        .section(
            "Attention Required",
            &["High-value deals needing help", "Stalled opportunities", "Partner engagement gaps"],
        )
        .closing("Keep it brief: this should be readable in 2 minutes.")
}

pub fn partner_qbr_prep(
    ctx: &PromptContext,
    partner_name: &str,
    quarter: Option<&str>,
) -> Result<Brief, ForceError> {
    let partner_name = partner_name.trim();
    if partner_name.is_empty() {
        return Err(ForceError::validation("partner_qbr_prep requires a non-empty partner_name"));
    }
    let (label, range) = required_quarter(ctx, quarter)?;
    let partner = escape_literal(partner_name);
    let by_partner = format!("  AND Partner__c = '{PARTNER_ID_PLACEHOLDER}'");
    let region = region_filter(ctx);
    let quarter_dates = format!("  AND {}", range.soql_filter("CloseDate"));

    Ok(Brief::new(format!("Partner QBR Prep: {partner} ({label})"))
        .context(intro(ctx, &format!("preparing a QBR with partner '{partner}'")))
        .context(ctx.fiscal_year_line())
        .context("Partner__c is a LOOKUP to Account, not a text field.")
        .task(format!("Generate a QBR preparation report for {label}."))
        .step(format!(
            "Use salesforce_find_partner (or salesforce_lookup) to find the Account Id for '{partner}'."
        ))
        .step(format!("Replace {PARTNER_ID_PLACEHOLDER} in the queries with that Account Id."))
        .step("Use Partner__r.Name to display the partner name in results.")
        .query(
            "Query 1 - Partner's Pipeline",
            &[
                "SELECT Id, Name, Amount, StageName, Stage_Detail__c, CloseDate, Probability,",
                "       Account.Name, Account.BillingCountry, Owner.Name, Partner_Source_Influence__c",
                "FROM Opportunity",
                "WHERE IsClosed = false",
                &by_partner,
                &quarter_dates,
                &region,
                "ORDER BY Amount DESC",
            ],
        )
        .query(
            "Query 2 - Partner's Closed Deals (Quarter)",
            &[
                "SELECT Id, Name, Amount, IsWon, CloseDate, Account.Name, Account.BillingCountry,",
                "       Partner_Source_Influence__c, Primary_Partner_Total_Contract_Value__c",
                "FROM Opportunity",
                "WHERE IsClosed = true",
                &by_partner,
                &quarter_dates,
                &region,
                "ORDER BY CloseDate DESC",
            ],
        )
        .query(
            "Query 3 - Year-to-Date Performance",
            &[
                "SELECT IsWon, COUNT(Id) deal_count, SUM(Amount) deal_value",
                "FROM Opportunity",
                "WHERE IsClosed = true",
                &by_partner,
                &year_close_filter(ctx),
                &region,
                "GROUP BY IsWon",
            ],
        )
        .sections_heading("Required QBR Sections")
        .section(
            "Performance Summary",
            &[
                &format!("{label} pipeline value"),
                &format!("{label} closed-won revenue"),
                &format!("{label} win rate"),
                "Year-to-date total revenue",
                "Comparison to previous quarter",
            ],
        )
        .section(
            "Deal Review",
            &[
                &format!("All deals closed in {label} (won and lost)"),
                "Current open pipeline with stages",
                "Deals at risk (low probability or stalled)",
            ],
        )
        .section(
            "Geographic Coverage",
            &["Revenue and pipeline by country", "Whitespace (countries with no activity)"],
        )
        .section(
            "Source vs Influence",
            &["Deals sourced by the partner vs influenced", "Partner's sourcing rate vs benchmark"],
        )
        .section(
            "Action Items for Discussion",
            &["Deals needing joint attention", "Enablement needs", "Growth opportunities", "Blockers to address"],
        )
        .section(
            "Next Quarter Targets",
            &["Suggested pipeline targets", "Focus accounts", "Joint activities needed"],
        )
        .closing("Format for presentation and include talking points for each section."))
}

pub fn competitive_analysis(ctx: &PromptContext, competitor: Option<&str>) -> Brief {
    let competitor = competitor.map(str::trim).filter(|name| !name.is_empty());
    let (filter, subject) = match competitor {
        Some(name) => (
            format!("  AND Competitor__c LIKE {}", contains_pattern(name)),
            format!("against '{}'", escape_literal(name)),
        ),
        None => ("  AND Competitor__c != null".to_string(), "with competitor involvement".to_string()),
    };

    Brief::new("Competitive Deal Analysis")
        .context(intro(ctx, "analyzing competitive deals"))
        .context(ctx.fiscal_year_line())
        .task(format!("Analyze opportunities {subject}."))
        .query(
            "SOQL Query",
            &[
                "SELECT Id, Name, Amount, StageName, IsWon, IsClosed, CloseDate,",
                "       Account.Name, Account.BillingCountry,",
                "       Competitor__c, Loss_Reason__c, Win_Reason__c,",
                "       Partner__c, Partner__r.Name, Partner_Source_Influence__c",
                "FROM Opportunity",
                &format!("WHERE {}", ctx.fiscal.year.soql_filter("CloseDate")),
                &region_filter(ctx),
                &filter,
                "ORDER BY Amount DESC",
            ],
        )
        .section(
            "Competitive Overview",
            &[
                "Total deals with competitor involvement",
                "Total value contested",
                "Win rate vs competitors",
            ],
        )
        .section(
            "Win/Loss Breakdown",
            &[
                "| Outcome | Count | Value | % |",
                "Won against competitor",
                "Lost to competitor",
                "Still open",
            ],
        )
        .section(
            "Partner Impact on Competitive Deals",
            &["Win rate WITH a partner vs WITHOUT", "Do partners improve competitive win rate?"],
        )
        .section(
            "Loss Analysis",
            &[
                "Top loss reasons (Loss_Reason__c)",
                "Patterns in competitive losses",
                "Countries where we struggle most",
            ],
        )
        .section(
            "Win Patterns",
            &["What is working? (Win_Reason__c)", "Successful strategies against competitors"],
        )
        .section(
            "Recommendations",
            &[
                "Where to engage partners in competitive deals",
                "Competitive response strategies",
                "Training and enablement needs",
            ],
        )
}

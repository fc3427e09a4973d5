pub mod commands;

use clap::{Parser, Subcommand};
use forcelink_core::config::{AppConfig, LogFormat};
use std::process::ExitCode;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "forcelink",
    about = "Forcelink operator CLI",
    long_about = "Inspect Forcelink configuration, check Salesforce readiness, render analysis prompts, and run ad-hoc SOQL.",
    after_help = "Examples:\n  forcelink doctor --json\n  forcelink config\n  forcelink prompt quarterly_pipeline_analysis --quarter Q2\n  forcelink query \"SELECT Id, Name FROM Account LIMIT 5\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credential readiness, and Salesforce connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the analysis prompt catalog with each prompt's arguments")]
    Prompts,
    #[command(about = "Render one analysis prompt as markdown")]
    Prompt {
        #[arg(help = "Prompt name, e.g. weekly_briefing")]
        name: String,
        #[arg(long, help = "Fiscal quarter Q1-Q4")]
        quarter: Option<String>,
        #[arg(long, help = "Cover the whole fiscal year")]
        full_year: Option<bool>,
        #[arg(long, help = "Row limit for top-N listings")]
        limit: Option<u32>,
        #[arg(long, help = "Days without activity before a deal counts as stalled")]
        days: Option<u32>,
        #[arg(long, help = "Partner account name")]
        partner: Option<String>,
        #[arg(long, help = "Competitor name")]
        competitor: Option<String>,
    },
    #[command(about = "Run a SOQL query, following pagination, and print the records as JSON")]
    Query {
        #[arg(help = "SOQL statement")]
        soql: String,
        #[arg(long, help = "Maximum number of result pages to fetch")]
        max_pages: Option<u32>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Prompts => commands::prompt::list(),
        Command::Prompt { name, quarter, full_year, limit, days, partner, competitor } => {
            let args = commands::prompt::PromptRequest {
                quarter,
                full_year,
                limit,
                days_stalled: days,
                partner_name: partner,
                competitor,
            };
            commands::prompt::run(&name, args)
        }
        Command::Query { soql, max_pages } => commands::query::run(&soql, max_pages),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Stdout carries command output, so logs go to stderr.
pub(crate) fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

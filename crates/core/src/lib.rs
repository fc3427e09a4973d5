pub mod config;
pub mod errors;
pub mod fields;
pub mod fiscal;
pub mod prompts;
pub mod soql;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::ForceError;
pub use fields::FieldType;
pub use fiscal::{DateRange, FiscalCalendar, Quarter};
pub use prompts::{build_brief, Brief, PromptArgs, PromptContext, PromptName, PROMPT_CATALOG};
pub use soql::{Aggregate, AggregateClauses, AggregateFunction, SoslScope, SoslSearch};

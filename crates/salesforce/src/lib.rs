//! Salesforce REST client and the tool operations built on it.
//!
//! [`SalesforceClient::execute`] is the single outbound path: it attaches the
//! bearer credential, resolves paths against the versioned API prefix, and
//! classifies every non-2xx answer into a [`ForceError`]. The `operations`
//! modules add the tool-level methods on top of it.

pub mod client;
pub mod operations;

pub use client::{ClientSettings, QueryResult, SalesforceClient};
pub use forcelink_core::ForceError;
pub use operations::analytics::{AggregateInput, TrendPeriod, TrendPlan, TrendRequest};
pub use operations::navigation::HierarchyDirection;
pub use operations::partner::PartnerMatch;

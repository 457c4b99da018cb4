use crate::config::QueryConfig;
use crate::importer::{find_export_dir, load_all};
use crate::query::{QueryFilters, QueryKind, QueryRequest, QueryResponse, QueryService};
use crate::store::models::{PostType, Seniority};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Query a LinkedIn data export and print JSON")]
pub struct QueryArgs {
    /// Type of data to query
    #[arg(long = "type", value_enum, default_value_t = QueryKind::Summary)]
    pub kind: QueryKind,
    /// Filter connections by company name (partial match)
    #[arg(long)]
    pub company: Option<String>,
    /// Filter by seniority level (repeat for several)
    #[arg(long)]
    pub seniority: Vec<Seniority>,
    /// Filter by position keyword
    #[arg(long)]
    pub position: Option<String>,
    /// Full-text search
    #[arg(long)]
    pub search: Option<String>,
    /// Filter by year
    #[arg(long)]
    pub year: Option<i32>,
    /// Only records from the last N days
    #[arg(long)]
    pub recent: Option<u32>,
    /// Filter posts by type (Long Text, Short Text, Media, Link Share, Repost)
    #[arg(long)]
    pub post_type: Option<PostType>,
    /// Show only conversations awaiting your reply
    #[arg(long)]
    pub awaiting_reply: bool,
    /// Max results to return (default: 500)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Path to the LinkedIn export directory (auto-detected if omitted)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
    /// Your display name in messages.csv (inferred if omitted)
    #[arg(long)]
    pub owner: Option<String>,
}

impl QueryArgs {
    pub fn to_request(&self, config: &QueryConfig) -> QueryRequest {
        QueryRequest::new(self.kind)
            .with_filters(QueryFilters {
                company: self.company.clone(),
                seniority: self.seniority.clone(),
                position: self.position.clone(),
                search: self.search.clone(),
                year: self.year,
                recent_days: self.recent,
                post_type: self.post_type,
                awaiting_reply: self.awaiting_reply,
            })
            .with_limit(self.limit.unwrap_or(config.default_limit))
    }
}

/// Resolves the export, loads it and runs a single query.
pub fn run(args: &QueryArgs, config: &QueryConfig, now: DateTime<Utc>) -> Result<QueryResponse> {
    let explicit = args.export_dir.as_deref().or(config.export_dir.as_deref());
    let export_dir = find_export_dir(explicit)?;
    let owner = args.owner.as_deref().or(config.owner_name.as_deref());
    let dataset = load_all(&export_dir, owner)
        .with_context(|| format!("failed to load export from {}", export_dir.display()))?;

    let request = args.to_request(config);
    tracing::info!(kind = ?request.kind, limit = request.limit, "running query");
    Ok(QueryService::new(dataset, now).run(&request))
}

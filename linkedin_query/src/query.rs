use crate::config::DEFAULT_LIMIT;
use crate::conversations::{build_conversations, Conversation};
use crate::filters::{self, AppliedFilters};
use crate::store::models::{Comment, Connection, Post, PostType, Seniority};
use crate::store::{Dataset, COMMENT_MESSAGE_COLUMN, REACTION_TYPE_COLUMN};
use crate::summary::{build_summary, Histogram, Summary};
use crate::utils::format_date;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

pub const NO_MESSAGES_ERROR: &str = "No messages.csv found in export";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    #[default]
    Summary,
    Connections,
    Posts,
    Comments,
    Reactions,
    Messages,
}

#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub company: Option<String>,
    pub seniority: Vec<Seniority>,
    pub position: Option<String>,
    pub search: Option<String>,
    pub year: Option<i32>,
    pub recent_days: Option<u32>,
    pub post_type: Option<PostType>,
    pub awaiting_reply: bool,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub kind: QueryKind,
    pub filters: QueryFilters,
    pub limit: usize,
}

impl QueryRequest {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            filters: QueryFilters::default(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingResponse<T> {
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub total: usize,
    pub showing: usize,
    pub filters: AppliedFilters,
    pub results: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ListingResponse<T> {
    fn paged(kind: QueryKind, filters: AppliedFilters, mut rows: Vec<T>, limit: usize) -> Self {
        let total = rows.len();
        rows.truncate(limit);
        Self {
            kind,
            total,
            showing: rows.len(),
            filters,
            results: rows,
            summary: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionsResponse {
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub total: usize,
    pub filters: AppliedFilters,
    pub type_distribution: Histogram,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Summary(SummaryResponse),
    Connections(ListingResponse<ConnectionView>),
    Posts(ListingResponse<PostView>),
    Comments(ListingResponse<CommentView>),
    Reactions(ReactionsResponse),
    Messages(ListingResponse<Conversation>),
}

impl QueryResponse {
    pub fn total(&self) -> Option<usize> {
        match self {
            QueryResponse::Summary(_) => None,
            QueryResponse::Connections(r) => Some(r.total),
            QueryResponse::Posts(r) => Some(r.total),
            QueryResponse::Comments(r) => Some(r.total),
            QueryResponse::Reactions(r) => Some(r.total),
            QueryResponse::Messages(r) => Some(r.total),
        }
    }

    pub fn showing(&self) -> Option<usize> {
        match self {
            QueryResponse::Connections(r) => Some(r.showing),
            QueryResponse::Posts(r) => Some(r.showing),
            QueryResponse::Comments(r) => Some(r.showing),
            QueryResponse::Messages(r) => Some(r.showing),
            QueryResponse::Summary(_) | QueryResponse::Reactions(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionView {
    pub name: String,
    pub company: String,
    pub position: String,
    pub seniority: Seniority,
    pub connected: String,
    pub url: String,
}

impl ConnectionView {
    fn from_record(record: Connection) -> Self {
        Self {
            name: record.full_name,
            company: record.company.unwrap_or_default(),
            position: record.position.unwrap_or_default(),
            seniority: record.seniority,
            connected: format_date(record.connected_on),
            url: record.url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub date: String,
    pub day: String,
    pub content: String,
    #[serde(rename = "wordCount")]
    pub word_count: usize,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub comments: usize,
    pub link: String,
}

impl PostView {
    fn from_record(record: Post) -> Self {
        Self {
            date: record.date,
            day: record.day,
            content: record.content,
            word_count: record.word_count,
            post_type: record.post_type,
            comments: record.comments,
            link: record.link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub date: String,
    pub message: String,
    pub link: String,
}

impl CommentView {
    fn from_record(record: Comment) -> Self {
        Self {
            date: format_date(record.date),
            message: record.message.unwrap_or_default(),
            link: record.link.unwrap_or_default(),
        }
    }
}

/// Runs queries against one loaded export. `now` anchors every `recent`
/// filter so results are reproducible.
pub struct QueryService {
    dataset: Dataset,
    now: DateTime<Utc>,
}

impl QueryService {
    pub fn new(dataset: Dataset, now: DateTime<Utc>) -> Self {
        Self { dataset, now }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn run(&self, request: &QueryRequest) -> QueryResponse {
        let response = match request.kind {
            QueryKind::Summary => QueryResponse::Summary(SummaryResponse {
                kind: QueryKind::Summary,
                summary: build_summary(&self.dataset),
            }),
            QueryKind::Connections => {
                let mut listing = self.query_connections(&request.filters, request.limit);
                listing.summary = Some(build_summary(&self.dataset));
                QueryResponse::Connections(listing)
            }
            QueryKind::Posts => {
                let mut listing = self.query_posts(&request.filters, request.limit);
                listing.summary = Some(build_summary(&self.dataset));
                QueryResponse::Posts(listing)
            }
            QueryKind::Comments => {
                QueryResponse::Comments(self.query_comments(&request.filters, request.limit))
            }
            QueryKind::Reactions => QueryResponse::Reactions(self.query_reactions(&request.filters)),
            QueryKind::Messages => {
                QueryResponse::Messages(self.query_messages(&request.filters, request.limit))
            }
        };
        tracing::debug!(
            kind = ?request.kind,
            total = ?response.total(),
            showing = ?response.showing(),
            limit = request.limit,
            "query complete"
        );
        response
    }

    pub fn query_connections(
        &self,
        params: &QueryFilters,
        limit: usize,
    ) -> ListingResponse<ConnectionView> {
        let mut rows = self.dataset.connections.rows.clone();
        let mut applied = AppliedFilters::new();

        if let Some(company) = &params.company {
            rows = filters::by_company(rows, company);
            applied.record("company", company.as_str());
        }
        if !params.seniority.is_empty() {
            rows = filters::by_seniority(rows, &params.seniority);
            let labels: Vec<&str> = params.seniority.iter().map(|s| s.label()).collect();
            applied.record("seniority", labels);
        }
        if let Some(position) = &params.position {
            rows = filters::by_position(rows, position);
            applied.record("position", position.as_str());
        }
        if let Some(year) = params.year {
            rows = filters::by_year(rows, year);
            applied.record("year", year);
        }
        if let Some(days) = params.recent_days {
            rows = filters::by_recent(rows, days, self.now);
            applied.record("recent_days", days);
        }
        if let Some(search) = &params.search {
            rows = filters::by_search(rows, search);
            applied.record("search", search.as_str());
        }

        rows.sort_by(|a, b| newest_first(a.connected_on, b.connected_on));
        let views = rows.into_iter().map(ConnectionView::from_record).collect();
        ListingResponse::paged(QueryKind::Connections, applied, views, limit)
    }

    pub fn query_posts(&self, params: &QueryFilters, limit: usize) -> ListingResponse<PostView> {
        let mut rows = self.dataset.posts.clone();
        let mut applied = AppliedFilters::new();

        if let Some(search) = &params.search {
            rows = filters::by_search(rows, search);
            applied.record("search", search.as_str());
        }
        if let Some(post_type) = params.post_type {
            rows = filters::by_post_type(rows, post_type);
            applied.record("post_type", post_type.label());
        }
        if let Some(year) = params.year {
            rows = filters::by_year(rows, year);
            applied.record("year", year);
        }

        rows.sort_by(|a, b| b.date.cmp(&a.date));
        let views = rows.into_iter().map(PostView::from_record).collect();
        ListingResponse::paged(QueryKind::Posts, applied, views, limit)
    }

    pub fn query_comments(
        &self,
        params: &QueryFilters,
        limit: usize,
    ) -> ListingResponse<CommentView> {
        let table = &self.dataset.comments;
        let mut rows = table.rows.clone();
        let mut applied = AppliedFilters::new();

        if let Some(search) = &params.search {
            if table.has_column(COMMENT_MESSAGE_COLUMN) {
                rows = filters::by_search(rows, search);
            } else {
                tracing::warn!("comments export has no Message column; search not applied");
            }
            applied.record("search", search.as_str());
        }
        if let Some(year) = params.year {
            rows = filters::by_year(rows, year);
            applied.record("year", year);
        }

        rows.sort_by(|a, b| newest_first(a.date, b.date));
        let views = rows.into_iter().map(CommentView::from_record).collect();
        ListingResponse::paged(QueryKind::Comments, applied, views, limit)
    }

    pub fn query_reactions(&self, params: &QueryFilters) -> ReactionsResponse {
        let table = &self.dataset.reactions;
        let mut rows = table.rows.clone();
        let mut applied = AppliedFilters::new();

        if let Some(year) = params.year {
            rows = filters::by_year(rows, year);
            applied.record("year", year);
        }

        let type_distribution = if table.has_column(REACTION_TYPE_COLUMN) {
            Histogram::from_values(rows.iter().filter_map(|r| r.reaction_type.as_deref()))
        } else {
            Histogram::default()
        };

        ReactionsResponse {
            kind: QueryKind::Reactions,
            total: rows.len(),
            filters: applied,
            type_distribution,
        }
    }

    pub fn query_messages(
        &self,
        params: &QueryFilters,
        limit: usize,
    ) -> ListingResponse<Conversation> {
        let table = &self.dataset.messages;
        if table.is_empty() {
            let mut listing =
                ListingResponse::paged(QueryKind::Messages, AppliedFilters::new(), Vec::new(), limit);
            listing.error = Some(NO_MESSAGES_ERROR.to_string());
            return listing;
        }

        let mut rows = table.rows.clone();
        let mut applied = AppliedFilters::new();

        if let Some(days) = params.recent_days {
            rows = filters::by_recent(rows, days, self.now);
            applied.record("recent_days", days);
        }
        if let Some(year) = params.year {
            rows = filters::by_year(rows, year);
            applied.record("year", year);
        }

        let mut conversations = build_conversations(&rows);

        if let Some(search) = &params.search {
            conversations = filters::by_search(conversations, search);
            applied.record("search", search.as_str());
        }
        if params.awaiting_reply {
            conversations = filters::awaiting_reply(conversations);
            applied.record("awaiting_reply", true);
        }

        ListingResponse::paged(QueryKind::Messages, applied, conversations, limit)
    }
}

/// Descending order with missing values last.
fn newest_first<K: Ord>(a: Option<K>, b: Option<K>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Message, Reaction};
    use crate::store::Table;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;

    fn date(raw: &str) -> Option<NaiveDate> {
        raw.parse().ok()
    }

    fn connection(name: &str, company: &str, seniority: Seniority, connected: &str) -> Connection {
        Connection {
            full_name: name.into(),
            company: Some(company.into()),
            position: Some("Product Lead".into()),
            seniority,
            connected_on: date(connected),
            url: Some(format!("https://www.linkedin.com/in/{}", name.to_lowercase())),
        }
    }

    fn post(date: &str, post_type: PostType, content: &str) -> Post {
        Post {
            date: date.into(),
            day: "Monday".into(),
            content: content.into(),
            word_count: content.split_whitespace().count(),
            post_type,
            comments: 0,
            link: String::new(),
        }
    }

    fn message(other: &str, at: (u32, u32), from_owner: bool, content: &str) -> Message {
        Message {
            date: Utc.with_ymd_and_hms(2024, at.0, at.1, 10, 0, 0).unwrap(),
            counterparty: other.into(),
            content: content.into(),
            sent_by_owner: from_owner,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset {
            connections: Table::new(
                vec![
                    connection("Ada", "Google", Seniority::Vp, "2023-01-01"),
                    connection("Grace", "Meta", Seniority::Other, "2024-06-01"),
                    connection("Linus", "Stripe", Seniority::Director, ""),
                    connection("Barbara", "Stripe", Seniority::Director, "2024-06-20"),
                ],
                ["First Name", "Last Name", "Company", "Position", "Connected On", "URL"],
            ),
            posts: vec![
                post("2023-05-01", PostType::Media, "Launch photos"),
                post("2024-01-01", PostType::Repost, ""),
                post("2024-03-01", PostType::ShortText, "Thoughts on AI agents"),
            ],
            comments: Table::new(
                vec![
                    Comment {
                        date: date("2024-02-01"),
                        message: Some("Great point about revenue".into()),
                        link: Some("https://example.com/1".into()),
                    },
                    Comment {
                        date: None,
                        message: None,
                        link: None,
                    },
                    Comment {
                        date: date("2023-02-01"),
                        message: Some("Congrats!".into()),
                        link: None,
                    },
                ],
                ["Date", "Link", "Message"],
            ),
            reactions: Table::new(
                vec![
                    Reaction {
                        date: date("2024-01-01"),
                        reaction_type: Some("LIKE".into()),
                    },
                    Reaction {
                        date: date("2024-02-01"),
                        reaction_type: Some("PRAISE".into()),
                    },
                    Reaction {
                        date: date("2023-02-01"),
                        reaction_type: Some("LIKE".into()),
                    },
                ],
                ["Date", "Type", "Link"],
            ),
            messages: Table::new(
                vec![
                    message("Ada", (6, 1), true, "Want to grab coffee?"),
                    message("Ada", (6, 2), false, "Sure, Tuesday works"),
                    message("Grace", (5, 1), false, "Hiring question"),
                    message("Grace", (5, 3), true, "Answered!"),
                    message("Linus", (1, 10), false, "Kernel stuff"),
                ],
                ["FROM", "TO", "DATE", "CONTENT"],
            ),
        }
    }

    fn service() -> QueryService {
        QueryService::new(dataset(), now())
    }

    fn filters() -> QueryFilters {
        QueryFilters::default()
    }

    #[test]
    fn company_filter_matches_case_insensitively() {
        let params = QueryFilters {
            company: Some("google".into()),
            ..filters()
        };
        let listing = service().query_connections(&params, 500);
        assert_eq!(listing.total, 1);
        assert_eq!(listing.results[0].name, "Ada");
        assert_eq!(listing.results[0].company, "Google");
        assert_eq!(listing.filters.get("company"), Some(&"google".into()));
    }

    #[test]
    fn seniority_values_are_unioned() {
        let params = QueryFilters {
            seniority: vec![Seniority::Vp, Seniority::Director],
            ..filters()
        };
        let listing = service().query_connections(&params, 500);
        assert_eq!(listing.total, 3);
        let json = serde_json::to_value(&listing.filters).unwrap();
        assert_eq!(json["seniority"], serde_json::json!(["VP", "Director"]));
    }

    #[test]
    fn connections_sort_newest_first_with_undated_last() {
        let listing = service().query_connections(&filters(), 500);
        let names: Vec<&str> = listing.results.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Barbara", "Grace", "Ada", "Linus"]);
        assert_eq!(listing.results[3].connected, "");
    }

    #[test]
    fn limit_truncates_after_counting() {
        let request = QueryRequest::new(QueryKind::Connections).with_limit(2);
        let response = service().run(&request);
        assert_eq!(response.total(), Some(4));
        assert_eq!(response.showing(), Some(2));
    }

    #[test]
    fn recent_connections_use_injected_now() {
        let params = QueryFilters {
            recent_days: Some(30),
            ..filters()
        };
        let listing = service().query_connections(&params, 500);
        let names: Vec<&str> = listing.results.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Barbara", "Grace"]);
        assert_eq!(listing.filters.get("recent_days"), Some(&30.into()));
    }

    #[test]
    fn connections_and_posts_embed_unfiltered_summary() {
        let request = QueryRequest::new(QueryKind::Connections).with_filters(QueryFilters {
            company: Some("nobody".into()),
            ..filters()
        });
        let QueryResponse::Connections(listing) = service().run(&request) else {
            panic!("expected connections response");
        };
        assert_eq!(listing.total, 0);
        assert_eq!(listing.summary.expect("summary").total_connections, 4);

        let QueryResponse::Posts(listing) = service().run(&QueryRequest::new(QueryKind::Posts)) else {
            panic!("expected posts response");
        };
        assert_eq!(listing.summary.expect("summary").total_posts, 3);
    }

    #[test]
    fn posts_filter_by_year() {
        let params = QueryFilters {
            year: Some(2024),
            ..filters()
        };
        let listing = service().query_posts(&params, 500);
        assert_eq!(listing.total, 2);
        assert_eq!(listing.showing, 2);
        assert_eq!(listing.results[0].date, "2024-03-01");
    }

    #[test]
    fn posts_filter_by_type_and_search() {
        let params = QueryFilters {
            post_type: Some(PostType::ShortText),
            search: Some("ai".into()),
            ..filters()
        };
        let listing = service().query_posts(&params, 500);
        assert_eq!(listing.total, 1);
        assert_eq!(
            listing.filters.keys().collect::<Vec<_>>(),
            vec!["search", "post_type"]
        );
        let json = serde_json::to_value(&listing.results[0]).unwrap();
        assert_eq!(json["type"], "Short Text");
        assert_eq!(json["wordCount"], 4);
    }

    #[test]
    fn comment_search_skipped_without_message_column() {
        let mut data = dataset();
        data.comments.columns.remove(COMMENT_MESSAGE_COLUMN);
        let service = QueryService::new(data, now());
        let params = QueryFilters {
            search: Some("revenue".into()),
            ..filters()
        };
        let listing = service.query_comments(&params, 500);
        assert_eq!(listing.total, 3);
        assert_eq!(listing.filters.get("search"), Some(&"revenue".into()));
    }

    #[test]
    fn comments_search_and_project() {
        let params = QueryFilters {
            search: Some("REVENUE".into()),
            ..filters()
        };
        let listing = service().query_comments(&params, 500);
        assert_eq!(listing.total, 1);
        assert_eq!(
            listing.results[0],
            CommentView {
                date: "2024-02-01".into(),
                message: "Great point about revenue".into(),
                link: "https://example.com/1".into(),
            }
        );
    }

    #[test]
    fn reactions_only_report_a_histogram() {
        let params = QueryFilters {
            year: Some(2024),
            ..filters()
        };
        let response = service().query_reactions(&params);
        assert_eq!(response.total, 2);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "reactions",
                "total": 2,
                "filters": {"year": 2024},
                "type_distribution": {"LIKE": 1, "PRAISE": 1},
            })
        );
    }

    #[test]
    fn messages_group_and_filter_awaiting() {
        let params = QueryFilters {
            awaiting_reply: true,
            ..filters()
        };
        let listing = service().query_messages(&params, 500);
        let others: Vec<&str> = listing.results.iter().map(|c| c.other.as_str()).collect();
        assert_eq!(others, vec!["Ada", "Linus"]);
        assert_eq!(listing.filters.get("awaiting_reply"), Some(&true.into()));
    }

    #[test]
    fn message_search_covers_name_and_content() {
        let params = QueryFilters {
            search: Some("answered".into()),
            ..filters()
        };
        let listing = service().query_messages(&params, 500);
        assert_eq!(listing.total, 1);
        assert_eq!(listing.results[0].other, "Grace");
        assert!(!listing.results[0].awaiting_your_reply);
    }

    #[test]
    fn recent_messages_apply_before_grouping() {
        let params = QueryFilters {
            recent_days: Some(45),
            ..filters()
        };
        let listing = service().query_messages(&params, 500);
        assert_eq!(listing.total, 1);
        assert_eq!(listing.results[0].other, "Ada");
    }

    #[test]
    fn missing_messages_report_an_error_field() {
        let mut data = dataset();
        data.messages = Table::default();
        let service = QueryService::new(data, now());
        let json = serde_json::to_value(service.run(&QueryRequest::new(QueryKind::Messages))).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["error"], NO_MESSAGES_ERROR);
    }

    #[test]
    fn summary_query_has_no_rows() {
        let json = serde_json::to_value(service().run(&QueryRequest::new(QueryKind::Summary))).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["summary"]["total_connections"], 4);
        assert_eq!(json["summary"]["senior_connections"], 3);
        assert!(json.get("results").is_none());
    }

    #[test]
    fn total_never_below_showing() {
        for limit in [0, 1, 3, 500] {
            for kind in [
                QueryKind::Connections,
                QueryKind::Posts,
                QueryKind::Comments,
                QueryKind::Messages,
            ] {
                let response = service().run(&QueryRequest::new(kind).with_limit(limit));
                let total = response.total().expect("listing total");
                let showing = response.showing().expect("listing showing");
                assert!(total >= showing);
                assert!(showing <= limit);
            }
        }
    }

    #[test]
    fn queries_leave_the_dataset_untouched() {
        let service = service();
        let before = service.dataset().connections.rows.clone();
        let params = QueryFilters {
            company: Some("google".into()),
            ..filters()
        };
        service.query_connections(&params, 1);
        assert_eq!(service.dataset().connections.rows, before);
    }
}

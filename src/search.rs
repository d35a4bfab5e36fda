use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::chart::{ChartDataBuilder, ChartDescription, ChartInput};
use crate::classifier::SearchModeClassifier;
use crate::config::{Config, SearchConfig};
use crate::counter::{CountOptions, KeywordCounter};
use crate::error::{LibrarySearchError, Result};
use crate::format::ResponseFormatter;
use crate::model::{
    ChartType, FileRecord, FoundFile, NewRequest, RecordFilter, RequestContext, ResponseType,
    SearchMode, SearchRequestRecord,
};
use crate::parser::KeywordPromptParser;
use crate::query::{FieldMatcher, KeywordPattern};
use crate::session_store::{Completion, RequestLog};
use crate::store::FileStore;

pub const NO_KEYWORDS_MESSAGE: &str = "I couldn't identify any keywords to analyze in your prompt. \
     Please specify keywords in quotes, backticks, or use phrases like 'mentioning X, Y, and Z'.";

/// Validated input of a library search.
#[derive(Debug, Clone)]
pub struct LibrarySearchParams {
    pub query: String,
    pub source: Option<String>,
    pub file_type: Option<String>,
    pub response_type: ResponseType,
    pub limit: usize,
    pub search_mode: Option<SearchMode>,
    pub file_id: Option<i64>,
}

impl LibrarySearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            source: None,
            file_type: None,
            response_type: ResponseType::Summary,
            limit: 10,
            search_mode: None,
            file_id: None,
        }
    }

    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            source: self.source.clone(),
            file_type: self.file_type.clone(),
        }
    }
}

/// Validated input of a keyword chart analysis.
#[derive(Debug, Clone)]
pub struct KeywordChartParams {
    pub prompt: String,
    pub counting: CountOptions,
    pub source_filter: Option<String>,
    pub type_filter: Option<String>,
    pub chart_type: ChartType,
}

impl KeywordChartParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            counting: CountOptions::default(),
            source_filter: None,
            type_filter: None,
            chart_type: ChartType::Bar,
        }
    }
}

/// Result of a chart request: the chart, or a message for the user.
#[derive(Debug, Clone)]
pub enum ChartReply {
    Chart(Box<ChartDescription>),
    Message(String),
}

impl ChartReply {
    pub fn into_text(self) -> Result<String> {
        match self {
            ChartReply::Chart(chart) => Ok(serde_json::to_string_pretty(&chart)?),
            ChartReply::Message(text) => Ok(text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSearchResponse {
    pub success: bool,
    pub response: String,
    pub query: String,
    pub request_id: i64,
    pub files_count: usize,
    pub response_type: ResponseType,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_files: i64,
    pub indexed_files: i64,
    pub total_requests: i64,
    pub successful_requests: i64,
}

/// One open audit row plus the clock started with it.
struct AuditRun<'a> {
    log: &'a dyn RequestLog,
    id: i64,
    started: Instant,
}

impl<'a> AuditRun<'a> {
    fn start(log: &'a dyn RequestLog, request: &NewRequest) -> Result<Self> {
        let started = Instant::now();
        let id = log.start(request)?;
        Ok(Self { log, id, started })
    }

    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn complete(
        &self,
        response_text: &str,
        found_files: Option<Vec<FoundFile>>,
        files_count: usize,
    ) -> Result<()> {
        self.log.complete(
            self.id,
            &Completion {
                response_text: response_text.to_string(),
                found_files,
                files_count: files_count as i64,
                processing_time: self.elapsed(),
            },
        )
    }

    fn fail(&self, err: &LibrarySearchError) {
        if let Err(e) = self.log.fail(self.id, &err.to_string(), self.elapsed()) {
            error!(request_id = self.id, error = %e, "failed to record request failure");
        }
    }
}

/// Search engine: resolves files, matches, counts, and writes the audit trail.
pub struct SearchEngine {
    files: Arc<dyn FileStore>,
    requests: Arc<dyn RequestLog>,
    config: Config,
    classifier: SearchModeClassifier,
    matcher: FieldMatcher,
    parser: KeywordPromptParser,
    counter: KeywordCounter,
    formatter: ResponseFormatter,
    charts: ChartDataBuilder,
}

impl SearchEngine {
    pub fn new(files: Arc<dyn FileStore>, requests: Arc<dyn RequestLog>) -> Self {
        Self::with_config(files, requests, SearchConfig::default())
    }

    pub fn with_config(
        files: Arc<dyn FileStore>,
        requests: Arc<dyn RequestLog>,
        search: SearchConfig,
    ) -> Self {
        Self::from_config(
            files,
            requests,
            Config {
                search,
                ..Config::default()
            },
        )
    }

    /// Engine that also reports the full loaded configuration through the
    /// system information tool.
    pub fn from_config(files: Arc<dyn FileStore>, requests: Arc<dyn RequestLog>, config: Config) -> Self {
        Self {
            files,
            requests,
            config,
            classifier: SearchModeClassifier::new(),
            matcher: FieldMatcher::new(),
            parser: KeywordPromptParser::new(),
            counter: KeywordCounter::new(),
            formatter: ResponseFormatter::new(),
            charts: ChartDataBuilder::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config.search
    }

    pub fn loaded_config(&self) -> &Config {
        &self.config
    }

    /// System information tool entry point. `report` renders the answer from
    /// the loaded configuration; the lookup is audited like a search.
    pub fn system_information(
        &self,
        ctx: &RequestContext,
        operation: &str,
        report: impl FnOnce(&Config) -> String,
    ) -> Result<String> {
        let request = NewRequest::new(
            ctx,
            "System information request",
            "system_information",
            json!({ "operation": operation }),
        );
        let audit = AuditRun::start(self.requests.as_ref(), &request)?;
        let text = report(&self.config);
        if let Err(e) = audit.complete(&text, None, 0) {
            audit.fail(&e);
            return Ok("Unable to check system information. Please check the application logs.".into());
        }
        info!(
            request_id = audit.id,
            session_id = %ctx.session_id,
            operation,
            "system information reported"
        );
        Ok(text)
    }

    /// Library search tool entry point. Datastore failures are recorded and
    /// embedded in the returned text; only an audit-log failure at start is an `Err`.
    pub fn classify_and_search(
        &self,
        ctx: &RequestContext,
        params: &LibrarySearchParams,
    ) -> Result<String> {
        if params.response_type == ResponseType::ContentSummary {
            let file_id = params
                .file_id
                .or_else(|| self.formatter.extract_file_id(&params.query));
            return match file_id {
                Some(id) => self.content_summary_by_id(ctx, id, &params.query),
                None => self.content_summary_by_name(ctx, &params.query),
            };
        }

        let mode = params
            .search_mode
            .unwrap_or_else(|| self.classifier.classify(&params.query));
        let request = NewRequest::new(
            ctx,
            params.query.clone(),
            params.response_type.as_str(),
            json!({
                "query": params.query,
                "source": params.source,
                "type": params.file_type,
                "limit": params.limit,
                "search_mode": mode,
                "response_type": params.response_type,
            }),
        );
        let audit = AuditRun::start(self.requests.as_ref(), &request)?;

        let outcome = (|| -> Result<(String, usize)> {
            let query = self.matcher.query(
                mode,
                &params.query,
                params.record_filter(),
                self.clamp_limit(params.limit),
            );
            let matched = self.files.search(&query)?;
            self.render_matches(&audit, &matched, params)
        })();

        match outcome {
            Ok((text, count)) => {
                info!(
                    request_id = audit.id,
                    session_id = %ctx.session_id,
                    mode = %mode,
                    files = count,
                    elapsed_ms = (audit.elapsed() * 1000.0) as u64,
                    "library search completed"
                );
                Ok(text)
            }
            Err(e) => {
                warn!(request_id = audit.id, error = %e, "library search failed");
                audit.fail(&e);
                Ok(format!("I encountered an error while searching: {e}"))
            }
        }
    }

    /// Keyword chart tool entry point.
    pub fn parse_and_chart(
        &self,
        ctx: &RequestContext,
        params: &KeywordChartParams,
    ) -> Result<ChartReply> {
        let parsed = self.parser.parse(&params.prompt);
        let counting = &params.counting;
        let request = NewRequest::new(
            ctx,
            params.prompt.clone(),
            "keyword_chart_data",
            json!({
                "prompt": params.prompt,
                "keywords": parsed.keywords,
                "search_filter": parsed.search_filter,
                "count_method": counting.method,
                "match_type": counting.match_type,
                "search_scope": counting.scope,
                "case_sensitive": counting.case_sensitive,
                "source_filter": params.source_filter,
                "type_filter": params.type_filter,
                "chart_type": params.chart_type,
            }),
        );
        let audit = AuditRun::start(self.requests.as_ref(), &request)?;

        if parsed.keywords.is_empty() {
            if let Err(e) = audit.complete(NO_KEYWORDS_MESSAGE, None, 0) {
                audit.fail(&e);
            }
            return Ok(ChartReply::Message(NO_KEYWORDS_MESSAGE.to_string()));
        }

        let outcome = (|| -> Result<ChartDescription> {
            let files = self.files.searchable_files(&RecordFilter {
                source: params.source_filter.clone(),
                file_type: params.type_filter.clone(),
            })?;
            let base: Vec<&FileRecord> = match parsed.search_filter.as_deref() {
                Some(filter) => {
                    let pattern = KeywordPattern::substring(filter, counting.case_sensitive);
                    self.matcher.filter_scope(&files, counting.scope, &pattern)
                }
                None => files.iter().collect(),
            };
            let results = self.counter.count_all(&base, &parsed.keywords, counting)?;
            let chart = self.charts.build(&ChartInput {
                results: &results,
                search_filter: parsed.search_filter.as_deref(),
                total_files: base.len(),
                chart_type: params.chart_type,
                count_method: counting.method,
            });
            audit.complete(&serde_json::to_string(&chart)?, None, base.len())?;
            Ok(chart)
        })();

        match outcome {
            Ok(chart) => {
                info!(
                    request_id = audit.id,
                    session_id = %ctx.session_id,
                    keywords = chart.metadata.keywords_analyzed,
                    files = chart.metadata.total_files_searched,
                    elapsed_ms = (audit.elapsed() * 1000.0) as u64,
                    "keyword chart built"
                );
                Ok(ChartReply::Chart(Box::new(chart)))
            }
            Err(e) => {
                warn!(request_id = audit.id, error = %e, "keyword analysis failed");
                audit.fail(&e);
                Ok(ChartReply::Message(format!("Error analyzing keywords: {e}")))
            }
        }
    }

    /// Search behind the web form: always comprehensive, errors are returned.
    pub fn web_search(
        &self,
        ctx: &RequestContext,
        params: &LibrarySearchParams,
    ) -> Result<WebSearchResponse> {
        let request = NewRequest::new(
            ctx,
            params.query.clone(),
            params.response_type.as_str(),
            json!({
                "query": params.query,
                "source": params.source,
                "type": params.file_type,
                "limit": params.limit,
            }),
        );
        let audit = AuditRun::start(self.requests.as_ref(), &request)?;

        let outcome = (|| -> Result<(String, usize)> {
            let query = self.matcher.web_query(
                &params.query,
                params.record_filter(),
                self.clamp_limit(params.limit),
            );
            let matched = self.files.search(&query)?;
            self.render_matches(&audit, &matched, params)
        })();

        match outcome {
            Ok((response, files_count)) => Ok(WebSearchResponse {
                success: true,
                response,
                query: params.query.clone(),
                request_id: audit.id,
                files_count,
                response_type: params.response_type,
                has_more: files_count >= params.limit,
            }),
            Err(e) => {
                audit.fail(&e);
                Err(e)
            }
        }
    }

    pub fn recent_requests(&self, limit: usize) -> Result<Vec<SearchRequestRecord>> {
        self.requests.recent(limit)
    }

    pub fn request(&self, id: i64) -> Result<SearchRequestRecord> {
        self.requests
            .get(id)?
            .ok_or_else(|| LibrarySearchError::NotFound(format!("request {id}")))
    }

    pub fn stats(&self) -> Result<DashboardStats> {
        let files = self.files.stats()?;
        let requests = self.requests.counts()?;
        Ok(DashboardStats {
            total_files: files.total_files,
            indexed_files: files.indexed_files,
            total_requests: requests.total_requests,
            successful_requests: requests.successful_requests,
        })
    }

    fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.config.search.max_limit.max(1))
    }

    fn render_matches(
        &self,
        audit: &AuditRun<'_>,
        matched: &[FileRecord],
        params: &LibrarySearchParams,
    ) -> Result<(String, usize)> {
        let refs: Vec<&FileRecord> = matched.iter().collect();
        let text = self
            .formatter
            .render(&refs, params.response_type, &params.query);
        let found = matched.iter().map(FoundFile::from).collect();
        audit.complete(&text, Some(found), matched.len())?;
        Ok((text, matched.len()))
    }

    fn content_summary_by_id(&self, ctx: &RequestContext, id: i64, query: &str) -> Result<String> {
        let request = NewRequest::new(
            ctx,
            format!("Content summary for file ID: {id} - {query}"),
            ResponseType::ContentSummary.as_str(),
            json!({ "file_id": id, "query": query }),
        );
        let audit = AuditRun::start(self.requests.as_ref(), &request)?;
        let outcome = self
            .files
            .find_by_id(id)
            .and_then(|file| self.finish_content_summary(&audit, file.as_ref(), query, || {
                self.formatter.not_found_by_id(id)
            }));
        self.content_summary_reply(&audit, outcome)
    }

    fn content_summary_by_name(&self, ctx: &RequestContext, query: &str) -> Result<String> {
        let request = NewRequest::new(
            ctx,
            format!("Content summary by name: {query}"),
            ResponseType::ContentSummary.as_str(),
            json!({ "query": query }),
        );
        let audit = AuditRun::start(self.requests.as_ref(), &request)?;
        let name = self.formatter.extract_file_name(query);
        let outcome = self
            .find_by_name(&name)
            .and_then(|file| self.finish_content_summary(&audit, file.as_ref(), query, || {
                self.formatter.not_found_by_name(&name)
            }));
        self.content_summary_reply(&audit, outcome)
    }

    /// Newest searchable file whose name or title contains `name`.
    fn find_by_name(&self, name: &str) -> Result<Option<FileRecord>> {
        if name.is_empty() {
            return Ok(None);
        }
        let files = self.files.search(&self.matcher.name_query(name))?;
        Ok(files.into_iter().next())
    }

    fn finish_content_summary(
        &self,
        audit: &AuditRun<'_>,
        file: Option<&FileRecord>,
        query: &str,
        not_found: impl FnOnce() -> String,
    ) -> Result<String> {
        match file {
            Some(file) => {
                let text = self.formatter.content_summary(file, query);
                audit.complete(&text, Some(vec![FoundFile::from(file)]), 1)?;
                Ok(text)
            }
            None => {
                let text = not_found();
                audit.complete(&text, None, 0)?;
                Ok(text)
            }
        }
    }

    fn content_summary_reply(&self, audit: &AuditRun<'_>, outcome: Result<String>) -> Result<String> {
        match outcome {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(request_id = audit.id, error = %e, "content summary failed");
                audit.fail(&e);
                Ok(format!("Error retrieving content summary: {e}"))
            }
        }
    }
}

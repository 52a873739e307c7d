//! The externally invocable query operation.
//!
//! [`QueryService::handle`] validates a raw request body, runs retrieval and
//! composition, and is the only place internal errors become status codes.

use axum::http::StatusCode;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::time::{Duration, Instant};
use tracing::field::Empty;
use tracing::{error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::composer::ResponseComposer;
use super::retriever::Retriever;
use crate::config::{QueryConfig, DEFAULT_MAX_TOP_K, DEFAULT_TOP_K};
use crate::error::{Error, Result};
use crate::types::Record;

/// A validated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub prompt: String,
    pub top_k: usize,
}

/// Defaults and bounds applied while validating `top_k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

impl From<&QueryConfig> for QueryLimits {
    fn from(config: &QueryConfig) -> Self {
        Self {
            default_top_k: config.default_top_k,
            max_top_k: config.max_top_k,
        }
    }
}

/// Successful response body.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsePayload {
    pub query: String,
    pub retrieved: Vec<Record>,
    pub response: String,
}

/// Status and JSON body produced for one request.
#[derive(Debug, Clone)]
pub struct QueryReply {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl QueryReply {
    fn error(status: StatusCode, message: &str, kind: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message, "kind": kind }),
        }
    }
}

/// Validation, retrieval, composition and error mapping for `/query`.
#[derive(Clone)]
pub struct QueryService {
    retriever: Retriever,
    composer: ResponseComposer,
    limits: QueryLimits,
    timeout: Option<Duration>,
}

impl QueryService {
    pub fn new(retriever: Retriever, limits: QueryLimits) -> Self {
        Self {
            retriever,
            composer: ResponseComposer::new(),
            limits,
            timeout: None,
        }
    }

    /// Bound each request's pipeline; the in-flight work is dropped on expiry.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Handle one raw request body.
    pub async fn handle(&self, body: &[u8]) -> QueryReply {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "query",
            %request_id,
            top_k = Empty,
            prompt_len = Empty
        );
        self.handle_inner(body).instrument(span).await
    }

    async fn handle_inner(&self, body: &[u8]) -> QueryReply {
        let started = Instant::now();

        let outcome = match self.parse(body) {
            Ok(query) => {
                let span = Span::current();
                span.record("top_k", query.top_k);
                span.record("prompt_len", query.prompt.len());
                info!("Query received");
                self.execute(&query).await
            }
            Err(e) => Err(e),
        };

        histogram!("ragquery_query_duration_seconds").record(started.elapsed().as_secs_f64());

        let outcome = outcome.and_then(|payload| {
            histogram!("ragquery_retrieved_records").record(payload.retrieved.len() as f64);
            Ok(serde_json::to_value(&payload)?)
        });

        match outcome {
            Ok(body) => {
                counter!("ragquery_queries_total", "outcome" => "ok").increment(1);
                QueryReply {
                    status: StatusCode::OK,
                    body,
                }
            }
            Err(err) => Self::error_reply(err),
        }
    }

    fn error_reply(err: Error) -> QueryReply {
        counter!("ragquery_queries_total", "outcome" => err.kind()).increment(1);

        match &err {
            Error::Validation(message) => {
                warn!(error = %message, "Rejected query");
                QueryReply::error(StatusCode::BAD_REQUEST, message, err.kind())
            }
            Error::Timeout { .. } => {
                error!(error = %err, "Query timed out");
                QueryReply::error(StatusCode::GATEWAY_TIMEOUT, "Request timed out", err.kind())
            }
            _ => {
                // Full detail stays in the log; the client only sees the kind.
                error!(error = %err, kind = err.kind(), "Query failed");
                QueryReply::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    err.kind(),
                )
            }
        }
    }

    /// Validate a raw JSON body into a [`Query`].
    pub fn parse(&self, body: &[u8]) -> Result<Query> {
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|_| Error::Validation("Request body must be a JSON object".into()))?;
        let JsonValue::Object(fields) = value else {
            return Err(Error::Validation(
                "Request body must be a JSON object".into(),
            ));
        };

        let prompt = match fields.get("prompt") {
            Some(JsonValue::String(text)) if !text.trim().is_empty() => text.clone(),
            None | Some(JsonValue::Null) | Some(JsonValue::String(_)) => {
                return Err(Error::Validation("Prompt is required".into()));
            }
            Some(_) => return Err(Error::Validation("Prompt must be a string".into())),
        };

        let requested = match fields.get("top_k") {
            None | Some(JsonValue::Null) => self.limits.default_top_k,
            Some(value) => parse_top_k(value)?,
        };
        let top_k = requested.min(self.limits.max_top_k);

        Ok(Query { prompt, top_k })
    }

    /// Run retrieval and composition for an already validated query.
    pub async fn execute(&self, query: &Query) -> Result<ResponsePayload> {
        let pipeline = async {
            let retrieval = self.retriever.retrieve(&query.prompt, query.top_k).await?;
            let response = self.composer.compose(&query.prompt, &retrieval.records)?;
            Ok::<_, Error>(ResponsePayload {
                query: query.prompt.clone(),
                retrieved: retrieval.records,
                response,
            })
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pipeline)
                .await
                .map_err(|_| Error::Timeout {
                    operation: "query".to_string(),
                    duration_ms: limit.as_millis() as u64,
                })?,
            None => pipeline.await,
        }
    }
}

/// Accept a positive JSON integer (`5` or `5.0`) or a string of digits.
fn parse_top_k(value: &JsonValue) -> Result<usize> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed.and_then(|k| usize::try_from(k).ok()) {
        Some(k) if k > 0 => Ok(k),
        _ => Err(Error::Validation(
            "top_k must be a positive integer".into(),
        )),
    }
}

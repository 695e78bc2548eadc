// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use sift_grid::{GridEngine, Record, ReferenceError};
use time::OffsetDateTime;

use crate::parser::{AiQueryResult, parse_response};
use crate::prompt::{build_system_prompt, build_user_prompt};
use crate::provider::{InvokeOptions, Provider};
use crate::schema::ColumnSchema;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

const EMPTY_QUERY: &str = "Query is empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

impl QueryPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Prompt, call, parse. Every failure folds into the returned result.
pub fn translate(
    provider: &dyn Provider,
    options: &InvokeOptions,
    query: &str,
    schema: &[ColumnSchema],
    now: OffsetDateTime,
) -> AiQueryResult {
    if query.trim().is_empty() {
        return AiQueryResult::failure(query, EMPTY_QUERY, None);
    }

    let system = build_system_prompt(schema, now);
    let user = build_user_prompt(query);
    let started = Instant::now();
    let result = match provider.invoke(&system, &user, options) {
        Ok(raw) => parse_response(&raw, schema, query),
        Err(error) => AiQueryResult::failure(query, error.to_string(), None),
    };

    match &result.error {
        None => tracing::info!(
            provider = provider.kind().as_str(),
            filters = result.filters.len(),
            sorts = result.sorting.len(),
            confidence = result.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query translated"
        ),
        Some(error) => tracing::warn!(
            provider = provider.kind().as_str(),
            %error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query failed"
        ),
    }
    result
}

/// Moves `Idle -> Requesting -> Succeeded | Failed`. The settled phase holds
/// until the caller takes the result with [`QueryPipeline::take_result`], which
/// returns the pipeline to `Idle`.
pub struct QueryPipeline {
    provider: Arc<dyn Provider>,
    options: InvokeOptions,
    phase: QueryPhase,
    last_result: Option<AiQueryResult>,
}

impl QueryPipeline {
    pub fn new(provider: Arc<dyn Provider>, options: InvokeOptions) -> Self {
        Self {
            provider,
            options,
            phase: QueryPhase::Idle,
            last_result: None,
        }
    }

    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    pub fn last_result(&self) -> Option<&AiQueryResult> {
        self.last_result.as_ref()
    }

    pub fn options(&self) -> &InvokeOptions {
        &self.options
    }

    pub fn run(&mut self, query: &str, schema: &[ColumnSchema]) -> AiQueryResult {
        self.phase = QueryPhase::Requesting;
        let result = translate(
            self.provider.as_ref(),
            &self.options,
            query,
            schema,
            OffsetDateTime::now_utc(),
        );
        self.phase = if result.is_success() {
            QueryPhase::Succeeded
        } else {
            QueryPhase::Failed
        };
        self.last_result = Some(result.clone());
        result
    }

    /// Hands over the settled result and goes back to `Idle`. Returns `None`
    /// while nothing has settled.
    pub fn take_result(&mut self) -> Option<AiQueryResult> {
        if !matches!(self.phase, QueryPhase::Succeeded | QueryPhase::Failed) {
            return None;
        }
        self.phase = QueryPhase::Idle;
        self.last_result.take()
    }

    pub fn reset(&mut self) {
        self.phase = QueryPhase::Idle;
        self.last_result = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedResult {
    pub request_id: u64,
    pub result: AiQueryResult,
}

/// Runs queries on worker threads. Only the most recently submitted request
/// is ever delivered; older results are dropped when they arrive.
pub struct QueryDispatcher {
    provider: Arc<dyn Provider>,
    options: InvokeOptions,
    tx: Sender<DispatchedResult>,
    rx: Receiver<DispatchedResult>,
    next_request_id: u64,
}

impl QueryDispatcher {
    pub fn new(provider: Arc<dyn Provider>, options: InvokeOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            provider,
            options,
            tx,
            rx,
            next_request_id: 0,
        }
    }

    pub fn submit(&mut self, query: impl Into<String>, schema: Vec<ColumnSchema>) -> u64 {
        self.next_request_id = self.next_request_id.saturating_add(1);
        let request_id = self.next_request_id;
        let query = query.into();
        let provider = Arc::clone(&self.provider);
        let options = self.options.clone();
        let tx = self.tx.clone();

        tracing::debug!(request_id, "dispatching query");
        thread::spawn(move || {
            let result = translate(
                provider.as_ref(),
                &options,
                &query,
                &schema,
                OffsetDateTime::now_utc(),
            );
            let _ = tx.send(DispatchedResult { request_id, result });
        });
        request_id
    }

    /// Zero until the first submit.
    pub fn latest_request(&self) -> u64 {
        self.next_request_id
    }

    pub fn try_recv(&self) -> Option<DispatchedResult> {
        while let Ok(dispatched) = self.rx.try_recv() {
            if self.is_current(&dispatched) {
                return Some(dispatched);
            }
        }
        None
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DispatchedResult> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(dispatched) if self.is_current(&dispatched) => return Some(dispatched),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn is_current(&self, dispatched: &DispatchedResult) -> bool {
        let current = dispatched.request_id == self.next_request_id;
        if !current {
            tracing::debug!(
                request_id = dispatched.request_id,
                latest = self.next_request_id,
                "discarding stale query result"
            );
        }
        current
    }
}

/// Replaces the engine's column filters and sorting with the result's when it
/// succeeded with at least `threshold` confidence. Returns whether it applied.
pub fn apply_to_engine<T: Record>(
    result: &AiQueryResult,
    engine: &mut GridEngine<T>,
    threshold: f64,
) -> Result<bool, ReferenceError> {
    if !result.meets_threshold(threshold) {
        tracing::debug!(
            confidence = result.confidence,
            threshold,
            "not applying query result"
        );
        return Ok(false);
    }
    engine.set_column_filters(result.filters.clone())?;
    engine.set_sorting(result.sorting.clone())?;
    Ok(true)
}

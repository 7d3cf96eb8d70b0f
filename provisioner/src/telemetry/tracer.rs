//! Request and dependency telemetry for timed operations.
//!
//! A [`Tracer`] starts [`Span`]s; ending a span exports it as a
//! `RequestData` (server spans) or `RemoteDependencyData` (everything else)
//! envelope. Spans of one operation share the trace id of the root span and
//! point at their parent through `ai.operation.parentId`.

use super::envelope::{
    BaseData, Envelope, RemoteDependencyData, RequestData, format_duration,
};
use super::exporter::Exporter;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

/// Identifies a span within an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    trace_id: String,
    span_id: String,
}

impl SpanContext {
    /// Starts a new operation.
    pub fn root() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
        }
    }

    /// A new span in the same operation.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }
}

fn new_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Work done on behalf of a caller, exported as a request
    Server,
    /// An outgoing call, exported as an HTTP dependency
    Client,
    /// Local work, exported as an in-process dependency
    Internal,
}

impl SpanKind {
    fn dependency_type(self) -> &'static str {
        match self {
            SpanKind::Client => "HTTP",
            SpanKind::Server | SpanKind::Internal => "InProc",
        }
    }
}

/// Starts spans for one component.
///
/// Without an exporter (telemetry disabled) spans are still timed and
/// correlated but never exported.
#[derive(Clone)]
pub struct Tracer {
    component: String,
    instrumentation_key: String,
    exporter: Option<Exporter>,
    parent: Option<SpanContext>,
}

impl Tracer {
    pub(crate) fn new(
        component: &str,
        instrumentation_key: String,
        exporter: Option<Exporter>,
        parent: Option<SpanContext>,
    ) -> Self {
        Self {
            component: component.to_string(),
            instrumentation_key,
            exporter,
            parent,
        }
    }

    /// A tracer that exports nothing.
    pub fn disabled(component: &str) -> Self {
        Self::new(component, String::new(), None, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.exporter.is_some()
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Starts a span under the tracer's parent context, or a new operation
    /// when it has none.
    pub fn start_span(&self, name: impl Into<String>, kind: SpanKind) -> Span {
        let (context, parent_id) = match &self.parent {
            Some(parent) => (parent.child(), Some(parent.span_id.clone())),
            None => (SpanContext::root(), None),
        };
        Span::start(self.clone(), name.into(), kind, context, parent_id)
    }
}

/// A timed operation. Nothing is exported until [`Span::end`].
pub struct Span {
    tracer: Tracer,
    name: String,
    kind: SpanKind,
    context: SpanContext,
    parent_id: Option<String>,
    started_at: DateTime<Utc>,
    started: Instant,
    target: Option<String>,
    result_code: Option<String>,
    properties: BTreeMap<String, String>,
}

impl Span {
    fn start(
        tracer: Tracer,
        name: String,
        kind: SpanKind,
        context: SpanContext,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            tracer,
            name,
            kind,
            context,
            parent_id,
            started_at: Utc::now(),
            started: Instant::now(),
            target: None,
            result_code: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Starts a span whose parent is this one.
    pub fn child(&self, name: impl Into<String>, kind: SpanKind) -> Span {
        Span::start(
            self.tracer.clone(),
            name.into(),
            kind,
            self.context.child(),
            Some(self.context.span_id.clone()),
        )
    }

    /// The host or service a dependency span talks to.
    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    /// Overrides the default result code (`0` on success, `1` on failure).
    pub fn set_result_code(&mut self, code: impl Into<String>) {
        self.result_code = Some(code.into());
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Stops the clock and queues the span for export.
    pub fn end(self, success: bool) {
        let Some(exporter) = self.tracer.exporter.clone() else {
            return;
        };
        if !exporter.submit(self.into_envelope(success)) {
            log::debug!("Telemetry queue is full, span dropped");
        }
    }

    fn into_envelope(self, success: bool) -> Envelope {
        let duration = format_duration(self.started.elapsed());
        let result_code = self
            .result_code
            .unwrap_or_else(|| if success { "0" } else { "1" }.to_string());

        let data = match self.kind {
            SpanKind::Server => BaseData::Request(RequestData {
                ver: 2,
                id: self.context.span_id.clone(),
                name: self.name,
                duration,
                response_code: result_code,
                success,
                properties: self.properties,
            }),
            kind => BaseData::RemoteDependency(RemoteDependencyData {
                ver: 2,
                id: self.context.span_id.clone(),
                name: self.name,
                duration,
                result_code,
                success,
                dependency_type: kind.dependency_type().to_string(),
                target: self.target,
                properties: self.properties,
            }),
        };

        Envelope::new(
            &self.tracer.instrumentation_key,
            &self.tracer.component,
            self.started_at,
            data,
        )
        .with_operation(&self.context.trace_id, self.parent_id.as_deref())
    }
}

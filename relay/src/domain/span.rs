//! Span documents
//!
//! The exporter accepts any serializable span, reading only
//! `context.trace_id`. `SpanRecord` is the standard OpenTelemetry JSON shape
//! for callers that do not bring their own type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub trace_state: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    #[default]
    #[serde(rename = "SpanKind.INTERNAL")]
    Internal,
    #[serde(rename = "SpanKind.SERVER")]
    Server,
    #[serde(rename = "SpanKind.CLIENT")]
    Client,
    #[serde(rename = "SpanKind.PRODUCER")]
    Producer,
    #[serde(rename = "SpanKind.CONSUMER")]
    Consumer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanStatus {
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One finished span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub name: String,
    pub context: SpanContext,
    #[serde(default)]
    pub kind: SpanKind,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SpanStatus,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
    #[serde(default)]
    pub events: Vec<JsonValue>,
    #[serde(default)]
    pub links: Vec<JsonValue>,
    #[serde(default)]
    pub resource: Map<String, JsonValue>,
}

impl SpanRecord {
    pub fn new(
        name: impl Into<String>,
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            context: SpanContext {
                trace_id: trace_id.into(),
                span_id: span_id.into(),
                trace_state: String::new(),
            },
            kind: SpanKind::default(),
            parent_id: None,
            start_time: None,
            end_time: None,
            status: SpanStatus::default(),
            attributes: Map::new(),
            events: Vec::new(),
            links: Vec::new(),
            resource: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.context.trace_id
    }
}

/// Read `context.trace_id` from a serialized span document.
pub fn trace_id_of(doc: &Map<String, JsonValue>) -> Option<&str> {
    doc.get("context")?
        .get("trace_id")?
        .as_str()
        .filter(|id| !id.is_empty())
}

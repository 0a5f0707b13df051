//! Export envelopes
//!
//! An envelope is the persisted form of one export call:
//!
//! ```json
//! {"project_name": ..., "trace_id": ..., "session_id": ...,
//!  "traces": [{..., "prompt_id": ...}],
//!  "metadata": {..., "id": ...}, "pipeline": {..., "id": ...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::identity::{assign_id, assign_key};

/// Key under which each span document carries its content id
pub const PROMPT_ID_KEY: &str = "prompt_id";

/// Caller-supplied context stamped on every envelope.
///
/// Held immutably by the exporter; enriched copies go into each envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportContext {
    pub metadata: Map<String, JsonValue>,
    pub pipeline: Map<String, JsonValue>,
}

impl ExportContext {
    pub fn new(metadata: Map<String, JsonValue>, pipeline: Map<String, JsonValue>) -> Self {
        Self { metadata, pipeline }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub project_name: Option<String>,
    pub trace_id: String,
    pub session_id: String,
    pub traces: Vec<JsonValue>,
    pub metadata: Map<String, JsonValue>,
    pub pipeline: Map<String, JsonValue>,
}

impl Envelope {
    /// Assemble an envelope, computing `metadata.id`, `pipeline.id` and a
    /// `prompt_id` per span.
    pub fn assemble(
        project_name: Option<String>,
        session_id: &str,
        trace_id: &str,
        spans: Vec<Map<String, JsonValue>>,
        context: &ExportContext,
    ) -> Self {
        let traces = spans
            .into_iter()
            .map(|span| JsonValue::Object(assign_key(span, PROMPT_ID_KEY)))
            .collect();

        Self {
            project_name,
            trace_id: trace_id.to_string(),
            session_id: session_id.to_string(),
            traces,
            metadata: assign_id(&context.metadata),
            pipeline: assign_id(&context.pipeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::{ID_KEY, compute_id};
    use serde_json::json;

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    fn context() -> ExportContext {
        ExportContext::new(
            map(json!({"user": "u1"})),
            map(json!({"llm_model": "gpt-4o", "vector_store": "faiss"})),
        )
    }

    #[test]
    fn test_assemble_sets_ids() {
        let span = map(json!({"name": "s", "context": {"trace_id": "t1"}}));
        let envelope = Envelope::assemble(
            Some("proj".to_string()),
            "sess",
            "t1",
            vec![span.clone()],
            &context(),
        );

        assert_eq!(envelope.project_name.as_deref(), Some("proj"));
        assert_eq!(envelope.session_id, "sess");
        assert_eq!(envelope.trace_id, "t1");
        assert_eq!(
            envelope.traces[0][PROMPT_ID_KEY],
            json!(compute_id(&span).unwrap())
        );
        assert_eq!(
            envelope.metadata[ID_KEY],
            json!(compute_id(&json!({"user": "u1"})).unwrap())
        );
        assert!(envelope.pipeline.contains_key(ID_KEY));
    }

    #[test]
    fn test_context_is_not_mutated() {
        let ctx = context();
        let before = ctx.clone();
        Envelope::assemble(None, "s", "t", vec![], &ctx);
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_serialized_field_names() {
        let envelope = Envelope::assemble(None, "s", "t", vec![], &ExportContext::default());
        let doc = serde_json::to_value(&envelope).unwrap();
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "project_name",
                "trace_id",
                "session_id",
                "traces",
                "metadata",
                "pipeline"
            ]
        );
        assert_eq!(doc["project_name"], JsonValue::Null);
    }
}

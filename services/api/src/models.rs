//! Request and Response Models
//!
//! Wire shapes of the feed endpoints, annotated for OpenAPI generation with
//! `utoipa`. Core types are exposed as opaque objects in the schema.

use sciscroll_core::{
    GeneratedFeed, InitialFeed,
    assembler::{ContentBlock, Graph, NodeSuggestion},
    strategy::Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Longest accepted topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 200;

#[derive(Deserialize, ToSchema, Debug)]
pub struct InitialPayload {
    #[schema(example = "Black Holes")]
    pub topic: String,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct GeneratePayload {
    #[serde(default)]
    #[schema(example = "black-holes")]
    pub current_node: String,
    /// Reading telemetry for the current node.
    #[schema(value_type = Object, example = json!({
        "total_time_on_node_ms": 25000, "scroll_events": 5, "go_deeper_clicks": 0,
        "sections_in_current_node": 4, "time_per_section_ms": 6250
    }))]
    pub time_data: Option<Value>,
    #[serde(default)]
    pub visited_nodes: Vec<String>,
    /// Last passage the reader finished. Non-string values are stringified.
    #[schema(value_type = Option<String>)]
    pub last_paragraph: Option<Value>,
    /// Accepted for client compatibility; unused.
    pub topic_path: Option<Vec<String>>,
    /// Accepted for client compatibility; unused.
    #[schema(value_type = Option<Object>)]
    pub graph: Option<Value>,
}

impl GeneratePayload {
    pub fn last_paragraph_text(&self) -> Option<String> {
        match self.last_paragraph.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
        .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct InitialResponse {
    #[schema(value_type = Vec<Object>)]
    pub content_blocks: Vec<ContentBlock>,
    #[schema(value_type = Object)]
    pub graph: Graph,
    #[schema(value_type = Vec<Object>)]
    pub next_nodes: Vec<NodeSuggestion>,
    #[schema(value_type = String, example = "deeper")]
    pub strategy_used: Strategy,
}

impl From<InitialFeed> for InitialResponse {
    fn from(feed: InitialFeed) -> Self {
        Self {
            content_blocks: feed.blocks,
            graph: feed.graph,
            next_nodes: feed.next_nodes,
            strategy_used: feed.strategy,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct GenerateResponse {
    #[schema(value_type = Vec<Object>)]
    pub content_blocks: Vec<ContentBlock>,
    #[schema(value_type = Vec<Object>)]
    pub next_nodes: Vec<NodeSuggestion>,
    #[schema(value_type = String, example = "branch")]
    pub strategy_used: Strategy,
    #[schema(example = 0.425)]
    pub engagement_score: f64,
}

impl From<GeneratedFeed> for GenerateResponse {
    fn from(feed: GeneratedFeed) -> Self {
        Self {
            content_blocks: feed.blocks,
            next_nodes: feed.next_nodes,
            strategy_used: feed.strategy,
            engagement_score: feed.engagement_score,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub available_apis: BTreeMap<String, bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_payload_defaults() {
        let payload: GeneratePayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(payload.current_node, "");
        assert!(payload.time_data.is_none());
        assert!(payload.visited_nodes.is_empty());

        let payload: GeneratePayload =
            serde_json::from_value(json!({"current_node": "optics", "time_data": null, "extra": 1})).unwrap();
        assert_eq!(payload.current_node, "optics");
        assert!(payload.time_data.is_none());
    }

    #[test]
    fn test_last_paragraph_is_stringified() {
        let text = |value: Value| {
            GeneratePayload {
                last_paragraph: Some(value),
                ..Default::default()
            }
            .last_paragraph_text()
        };
        assert_eq!(text(json!("Light bends.")), Some("Light bends.".to_string()));
        assert_eq!(text(json!(42)), Some("42".to_string()));
        assert_eq!(text(json!(null)), None);
        assert_eq!(text(json!("  ")), None);
        assert_eq!(GeneratePayload::default().last_paragraph_text(), None);
    }

    #[test]
    fn test_generate_response_serialization() {
        let response = GenerateResponse {
            content_blocks: Vec::new(),
            next_nodes: vec![NodeSuggestion::from_label("Lenses", "How lenses focus light")],
            strategy_used: Strategy::Branch,
            engagement_score: 0.425,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["strategy_used"], "branch");
        assert_eq!(value["engagement_score"], 0.425);
        assert_eq!(value["next_nodes"][0]["id"], "lenses");
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            available_apis: [("orchestrator".to_string(), true), ("xkcd".to_string(), true)]
                .into_iter()
                .collect(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"ok","available_apis":{"orchestrator":true,"xkcd":true}}"#);
    }
}

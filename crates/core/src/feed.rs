//! Exploration Feed
//!
//! The two entry points of the content pipeline: starting a session on a topic
//! and generating the next batch for a node the reader is on.

use crate::{
    assembler::{self, ContentBlock, Graph, NodeSuggestion},
    dispatcher::MediaDispatcher,
    engagement::{self, TelemetrySample},
    llm_client::Orchestrator,
    orchestration::{self, ORCHESTRATOR_KEY, PlanRequest},
    slug::{label_from_slug, slugify},
    strategy::Strategy,
};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

/// Engagement assumed for a brand new session.
pub const INITIAL_ENGAGEMENT: f64 = 0.7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("content orchestrator is not configured")]
    OrchestratorUnavailable,
    #[error("content orchestration failed for '{0}'")]
    OrchestrationFailed(String),
}

/// Input of [`ExplorationFeed::generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub current_node: String,
    /// Raw telemetry as sent by the client; sanitised before scoring.
    pub telemetry: Option<Value>,
    pub visited_node_ids: Vec<String>,
    pub last_read_passage: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialFeed {
    pub blocks: Vec<ContentBlock>,
    pub graph: Graph,
    pub next_nodes: Vec<NodeSuggestion>,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFeed {
    pub blocks: Vec<ContentBlock>,
    pub next_nodes: Vec<NodeSuggestion>,
    pub strategy: Strategy,
    pub engagement_score: f64,
}

pub struct ExplorationFeed {
    orchestrator: Arc<dyn Orchestrator>,
    dispatcher: MediaDispatcher,
}

impl ExplorationFeed {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, dispatcher: MediaDispatcher) -> Self {
        Self {
            orchestrator,
            dispatcher,
        }
    }

    /// Availability of the orchestrator and of every media source.
    pub fn availability(&self) -> BTreeMap<String, bool> {
        let mut availability = self.dispatcher.availability();
        availability.insert(ORCHESTRATOR_KEY.to_string(), self.orchestrator.available());
        availability
    }

    /// Starts a session on `topic`.
    pub async fn initial(&self, topic: &str) -> Result<InitialFeed, FeedError> {
        let topic_id = slugify(topic);
        let strategy = Strategy::Deeper;
        let (blocks, next_nodes) = self
            .run(topic, &topic_id, strategy, &[], None, INITIAL_ENGAGEMENT)
            .await?;
        let graph = Graph::for_topic(topic, &next_nodes);
        Ok(InitialFeed {
            blocks,
            graph,
            next_nodes,
            strategy,
        })
    }

    /// Generates the next batch for the node the reader is on.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedFeed, FeedError> {
        let sample = TelemetrySample::sanitize(request.telemetry.as_ref());
        let engagement_score = engagement::score(&sample);
        let strategy = Strategy::select(engagement_score);
        let node_id = slugify(&request.current_node);
        let topic_label = label_from_slug(&node_id);
        info!(
            node = %node_id,
            score = engagement_score,
            strategy = %strategy,
            visited = request.visited_node_ids.len(),
            "Generating next feed batch"
        );

        let (blocks, next_nodes) = self
            .run(
                &topic_label,
                &node_id,
                strategy,
                &request.visited_node_ids,
                request.last_read_passage.as_deref(),
                engagement_score,
            )
            .await?;
        Ok(GeneratedFeed {
            blocks,
            next_nodes,
            strategy,
            engagement_score,
        })
    }

    async fn run(
        &self,
        topic_label: &str,
        topic_id: &str,
        strategy: Strategy,
        visited_node_ids: &[String],
        last_read_passage: Option<&str>,
        engagement_score: f64,
    ) -> Result<(Vec<ContentBlock>, Vec<NodeSuggestion>), FeedError> {
        if !self.orchestrator.available() {
            warn!(topic = %topic_label, "Content requested without a configured orchestrator");
            return Err(FeedError::OrchestratorUnavailable);
        }
        let available_media_kinds = orchestration::available_media_kinds(&self.availability());
        let request = PlanRequest {
            topic_label,
            strategy,
            visited_node_ids,
            last_read_passage,
            engagement_score,
            available_media_kinds: &available_media_kinds,
        };
        let plan = orchestration::plan(self.orchestrator.as_ref(), &request)
            .await
            .ok_or_else(|| FeedError::OrchestrationFailed(topic_id.to_string()))?;
        let assembled =
            assembler::assemble(plan, topic_label, visited_node_ids, &self.dispatcher).await;
        Ok((assembled.blocks, assembled.next_nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm_client::MockOrchestrator,
        media::{MediaKind, MediaResult},
        sources::{MediaSource, MockMediaSource},
    };
    use serde_json::json;
    use std::sync::Mutex;

    fn orchestrator_replying(reply: Value, contexts: Arc<Mutex<Vec<String>>>) -> MockOrchestrator {
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_available().return_const(true);
        orchestrator.expect_complete_json().returning(move |_, context| {
            contexts.lock().unwrap().push(context.to_string());
            Some(reply.clone())
        });
        orchestrator
    }

    fn wikipedia() -> Arc<dyn MediaSource> {
        let mut source = MockMediaSource::new();
        source.expect_kind().return_const(MediaKind::WikipediaImage);
        source.expect_available().return_const(true);
        source.expect_fetch().returning(|_| {
            Ok(Some(MediaResult::new(
                "https://upload.wikimedia.org/bh.jpg",
                "Wikipedia",
                "Image from Wikipedia article: Black hole",
            )))
        });
        Arc::new(source)
    }

    fn plan_reply() -> Value {
        json!({
            "groups": [
                {"text": "Nothing escapes past the event horizon.",
                 "media_request": {"type": "wikipedia_image", "query": "Black hole"},
                 "group_role_text": "explanation", "group_role_media": "visual"},
                {"text": "Hawking showed black holes radiate.", "media_request": null,
                 "group_role_text": "funfact"}
            ],
            "next_nodes": [
                {"id": "hawking-radiation", "label": "Hawking Radiation", "description": "Quantum evaporation."},
                {"id": "black-holes", "label": "Black Holes", "description": "Self."}
            ]
        })
    }

    fn feed(orchestrator: MockOrchestrator) -> ExplorationFeed {
        ExplorationFeed::new(Arc::new(orchestrator), MediaDispatcher::new([wikipedia()]))
    }

    #[tokio::test]
    async fn test_initial_builds_graph() {
        let contexts = Arc::new(Mutex::new(Vec::new()));
        let feed = feed(orchestrator_replying(plan_reply(), contexts.clone()));

        let initial = feed.initial("Black Holes").await.unwrap();
        assert_eq!(initial.strategy, Strategy::Deeper);
        assert_eq!(initial.blocks.len(), 3);
        assert_eq!(initial.graph.nodes[0].id, "black-holes");
        assert_eq!(initial.graph.edges.len(), 1);
        assert_eq!(initial.graph.edges[0].target, "hawking-radiation");

        let context = contexts.lock().unwrap()[0].clone();
        assert!(context.contains("Strategy: deeper"));
        assert!(context.contains("Engagement Score: 0.7"));
        assert!(context.contains(r#"Available media types: ["wikipedia_image"]"#));
    }

    #[tokio::test]
    async fn test_generate_scores_and_filters_visited() {
        let contexts = Arc::new(Mutex::new(Vec::new()));
        let feed = feed(orchestrator_replying(plan_reply(), contexts.clone()));

        let request = GenerateRequest {
            current_node: "black-holes".to_string(),
            telemetry: Some(json!({
                "total_time_on_node_ms": 60000, "scroll_events": 12, "go_deeper_clicks": 2,
                "sections_in_current_node": 4, "time_per_section_ms": 15000
            })),
            visited_node_ids: vec!["black-holes".to_string(), "hawking-radiation".to_string()],
            last_read_passage: Some("Hawking showed black holes radiate.".to_string()),
        };
        let generated = feed.generate(&request).await.unwrap();
        assert_eq!(generated.engagement_score, 1.0);
        assert_eq!(generated.strategy, Strategy::Deeper);
        assert_eq!(generated.next_nodes, assembler::fallback_nodes("Black Holes"));

        let context = contexts.lock().unwrap()[0].clone();
        assert!(context.contains("Topic: Black Holes"));
        assert!(context.contains("Last Paragraph: Hawking showed black holes radiate."));
    }

    #[tokio::test]
    async fn test_generate_without_telemetry_pivots() {
        let feed = feed(orchestrator_replying(plan_reply(), Arc::new(Mutex::new(Vec::new()))));
        let generated = feed
            .generate(&GenerateRequest {
                current_node: "quantum-mechanics".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(generated.engagement_score, 0.0);
        assert_eq!(generated.strategy, Strategy::Pivot);
    }

    #[tokio::test]
    async fn test_unavailable_orchestrator_is_not_called() {
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_available().return_const(false);
        orchestrator.expect_complete_json().never();
        let feed = feed(orchestrator);

        assert_eq!(feed.initial("Optics").await, Err(FeedError::OrchestratorUnavailable));
        assert_eq!(feed.availability()["orchestrator"], false);
        assert_eq!(feed.availability()["wikipedia"], true);
    }

    #[tokio::test]
    async fn test_failed_plan_is_an_orchestration_failure() {
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_available().return_const(true);
        orchestrator.expect_complete_json().returning(|_, _| None);
        let feed = feed(orchestrator);

        let err = feed
            .generate(&GenerateRequest {
                current_node: "Dark Matter".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, FeedError::OrchestrationFailed("dark-matter".to_string()));
    }
}

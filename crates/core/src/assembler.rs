//! Response Assembly
//!
//! Turns a [`ContentPlan`] into ordered content blocks and a clean list of
//! next-node suggestions. Media lookups for all groups run concurrently; block
//! order always follows group order.

use crate::{
    dispatcher::MediaDispatcher,
    media::{MediaKind, MediaResult, MediaRole, TextRole},
    orchestration::{ContentPlan, NodeCandidate},
    slug::{MAX_SLUG_LEN, label_from_slug, slugify},
};
use futures::future::join_all;
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Process-local short identifier: `prefix-` followed by 8 random hex digits.
pub fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &hex[..8])
}

/// One rendered unit of the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        id: String,
        group_id: String,
        role: TextRole,
        content: String,
    },
    Media {
        id: String,
        group_id: String,
        role: MediaRole,
        kind: MediaKind,
        /// Short label describing the item.
        content: String,
        media: MediaResult,
    },
}

impl ContentBlock {
    pub fn id(&self) -> &str {
        match self {
            ContentBlock::Text { id, .. } | ContentBlock::Media { id, .. } => id,
        }
    }

    pub fn group_id(&self) -> &str {
        match self {
            ContentBlock::Text { group_id, .. } | ContentBlock::Media { group_id, .. } => group_id,
        }
    }

    /// Wire type: `text` or the media kind.
    pub fn block_type(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Media { kind, .. } => kind.as_str(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            ContentBlock::Text { role, .. } => role.as_str(),
            ContentBlock::Media { role, .. } => role.as_str(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ContentBlock::Text { content, .. } | ContentBlock::Media { content, .. } => content,
        }
    }

    pub fn media(&self) -> Option<&MediaResult> {
        match self {
            ContentBlock::Text { .. } => None,
            ContentBlock::Media { media, .. } => Some(media),
        }
    }
}

/// Serialises to the flat shape the feed frontend renders:
/// `{id, type, content, group_id, group_role, media?}`.
impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let media = self.media();
        let mut state =
            serializer.serialize_struct("ContentBlock", if media.is_some() { 6 } else { 5 })?;
        state.serialize_field("id", self.id())?;
        state.serialize_field("type", self.block_type())?;
        state.serialize_field("content", self.content())?;
        state.serialize_field("group_id", self.group_id())?;
        state.serialize_field("group_role", self.role())?;
        if let Some(media) = media {
            state.serialize_field("media", media)?;
        }
        state.end()
    }
}

/// A suggested follow-up topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSuggestion {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl NodeSuggestion {
    /// Builds a node whose id is the slug of its label.
    pub fn from_label(label: &str, description: impl Into<String>) -> Self {
        Self {
            id: slugify(label),
            label: label.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Exploration graph returned at session start. Nodes are unique by id and
/// nothing is ever removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub nodes: Vec<NodeSuggestion>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn seeded(root: NodeSuggestion) -> Self {
        Self {
            nodes: vec![root],
            edges: Vec::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Adds a node unless one with the same id exists. Returns whether it was added.
    pub fn add_node(&mut self, node: NodeSuggestion) -> bool {
        if self.contains(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.edges.push(Edge {
            source: source.to_string(),
            target: target.to_string(),
        });
    }

    /// Graph for a new session: the topic as root, one edge per suggestion.
    pub fn for_topic(topic_label: &str, next_nodes: &[NodeSuggestion]) -> Self {
        let root = NodeSuggestion::from_label(topic_label, format!("Exploring {topic_label}"));
        let root_id = root.id.clone();
        let mut graph = Self::seeded(root);
        for node in next_nodes.iter().filter(|n| n.id != root_id) {
            if graph.add_node(node.clone()) {
                graph.add_edge(&root_id, &node.id);
            }
        }
        graph
    }
}

/// Output of [`assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub blocks: Vec<ContentBlock>,
    pub next_nodes: Vec<NodeSuggestion>,
}

/// Resolves the plan's media and builds blocks and next nodes.
pub async fn assemble(
    plan: ContentPlan,
    topic_label: &str,
    visited_node_ids: &[String],
    dispatcher: &MediaDispatcher,
) -> Assembled {
    let lookups = plan.groups.iter().map(|group| async move {
        match &group.media_request {
            Some(request) => dispatcher.resolve(request, topic_label).await,
            None => None,
        }
    });
    let resolved = join_all(lookups).await;

    let mut blocks = Vec::with_capacity(plan.groups.len() * 2);
    for (group, media) in plan.groups.into_iter().zip(resolved) {
        let group_id = short_id("grp");
        if let Some(text) = group.text.filter(|t| !t.trim().is_empty()) {
            blocks.push(ContentBlock::Text {
                id: short_id("text"),
                group_id: group_id.clone(),
                role: group.text_role.unwrap_or_default(),
                content: text,
            });
        }
        if let (Some(request), Some(media)) = (group.media_request, media) {
            blocks.push(ContentBlock::Media {
                id: short_id(request.kind.as_str()),
                group_id,
                role: group.media_role.unwrap_or_default(),
                kind: request.kind,
                content: format!("{topic_label}: {} content", request.kind),
                media,
            });
        }
    }

    let next_nodes = next_nodes(plan.next_nodes, topic_label, visited_node_ids);
    info!(
        topic = %topic_label,
        blocks = blocks.len(),
        next_nodes = next_nodes.len(),
        "Assembled feed content"
    );
    Assembled { blocks, next_nodes }
}

/// Normalises candidates into suggestions: slug ids, no visited ids, no
/// duplicates. Never returns an empty list.
pub fn next_nodes(
    candidates: Vec<NodeCandidate>,
    topic_label: &str,
    visited_node_ids: &[String],
) -> Vec<NodeSuggestion> {
    let visited: HashSet<&str> = visited_node_ids.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for candidate in candidates {
        let Some(node) = suggestion_from(candidate) else {
            continue;
        };
        if visited.contains(node.id.as_str()) || !seen.insert(node.id.clone()) {
            debug!(id = %node.id, "Dropping visited or duplicate next node");
            continue;
        }
        nodes.push(node);
    }

    if nodes.is_empty() {
        debug!(topic = %topic_label, "No usable next nodes; using fallbacks");
        return fallback_nodes(topic_label)
            .into_iter()
            .map(|node| unvisited(node, &visited))
            .collect();
    }
    nodes
}

fn suggestion_from(candidate: NodeCandidate) -> Option<NodeSuggestion> {
    let description = candidate.description.unwrap_or_default();
    if let Some(label) = candidate.label {
        let id = slugify(&label);
        if !id.is_empty() {
            return Some(NodeSuggestion {
                id,
                label,
                description,
            });
        }
    }
    // Labels without slug characters fall back to the raw id.
    let id = candidate
        .id
        .as_deref()
        .map(slugify)
        .filter(|slug| !slug.is_empty())?;
    Some(NodeSuggestion {
        label: label_from_slug(&id),
        id,
        description,
    })
}

/// Numbers a fallback node (`-2`, `-3`, ...) until its id is not visited.
fn unvisited(node: NodeSuggestion, visited: &HashSet<&str>) -> NodeSuggestion {
    if !visited.contains(node.id.as_str()) {
        return node;
    }
    let mut n = 1usize;
    loop {
        n += 1;
        let suffix = format!("-{n}");
        let room = MAX_SLUG_LEN.saturating_sub(suffix.len());
        let base: String = node.id.chars().take(room).collect();
        let id = format!("{}{suffix}", base.trim_end_matches('-'));
        if !visited.contains(id.as_str()) {
            return NodeSuggestion {
                id,
                label: format!("{} {n}", node.label),
                description: node.description,
            };
        }
    }
}

/// The two generic suggestions used when nothing else is left.
pub fn fallback_nodes(topic_label: &str) -> Vec<NodeSuggestion> {
    vec![
        NodeSuggestion::from_label(
            &format!("{topic_label} Deep Dive"),
            format!("Explore {topic_label} in greater detail"),
        ),
        NodeSuggestion::from_label(
            &format!("Beyond {topic_label}"),
            format!("Topics related to {topic_label}"),
        ),
    ]
}

//! Content Orchestration Protocol
//!
//! Builds the instructions and per-call context sent to the orchestrator and
//! turns its reply into a [`ContentPlan`]. Unknown media kinds and invalid role
//! tags are rejected here, so everything downstream works with closed enums.

use crate::{
    llm_client::Orchestrator,
    media::{MediaKind, MediaRequest, MediaRole, TextRole},
    slug::{label_from_slug, slugify},
    strategy::Strategy,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Availability key of the orchestrator itself; never a media source.
pub const ORCHESTRATOR_KEY: &str = "orchestrator";

/// Expected number of content groups in a plan.
pub const GROUPS_RANGE: std::ops::RangeInclusive<usize> = 2..=8;
/// Expected number of next-node suggestions in a plan.
pub const NEXT_NODES_RANGE: std::ops::RangeInclusive<usize> = 2..=4;

/// Marker placed in the context when there is no previously read passage.
pub const NO_PRIOR_CONTENT: &str = "None (first content)";

pub const SYSTEM_INSTRUCTIONS: &str = r#"You are the content orchestrator for SciScroll, an infinite feed for exploring a graph of scientific knowledge.

For every call you receive the current topic, the exploration strategy (deeper, branch or pivot), the reader's engagement score between 0 and 1, the ids of the nodes already visited, the last passage the reader finished, and the media types that can currently be fetched.

Reply with one JSON object and nothing else, shaped exactly like this:
{
  "groups": [
    {
      "text": "Two to four sentences of accurate, engaging explanation.",
      "media_request": {"type": "wikipedia_image", "query": "Black hole"},
      "group_role_text": "explanation",
      "group_role_media": "visual"
    }
  ],
  "next_nodes": [
    {"id": "hawking-radiation", "label": "Hawking Radiation", "description": "Thermal radiation predicted to leak from black holes through quantum effects at the event horizon."}
  ]
}

GROUPS
- Produce between 2 and 8 groups; 5 to 8 is the usual amount.
- "text" and "media_request" may each be null, but never both.
- "group_role_text" is one of: explanation, caption, context, funfact.
- "group_role_media" is one of: visual, diagram, discussion, humor, social.
- The first group picks up where the last passage left off; each group leads into the next; the final group hooks into the suggested next nodes.

MEDIA REQUESTS
- "type" is one of: unsplash, wikipedia_image, wikimedia, reddit, xkcd, meme, tweet. Only use types listed as available.
- Do not use the same media type in two consecutive groups.
- wikipedia_image: the query is a short article title such as "Neutron star", never a sentence.
- wikimedia: two or three scientific words such as "DNA structure".
- xkcd: only when the topic plausibly matches a classic xkcd theme; the query holds the core keyword ("gravity", "quantum").
- meme: add "top_text" and "bottom_text" that are funny and specific to the subtopic.
- tweet: a specific scientific term or phrase.
- unsplash: a descriptive photo search.

NEXT NODES
- Suggest 2 to 4 next nodes. Each has "id", "label" and "description".
- "id" is the slug of "label": lowercase, hyphens instead of spaces, no punctuation, at most 80 characters.
- Never suggest a node whose id appears in the visited list.
- Descriptions are one scientifically specific sentence, not a generic blurb.

STRATEGY
- deeper: mechanism-level detail, equations, experiments and diagrams. Build on what the reader already read and on the visited nodes; do not repeat introductions. Next nodes are subtopics or mechanisms inside the current topic.
- branch: connections to adjacent fields and broader context, illustrated with varied media. Next nodes are related fields.
- pivot: lighter, surprising content with humor (memes with good captions, comics, posts) that is still educational. Next nodes are different but interesting scientific topics."#;

/// Everything the orchestrator needs for one call.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub topic_label: &'a str,
    pub strategy: Strategy,
    pub visited_node_ids: &'a [String],
    pub last_read_passage: Option<&'a str>,
    pub engagement_score: f64,
    pub available_media_kinds: &'a [MediaKind],
}

/// One narrative beat of a plan: optional text and optional media.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanGroup {
    pub text: Option<String>,
    pub media_request: Option<MediaRequest>,
    /// `None` when the tag was missing or not a text role.
    pub text_role: Option<TextRole>,
    /// `None` when the tag was missing or not a media role.
    pub media_role: Option<MediaRole>,
}

/// A next-node suggestion exactly as the orchestrator returned it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeCandidate {
    pub id: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// The orchestrator's plan for one batch of content. Consumed once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentPlan {
    pub groups: Vec<PlanGroup>,
    pub next_nodes: Vec<NodeCandidate>,
}

/// Media kinds whose source is currently available, in [`MediaKind::ALL`] order.
pub fn available_media_kinds(availability: &BTreeMap<String, bool>) -> Vec<MediaKind> {
    let mut kinds: Vec<MediaKind> = availability
        .iter()
        .filter(|(name, available)| **available && name.as_str() != ORCHESTRATOR_KEY)
        .filter_map(|(name, _)| MediaKind::from_source_name(name))
        .collect();
    kinds.sort();
    kinds
}

/// Renders the per-call context block.
pub fn build_context(request: &PlanRequest<'_>) -> String {
    let visited = Value::from(request.visited_node_ids.to_vec());
    let media = Value::from(
        request
            .available_media_kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>(),
    );
    let passage = request
        .last_read_passage
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(NO_PRIOR_CONTENT);

    format!(
        "Topic: {topic}\n\
         Strategy: {strategy}\n\
         Engagement Score: {score}\n\
         Visited Nodes: {visited}\n\
         Last Paragraph: {passage}\n\
         \n\
         Available media types: {media}\n\
         \n\
         Generate educational content following the {strategy} strategy.\n\
         Suggest 2-4 next_nodes the user hasn't visited yet.",
        topic = request.topic_label,
        strategy = request.strategy,
        score = request.engagement_score,
    )
}

/// Asks the orchestrator for a plan. `None` means the call failed or the reply
/// was not a usable plan; no retry is attempted.
pub async fn plan(orchestrator: &dyn Orchestrator, request: &PlanRequest<'_>) -> Option<ContentPlan> {
    if !orchestrator.available() {
        warn!("Orchestrator is not available; cannot plan content");
        return None;
    }
    let context = build_context(request);
    let reply = orchestrator
        .complete_json(SYSTEM_INSTRUCTIONS, &context)
        .await?;
    let plan = parse_plan(&reply, request.topic_label)?;
    info!(
        topic = %request.topic_label,
        strategy = %request.strategy,
        groups = plan.groups.len(),
        next_nodes = plan.next_nodes.len(),
        "Received content plan"
    );
    Some(plan)
}

/// Parses an orchestrator reply.
///
/// The reply must be an object with a `groups` array; anything else is a
/// failure. Individual groups or suggestions that cannot be used are dropped.
pub fn parse_plan(reply: &Value, topic_label: &str) -> Option<ContentPlan> {
    let Value::Object(root) = reply else {
        warn!("Orchestrator reply is not a JSON object");
        return None;
    };
    let Some(Value::Array(raw_groups)) = root.get("groups") else {
        warn!("Orchestrator reply has no 'groups' array");
        return None;
    };

    let groups: Vec<PlanGroup> = raw_groups
        .iter()
        .filter_map(|g| parse_group(g, topic_label))
        .collect();
    if !GROUPS_RANGE.contains(&raw_groups.len()) {
        warn!(count = raw_groups.len(), "Plan group count outside the expected range");
    }

    let next_nodes: Vec<NodeCandidate> = match root.get("next_nodes") {
        Some(Value::Array(items)) => items.iter().filter_map(parse_candidate).collect(),
        _ => Vec::new(),
    };
    if !NEXT_NODES_RANGE.contains(&next_nodes.len()) {
        warn!(count = next_nodes.len(), "Plan next-node count outside the expected range");
    }

    Some(ContentPlan { groups, next_nodes })
}

fn parse_group(raw: &Value, topic_label: &str) -> Option<PlanGroup> {
    let Value::Object(group) = raw else {
        return None;
    };
    let text = non_empty_str(group, "text");
    let media_request = group
        .get("media_request")
        .and_then(|m| parse_media_request(m, topic_label));
    if text.is_none() && media_request.is_none() {
        return None;
    }
    Some(PlanGroup {
        text,
        media_request,
        text_role: group
            .get("group_role_text")
            .and_then(Value::as_str)
            .and_then(TextRole::parse),
        media_role: group
            .get("group_role_media")
            .and_then(Value::as_str)
            .and_then(MediaRole::parse),
    })
}

fn parse_media_request(raw: &Value, topic_label: &str) -> Option<MediaRequest> {
    let Value::Object(request) = raw else {
        return None;
    };
    let kind = match request.get("type").and_then(Value::as_str) {
        None => MediaKind::Unsplash,
        Some(name) => match MediaKind::parse(name) {
            Some(kind) => kind,
            None => {
                warn!(kind = %name, "Dropping media request with unknown type");
                return None;
            }
        },
    };
    let query = non_empty_str(request, "query").unwrap_or_else(|| topic_label.to_string());
    Some(MediaRequest {
        kind,
        query,
        caption_top: non_empty_str(request, "top_text")
            .or_else(|| non_empty_str(request, "caption_top")),
        caption_bottom: non_empty_str(request, "bottom_text")
            .or_else(|| non_empty_str(request, "caption_bottom")),
    })
}

fn parse_candidate(raw: &Value) -> Option<NodeCandidate> {
    match raw {
        // Older replies listed bare slugs or labels.
        Value::String(raw) => {
            let id = slugify(raw);
            (!id.is_empty()).then(|| NodeCandidate {
                label: Some(label_from_slug(&id)),
                id: Some(id),
                description: None,
            })
        }
        Value::Object(node) => {
            let candidate = NodeCandidate {
                id: non_empty_str(node, "id"),
                label: non_empty_str(node, "label"),
                description: non_empty_str(node, "description"),
            };
            (candidate.id.is_some() || candidate.label.is_some()).then_some(candidate)
        }
        _ => None,
    }
}

fn non_empty_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

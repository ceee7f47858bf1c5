//! Structural checks on serialised feed responses. Errors are diagnostics for
//! the logs; callers return the response regardless.

use crate::{
    media::{MediaKind, MediaRole, TextRole},
    strategy::Strategy,
};
use serde_json::Value;

const BLOCK_KEYS: [&str; 5] = ["id", "type", "content", "group_id", "group_role"];
const GENERATE_KEYS: [&str; 4] = ["content_blocks", "next_nodes", "strategy_used", "engagement_score"];
const INITIAL_KEYS: [&str; 4] = ["content_blocks", "graph", "next_nodes", "strategy_used"];

pub fn validate_content_block(block: &Value) -> Vec<String> {
    let Value::Object(block) = block else {
        return vec!["Block is not an object".to_string()];
    };
    let mut errors = missing_keys(block, &BLOCK_KEYS);

    let Some(block_type) = block.get("type") else {
        return errors;
    };
    let role = block.get("group_role").and_then(Value::as_str);
    match block_type.as_str() {
        Some("text") => {
            if let Some(role) = role.filter(|r| TextRole::parse(r).is_none()) {
                errors.push(format!("Invalid text group_role: {role}"));
            }
            if block.get("content").and_then(Value::as_str).is_none_or(|c| c.trim().is_empty()) {
                errors.push("Text block has no content".to_string());
            }
        }
        Some(kind) if MediaKind::parse(kind).is_some() => {
            if let Some(role) = role.filter(|r| MediaRole::parse(r).is_none()) {
                errors.push(format!("Invalid media group_role: {role}"));
            }
            match block.get("media") {
                None => errors.push("Media block missing 'media' key".to_string()),
                Some(Value::Object(media)) => {
                    for key in ["url", "source"] {
                        if media.get(key).and_then(Value::as_str).is_none_or(str::is_empty) {
                            errors.push(format!("Media block missing '{key}'"));
                        }
                    }
                }
                Some(_) => errors.push("Media block 'media' is not an object".to_string()),
            }
        }
        _ => errors.push(format!("Unknown block type: {block_type}")),
    }
    errors
}

/// Checks a `generate` response.
pub fn validate_generate_response(response: &Value) -> Vec<String> {
    let Value::Object(map) = response else {
        return vec!["Response is not an object".to_string()];
    };
    let mut errors = missing_keys(map, &GENERATE_KEYS);

    if let Some(strategy) = map.get("strategy_used") {
        if strategy.as_str().and_then(Strategy::parse).is_none() {
            errors.push(format!("Invalid strategy: {strategy}"));
        }
    }
    if let Some(score) = map.get("engagement_score") {
        match score.as_f64() {
            None => errors.push("engagement_score is not a number".to_string()),
            Some(s) if !(0.0..=1.0).contains(&s) => {
                errors.push(format!("engagement_score out of range: {s}"))
            }
            Some(_) => {}
        }
    }
    errors.extend(common_errors(response));
    errors
}

/// Checks an `initial` response.
pub fn validate_initial_response(response: &Value) -> Vec<String> {
    let Value::Object(map) = response else {
        return vec!["Response is not an object".to_string()];
    };
    let mut errors = missing_keys(map, &INITIAL_KEYS);

    if let Some(strategy) = map.get("strategy_used") {
        if strategy.as_str() != Some(Strategy::Deeper.as_str()) {
            errors.push(format!("Initial strategy should be 'deeper', got: {strategy}"));
        }
    }
    match map.get("graph") {
        None => {}
        Some(Value::Object(graph)) => {
            match graph.get("nodes") {
                None => errors.push("graph missing 'nodes'".to_string()),
                Some(Value::Array(nodes)) if !nodes.is_empty() => {}
                Some(_) => errors.push("graph 'nodes' must be a non-empty list".to_string()),
            }
            if !graph.contains_key("edges") {
                errors.push("graph missing 'edges'".to_string());
            }
        }
        Some(_) => errors.push("graph is not an object".to_string()),
    }
    errors.extend(common_errors(response));
    errors
}

fn missing_keys(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter(|k| !map.contains_key(**k))
        .map(|k| format!("Missing key: {k}"))
        .collect()
}

fn common_errors(response: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    match response.get("content_blocks") {
        None => {}
        Some(Value::Array(blocks)) => {
            for (i, block) in blocks.iter().enumerate() {
                errors.extend(
                    validate_content_block(block)
                        .into_iter()
                        .map(|e| format!("content_blocks[{i}]: {e}")),
                );
            }
        }
        Some(_) => errors.push("content_blocks is not a list".to_string()),
    }
    if let Some(nodes) = response.get("next_nodes") {
        if !nodes.is_array() {
            errors.push("next_nodes is not a list".to_string());
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_block() -> Value {
        json!({"id": "text-1", "type": "text", "content": "Hi", "group_id": "grp-1", "group_role": "explanation"})
    }

    fn media_block() -> Value {
        json!({
            "id": "xkcd-1", "type": "xkcd", "content": "Gravity: xkcd content", "group_id": "grp-1",
            "group_role": "humor", "media": {"url": "https://imgs.xkcd.com/a.png", "source": "xkcd"}
        })
    }

    #[test]
    fn test_valid_blocks() {
        assert!(validate_content_block(&text_block()).is_empty());
        assert!(validate_content_block(&media_block()).is_empty());
    }

    #[test]
    fn test_block_errors() {
        assert_eq!(validate_content_block(&json!("text")), vec!["Block is not an object"]);

        let mut block = media_block();
        block["media"] = json!({"url": "https://x"});
        assert_eq!(validate_content_block(&block), vec!["Media block missing 'source'"]);

        block.as_object_mut().unwrap().remove("media");
        assert_eq!(validate_content_block(&block), vec!["Media block missing 'media' key"]);

        let mut block = text_block();
        block["group_role"] = json!("humor");
        assert_eq!(validate_content_block(&block), vec!["Invalid text group_role: humor"]);

        let mut block = text_block();
        block["type"] = json!("hologram");
        assert_eq!(validate_content_block(&block), vec![r#"Unknown block type: "hologram""#]);

        let errors = validate_content_block(&json!({"type": "text"}));
        assert!(errors.contains(&"Missing key: id".to_string()));
        assert!(errors.contains(&"Text block has no content".to_string()));
    }

    #[test]
    fn test_generate_response() {
        let response = json!({
            "content_blocks": [text_block(), media_block()],
            "next_nodes": [],
            "strategy_used": "branch",
            "engagement_score": 0.425
        });
        assert!(validate_generate_response(&response).is_empty());

        let bad = json!({
            "content_blocks": [{"type": "text"}],
            "next_nodes": {},
            "strategy_used": "sideways",
            "engagement_score": 1.5
        });
        let errors = validate_generate_response(&bad);
        assert!(errors.contains(&r#"Invalid strategy: "sideways""#.to_string()));
        assert!(errors.contains(&"engagement_score out of range: 1.5".to_string()));
        assert!(errors.contains(&"next_nodes is not a list".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("content_blocks[0]: Missing key")));

        let errors = validate_generate_response(&json!({"engagement_score": "high"}));
        assert!(errors.contains(&"engagement_score is not a number".to_string()));
        assert!(errors.contains(&"Missing key: strategy_used".to_string()));
    }

    #[test]
    fn test_initial_response() {
        let response = json!({
            "content_blocks": [text_block()],
            "graph": {"nodes": [{"id": "optics", "label": "Optics"}], "edges": []},
            "next_nodes": [],
            "strategy_used": "deeper"
        });
        assert!(validate_initial_response(&response).is_empty());

        let bad = json!({
            "content_blocks": "none",
            "graph": {"nodes": []},
            "next_nodes": [],
            "strategy_used": "pivot"
        });
        let errors = validate_initial_response(&bad);
        assert_eq!(
            errors,
            vec![
                r#"Initial strategy should be 'deeper', got: "pivot""#.to_string(),
                "graph 'nodes' must be a non-empty list".to_string(),
                "graph missing 'edges'".to_string(),
                "content_blocks is not a list".to_string(),
            ]
        );
        assert_eq!(validate_initial_response(&json!(null)), vec!["Response is not an object"]);
    }
}

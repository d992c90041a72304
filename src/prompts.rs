//! Prompt templates sent to the generative backend
//!
//! Exact wording is not part of any contract; the section labels
//! (`Transcript JSON:`, `ExistingMap:`, `Available tools:`) are stable because
//! scripted backends in tests key off them.

/// Label preceding the chunk payload in extraction prompts
pub const TRANSCRIPT_LABEL: &str = "Transcript JSON:";
/// Label preceding the existing map in merge prompts
pub const EXISTING_LABEL: &str = "ExistingMap:";
/// Label preceding the tool list in planning prompts
pub const TOOLS_LABEL: &str = "Available tools:";

const NODE_SHAPE: &str = r#"{"nodes": [{"id": "1", "text": "Meeting Goals", "parent": null}, {"id": "2", "text": "Scheduling", "parent": "1"}]}"#;

pub fn extraction_prompt(transcript_json: &str) -> String {
    format!(
        "Build a hierarchical mind map from the transcript below. Capture every \
         topic, subtopic, decision and action item as a node. Each node needs a \
         unique string id, a short text, and the id of its parent (null for roots).\n\
         Return ONLY a JSON object of this shape, with no prose and no markdown:\n\
         {shape}\n\n\
         {label}\n{transcript}\n",
        shape = NODE_SHAPE,
        label = TRANSCRIPT_LABEL,
        transcript = transcript_json,
    )
}

pub fn merge_prompt(existing_json: &str, new_json: &str) -> String {
    format!(
        "Merge NewNodes into ExistingMap. Keep every existing node with its id \
         and text unchanged unless it means the same thing as a new node. Collapse \
         new nodes that duplicate existing ones and re-parent their children onto \
         the surviving node.\n\
         Return ONLY a JSON object of this shape, with no prose and no markdown:\n\
         {shape}\n\n\
         {label} {existing}\n\
         NewNodes: {new}\n",
        shape = NODE_SHAPE,
        label = EXISTING_LABEL,
        existing = existing_json,
        new = new_json,
    )
}

pub fn planning_prompt(session_id: &str, chunk_count: usize, prior_nodes: usize) -> String {
    format!(
        "You coordinate a mind-map pipeline for session '{session}'. The buffer \
         holds {chunks} transcript chunks and the cached map has {nodes} nodes.\n\
         {label}\n\
         - recall_map: load the session's stored map\n\
         - extract_structure: derive new nodes from the buffered transcript\n\
         - merge_maps: merge new nodes into the current map (optional args: {{\"new_nodes\": [...]}})\n\
         - persist_map: save the current map for the session\n\
         Reply with ONLY a JSON array of calls in execution order, e.g. \
         [{{\"tool\": \"recall_map\", \"args\": {{}}}}, {{\"tool\": \"extract_structure\", \"args\": {{}}}}]\n",
        session = session_id,
        chunks = chunk_count,
        nodes = prior_nodes,
        label = TOOLS_LABEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_carry_their_labels_and_payloads() {
        let p = extraction_prompt(r#"[{"start":0.0,"end":1.0,"text":"hi"}]"#);
        assert!(p.contains(TRANSCRIPT_LABEL));
        assert!(p.contains(r#""text":"hi""#));

        let p = merge_prompt(r#"{"nodes":[]}"#, "[]");
        assert!(p.contains(EXISTING_LABEL));
        assert!(p.contains("NewNodes: []"));

        let p = planning_prompt("s1", 3, 0);
        assert!(p.contains(TOOLS_LABEL));
        assert!(p.contains("persist_map"));
    }
}

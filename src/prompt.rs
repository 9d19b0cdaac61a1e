//! Assembles the final generation prompt from conversation context, the
//! student's profile, retrieved passages and the institution template.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::retrieval::types::RetrievalResult;

pub fn personal_info_context(personal_info: Option<&BTreeMap<String, Value>>) -> String {
    let Some(info) = personal_info.filter(|map| !map.is_empty()) else {
        return "No personal information provided.".to_string();
    };

    let mut context = String::from("Personal Information:\n");
    for (key, value) in info {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        context.push_str(&format!("- {}: {}\n", key, rendered));
    }
    context
}

/// Renders retrieved passages as the knowledge block of the prompt. Every
/// passage contributes its content here, whether or not it produced a
/// reference link.
pub fn format_retrieved_content(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return "No relevant content found in knowledge base.".to_string();
    }

    let mut blocks = Vec::new();
    for (i, result) in results.iter().enumerate() {
        blocks.push(format!(
            "SOURCE {} [Score: {:.2}]:\n{}\n",
            i + 1,
            result.score,
            result.content
        ));
    }
    blocks.join("\n")
}

pub fn build_prompt(
    conversation_context: &str,
    personal_info: &str,
    retrieved_content: &str,
    institution_template: &str,
    query: &str,
) -> String {
    format!(
        "# Conversation History\n{}\n\n# Personal Information\n{}\n\n# Retrieved Knowledge\n{}\n\n# Institution-specific Template\n{}\n\nPlease answer: \"{}\"",
        conversation_context, personal_info, retrieved_content, institution_template, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::types::Location;
    use serde_json::json;

    #[test]
    fn personal_info_renders_key_value_lines() {
        let mut info = BTreeMap::new();
        info.insert("name".to_string(), json!("Asha"));
        info.insert("semester".to_string(), json!(3));

        let context = personal_info_context(Some(&info));
        assert!(context.starts_with("Personal Information:\n"));
        assert!(context.contains("- name: Asha\n"));
        assert!(context.contains("- semester: 3\n"));
    }

    #[test]
    fn missing_personal_info_uses_the_fixed_line() {
        assert_eq!(
            personal_info_context(None),
            "No personal information provided."
        );
        assert_eq!(
            personal_info_context(Some(&BTreeMap::new())),
            "No personal information provided."
        );
    }

    #[test]
    fn retrieved_content_includes_every_passage() {
        let results = vec![
            RetrievalResult {
                content: "First passage.".to_string(),
                score: 0.95,
                location: Location::Web {
                    url: "https://www.lpu.in/a".to_string(),
                },
                metadata: BTreeMap::new(),
                document_metadata: BTreeMap::new(),
            },
            RetrievalResult {
                content: "No URL but still useful.".to_string(),
                score: 0.7,
                location: Location::Unknown,
                metadata: BTreeMap::new(),
                document_metadata: BTreeMap::new(),
            },
        ];

        let block = format_retrieved_content(&results);
        assert!(block.contains("SOURCE 1 [Score: 0.95]"));
        assert!(block.contains("First passage."));
        assert!(block.contains("SOURCE 2 [Score: 0.70]"));
        assert!(block.contains("No URL but still useful."));
    }

    #[test]
    fn empty_results_render_the_fallback_line() {
        assert_eq!(
            format_retrieved_content(&[]),
            "No relevant content found in knowledge base."
        );
    }

    #[test]
    fn prompt_contains_all_sections_and_the_query() {
        let prompt = build_prompt("ctx", "info", "knowledge", "template", "what is the fee");
        assert!(prompt.contains("# Conversation History\nctx"));
        assert!(prompt.contains("# Personal Information\ninfo"));
        assert!(prompt.contains("# Retrieved Knowledge\nknowledge"));
        assert!(prompt.contains("# Institution-specific Template\ntemplate"));
        assert!(prompt.ends_with("Please answer: \"what is the fee\""));
    }
}

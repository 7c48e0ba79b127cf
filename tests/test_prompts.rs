//! Tests for the shipped search prompt and config files.

use std::fs;
use std::path::Path;

use catalog_search::config;
use catalog_search::search::PromptTemplate;

const TEMPLATE_PATH: &str = "config/prompts/catalog_search.txt";

#[test]
fn test_search_prompt_file_exists() {
    assert!(fs::metadata(TEMPLATE_PATH).is_ok(), "catalog_search.txt prompt file missing");
}

#[test]
fn test_search_prompt_template_vars() {
    let text = fs::read_to_string(TEMPLATE_PATH).unwrap();
    assert!(text.contains("{{user_query}}"), "template should contain {{user_query}}");
    assert!(text.contains("{{context}}"), "template should contain {{context}}");
}

#[test]
fn test_search_prompt_asks_for_json_list() {
    let text = fs::read_to_string(TEMPLATE_PATH).unwrap();
    assert!(text.contains("JSON array"));
    assert!(text.contains("\"id\""));
}

#[tokio::test]
async fn test_search_prompt_loads_and_renders() {
    let template = PromptTemplate::load(Path::new(TEMPLATE_PATH)).await.unwrap();
    let prompt = template.render("wireless mouse", "recordId: 42\n\nName: Wireless Mouse\n");
    assert!(prompt.contains("wireless mouse"));
    assert!(prompt.contains("recordId: 42"));
    assert!(!prompt.contains("{{"));
}

#[test]
fn test_default_config_points_at_template() {
    let config = config::load_from(Path::new("config/default.toml"), Some("/tmp/cs"), None).unwrap();
    assert_eq!(config.prompt_template, Path::new(TEMPLATE_PATH));
    assert_eq!(config.llm.provider, "static");
    assert_eq!(config.llm.static_reply, "[]");
    assert_eq!(config.embedding.provider, "hashing");
}

//! Prompt builder for catalog search.
//!
//! The instruction template is a plain-text file (by default
//! `config/prompts/catalog_search.txt`) carrying two placeholders:
//!
//! ```text
//! {{user_query}} : the user's natural-language query
//! {{context}}    : the rendered documents picked by the context assembler
//! ```
//!
//! Substitution is a single left-to-right pass, so placeholder-looking text
//! inside the query or the context is emitted as-is and never re-expanded.

use std::fs;
use std::path::Path;

use super::ServiceError;

pub const QUERY_VAR: &str = "user_query";
pub const CONTEXT_VAR: &str = "context";

/// A loaded instruction template known to carry both placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Validate template text. A template missing either placeholder would
    /// silently drop the query or the context, so it is rejected.
    pub fn parse(text: impl Into<String>) -> Result<Self, ServiceError> {
        let text = text.into();
        for var in [QUERY_VAR, CONTEXT_VAR] {
            if !text.contains(&placeholder(var)) {
                return Err(ServiceError::Configuration(format!(
                    "prompt template lacks the {{{{{var}}}}} placeholder"
                )));
            }
        }
        Ok(Self { text })
    }

    /// Read and validate the template at `path` on the blocking pool.
    pub async fn load(path: &Path) -> Result<Self, ServiceError> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || fs::read_to_string(&owned))
            .await
            .map_err(|e| ServiceError::Upstream(format!("prompt load task failed: {e}")))?
            .map_err(|e| {
                ServiceError::Configuration(format!(
                    "cannot read prompt template {}: {e}",
                    path.display()
                ))
            })?;
        Self::parse(text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Fully resolved prompt for one query.
    pub fn render(&self, user_query: &str, context: &str) -> String {
        substitute(&self.text, &[(QUERY_VAR, user_query), (CONTEXT_VAR, context)])
    }
}

fn placeholder(var: &str) -> String {
    format!("{{{{{var}}}}}")
}

/// Replace known `{{key}}` markers in one pass; unknown markers are kept.
///
/// A `{{` that does not open a known marker is emitted one brace at a time,
/// so a stray opener never hides a placeholder that follows it.
fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after
            .find("}}")
            .and_then(|end| vars.iter().find(|(k, _)| *k == &after[..end]).map(|(_, v)| (end, v)));
        match value {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ErrorKind;
    use std::io::Write;

    const TEMPLATE: &str = "Query: {{user_query}}\nContext:\n{{context}}\nAnswer:";

    #[test]
    fn render_substitutes_both_placeholders() {
        let t = PromptTemplate::parse(TEMPLATE).unwrap();
        assert_eq!(
            t.render("mouse", "recordId: 42\n\nName: Mouse\n"),
            "Query: mouse\nContext:\nrecordId: 42\n\nName: Mouse\n\nAnswer:"
        );
    }

    #[test]
    fn render_with_empty_context() {
        let t = PromptTemplate::parse(TEMPLATE).unwrap();
        assert_eq!(t.render("q", ""), "Query: q\nContext:\n\nAnswer:");
    }

    #[test]
    fn query_text_is_not_re_expanded() {
        let t = PromptTemplate::parse(TEMPLATE).unwrap();
        let out = t.render("show {{context}}", "CTX");
        assert!(out.starts_with("Query: show {{context}}\n"));
        assert_eq!(out.matches("CTX").count(), 1);
    }

    #[test]
    fn unknown_markers_are_kept() {
        assert_eq!(substitute("a {{x}} b {{y", &[("y", "Y")]), "a {{x}} b {{y");
    }

    #[test]
    fn stray_opener_does_not_swallow_placeholders() {
        let t = PromptTemplate::parse("Example: {{ not a var\nQuery: {{user_query}}\nCtx: {{context}}")
            .unwrap();
        assert_eq!(
            t.render("mouse", "CTX"),
            "Example: {{ not a var\nQuery: mouse\nCtx: CTX"
        );
        assert_eq!(substitute("{{{user_query}}}", &[("user_query", "q")]), "{q}");
    }

    #[test]
    fn missing_placeholder_is_configuration_error() {
        let err = PromptTemplate::parse("Only {{user_query}}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("{{context}}"));
    }

    #[tokio::test]
    async fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEMPLATE.as_bytes()).unwrap();
        let t = PromptTemplate::load(file.path()).await.unwrap();
        assert_eq!(t.text(), TEMPLATE);
    }

    #[tokio::test]
    async fn load_missing_file_is_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = PromptTemplate::load(&dir.path().join("absent.txt")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

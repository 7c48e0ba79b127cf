//! Result parser: raw model text → validated [`SearchCandidate`] list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ServiceError;
use crate::catalog::RecordId;

/// One candidate picked by the model. Only `id` is trusted, and only after
/// reconciliation against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCandidate {
    pub id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Candidate as emitted by the model, before id validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawCandidate {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub reason: Option<String>,
}

impl RawCandidate {
    pub fn with_id(id: Value) -> Self {
        Self { id: Some(id), ..Self::default() }
    }

    /// Field-wise extraction: a mistyped advisory field never costs the id.
    /// Non-object elements carry no id and are filtered out later.
    fn from_value(item: Value) -> Self {
        let Value::Object(mut fields) = item else {
            return Self::default();
        };
        let text = |v: Option<Value>| match v {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        Self {
            id: fields.remove("id"),
            name: text(fields.remove("name")),
            reason: text(fields.remove("reason")),
        }
    }
}

/// Remove a surrounding Markdown code fence (` ``` ` or ` ```json `).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    match inner.find('\n') {
        Some(nl) => inner[nl + 1..].trim(),
        None => inner.trim(),
    }
}

/// Parse model output. Anything other than a JSON array is a parse failure;
/// an empty array is a valid, empty answer.
pub fn parse_candidates(raw: &str) -> Result<Vec<SearchCandidate>, ServiceError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ServiceError::Parse(format!("model output is not JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(ServiceError::Parse("model output is not a JSON list".into()));
    };

    let raw_candidates = items.into_iter().map(RawCandidate::from_value).collect();
    Ok(validate_candidates(raw_candidates))
}

/// Keep candidates whose id is a positive integer, in emission order.
///
/// Accepts JSON integers and strings holding a decimal integer. Fractional
/// numbers, other strings, `null` and ids `<= 0` are discarded.
pub fn validate_candidates(raw: Vec<RawCandidate>) -> Vec<SearchCandidate> {
    raw.into_iter()
        .filter_map(|c| {
            let id = c.id.as_ref().and_then(positive_id)?;
            Some(SearchCandidate { id, name: c.name, reason: c.reason })
        })
        .collect()
}

fn positive_id(value: &Value) -> Option<RecordId> {
    let id = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

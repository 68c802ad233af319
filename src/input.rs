use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LayoutError, Result};

/// One scored document as supplied by the caller.
///
/// `tokens` keeps input order; a token repeated inside one document is
/// collapsed later with the last score winning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub tokens: Vec<(String, f32)>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tokens: impl IntoIterator<Item = (impl Into<String>, f32)>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tokens: tokens
                .into_iter()
                .map(|(token, score)| (token.into(), score))
                .collect(),
        }
    }
}

/// Parses a JSON array of documents.
///
/// Entries look like `{ "id": .., "name": .., "tokens": [[token, score], ..] }`;
/// token entries may also be `{ "token": .., "score": .. }` objects. The first
/// malformed document aborts parsing with its index.
pub fn parse_documents(raw: &str) -> Result<Vec<Document>> {
    let parsed: Value = serde_json::from_str(raw)?;
    let entries = parsed.as_array().ok_or(LayoutError::NotAnArray)?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_document(index, entry))
        .collect()
}

fn parse_document(index: usize, entry: &Value) -> Result<Document> {
    let object = entry
        .as_object()
        .ok_or(LayoutError::NotAnObject { index })?;

    let id = scalar_string(object, "id").ok_or(LayoutError::MissingField { index, field: "id" })?;
    let name = scalar_string(object, "name").unwrap_or_else(|| id.clone());

    let raw_tokens = object
        .get("tokens")
        .and_then(Value::as_array)
        .ok_or(LayoutError::MissingTokens { index })?;

    let mut tokens = Vec::with_capacity(raw_tokens.len());
    for (entry_index, raw_token) in raw_tokens.iter().enumerate() {
        let (token, score) = match raw_token {
            Value::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
            Value::Object(fields) => match (fields.get("token"), fields.get("score")) {
                (Some(token), Some(score)) => (token, score),
                _ => {
                    return Err(LayoutError::MalformedToken {
                        index,
                        entry: entry_index,
                    });
                }
            },
            _ => {
                return Err(LayoutError::MalformedToken {
                    index,
                    entry: entry_index,
                });
            }
        };

        let token = token.as_str().ok_or(LayoutError::MalformedToken {
            index,
            entry: entry_index,
        })?;
        let score = score
            .as_f64()
            .map(|value| value as f32)
            .filter(|value| value.is_finite())
            .ok_or_else(|| LayoutError::InvalidScore {
                index,
                token: token.to_owned(),
            })?;

        tokens.push((token.to_owned(), score));
    }

    Ok(Document { id, name, tokens })
}

fn scalar_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Rejects scores that are NaN or infinite.
pub fn validate_documents(documents: &[Document]) -> Result<()> {
    for (index, document) in documents.iter().enumerate() {
        if let Some((token, _)) = document
            .tokens
            .iter()
            .find(|(_, score)| !score.is_finite())
        {
            return Err(LayoutError::InvalidScore {
                index,
                token: token.clone(),
            });
        }
    }
    Ok(())
}

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::ai::OllamaClient;

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(rename = "type", default = "default_entity_type")]
    pub entity_type: String,
}

fn default_entity_type() -> String {
    "Thing".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionOutcome {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, chunk_text: &str) -> Result<ExtractionOutcome>;
}

/// Extracts entities and relations from a chunk with a local language
/// model. Model output is rarely clean JSON, so the response goes through
/// a recovery pass before parsing; a chunk whose output still does not
/// parse contributes nothing rather than failing the batch.
pub struct LlmEntityExtractor {
    client: Arc<OllamaClient>,
    model: String,
}

impl LlmEntityExtractor {
    pub fn new(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }

    fn prompt(chunk_text: &str) -> String {
        format!(
            "You are an information extraction system.\n\
             Extract all entities and relations from the chunk below.\n\
             Return JSON only, exactly in this format:\n\
             {{\"entities\": [{{\"name\": \"Alice\", \"type\": \"Person\"}}],\n\
              \"relations\": [{{\"source\": \"Alice\", \"target\": \"Acme Corp\", \"relationType\": \"works_for\"}}]}}\n\
             Entity types: Person, Organization, Location, Event, Year, Quantity, Thing.\n\
             Relations must reference entities by their exact name.\n\
             \nChunk:\n<<<\n{chunk_text}\n>>>"
        )
    }
}

#[async_trait]
impl EntityExtractor for LlmEntityExtractor {
    async fn extract(&self, chunk_text: &str) -> Result<ExtractionOutcome> {
        let raw = self
            .client
            .generate(&self.model, &Self::prompt(chunk_text))
            .await?;

        let cleaned = recover_json(&raw);
        let outcome = match serde_json::from_str::<ExtractionOutcome>(&cleaned) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "model output did not parse as extraction JSON");
                ExtractionOutcome::default()
            }
        };

        Ok(sanitize(outcome))
    }
}

/// Flatten entity names to one line and drop blank or dangling records.
fn sanitize(outcome: ExtractionOutcome) -> ExtractionOutcome {
    let entities: Vec<ExtractedEntity> = outcome
        .entities
        .into_iter()
        .filter_map(|entity| {
            let name = flatten_name(&entity.name);
            if name.is_empty() {
                return None;
            }
            Some(ExtractedEntity {
                name,
                entity_type: entity.entity_type,
            })
        })
        .collect();

    let relations = outcome
        .relations
        .into_iter()
        .filter_map(|relation| {
            let source = flatten_name(&relation.source);
            let target = flatten_name(&relation.target);
            if source.is_empty() || target.is_empty() || relation.relation_type.trim().is_empty() {
                return None;
            }
            Some(ExtractedRelation {
                source,
                target,
                relation_type: relation.relation_type.trim().to_string(),
            })
        })
        .collect();

    ExtractionOutcome { entities, relations }
}

fn flatten_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Best-effort recovery of a JSON object from messy model output: strips
/// think-tags and code fences, trims to the first complete top-level
/// object, and removes trailing commas. Returns `{}` when no object can
/// be found.
pub(crate) fn recover_json(raw: &str) -> String {
    let stripped = strip_noise(raw);
    let object = trim_to_object(&stripped);
    strip_trailing_commas(&object)
}

fn strip_noise(raw: &str) -> String {
    let without_think = remove_spans(raw, "<think>", "</think>");
    without_think
        .replace("```json", "")
        .replace("```", "")
        .replace("<think>", "")
        .replace("</think>", "")
}

/// Remove every `open`..`close` span, tolerating an unclosed trailing one.
fn remove_spans(text: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        out.push_str(&rest[..start]);
        match rest[start..].find(close) {
            Some(relative_end) => {
                rest = &rest[start + relative_end + close.len()..];
            }
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// The first complete top-level JSON object in `text`, honoring string
/// literals and escapes. Falls back to `{}`.
fn trim_to_object(text: &str) -> String {
    let Some(start) = text.find('{') else {
        return "{}".to_string();
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return text[start..=start + offset].to_string();
                }
            }
            _ => {}
        }
    }

    // never closed; take everything from { to the last }
    match text.rfind('}') {
        Some(end) if end > start => text[start..=end].to_string(),
        _ => "{}".to_string(),
    }
}

/// Drop commas that directly precede a closing brace or bracket, outside
/// string literals.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '}' | ']' => {
                while out.ends_with(|tail: char| tail.is_whitespace() || tail == ',') {
                    out.pop();
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

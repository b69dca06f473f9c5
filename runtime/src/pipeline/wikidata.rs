use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use tokio::time::Duration;
use tracing::debug;

const SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// Resolution of a surface form against Wikidata.
#[derive(Debug, Clone)]
pub struct EntityMatch {
    pub id: String,
    pub label: String,
    pub entity_type: String,
}

/// Ingestion-time enrichment: resolves entity names to knowledge-base
/// ids. Ranking never depends on this, so every failure path falls back
/// to a synthetic `LOCAL:` id instead of propagating.
pub struct WikidataMatcher {
    http: Client,
}

impl Default for WikidataMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WikidataMatcher {
    pub fn new() -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("client");
        Self { http }
    }

    pub async fn match_term(&self, term: &str) -> EntityMatch {
        match self.lookup(term).await {
            Ok(found) => found,
            Err(err) => {
                debug!(error = %err, term, "wikidata lookup failed");
                local_fallback(term)
            }
        }
    }

    async fn lookup(&self, term: &str) -> Result<EntityMatch> {
        let escaped = term.replace('\\', "\\\\").replace('"', "\\\"");
        let sparql = format!(
            "SELECT ?item ?itemLabel ?typeLabel WHERE {{ \
               ?item rdfs:label \"{escaped}\"@en. \
               OPTIONAL {{ ?item wdt:P31 ?type. ?type rdfs:label ?typeLabel FILTER(LANG(?typeLabel)=\"en\") }} \
               SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }} \
             }} LIMIT 1"
        );

        let response = self
            .http
            .get(SPARQL_ENDPOINT)
            .query(&[("query", sparql.as_str())])
            .header("Accept", "application/sparql-results+json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("sparql endpoint returned {}", response.status()));
        }

        let payload: Value = response.json().await?;
        let bindings = payload
            .pointer("/results/bindings")
            .and_then(Value::as_array)
            .filter(|rows| !rows.is_empty())
            .ok_or_else(|| anyhow!("no bindings for term"))?;

        let first = &bindings[0];
        let id = first
            .pointer("/item/value")
            .and_then(Value::as_str)
            .map(extract_qid)
            .ok_or_else(|| anyhow!("item missing from binding"))?;
        let label = first
            .pointer("/itemLabel/value")
            .and_then(Value::as_str)
            .unwrap_or(term)
            .to_string();
        let entity_type = first
            .pointer("/typeLabel/value")
            .and_then(Value::as_str)
            .unwrap_or("Thing")
            .to_string();

        Ok(EntityMatch {
            id,
            label,
            entity_type,
        })
    }
}

fn local_fallback(term: &str) -> EntityMatch {
    EntityMatch {
        id: format!("LOCAL:{term}"),
        label: term.to_string(),
        entity_type: "Thing".to_string(),
    }
}

fn extract_qid(uri: &str) -> String {
    uri.rsplit('/').next().unwrap_or(uri).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qid_is_the_last_uri_segment() {
        assert_eq!(extract_qid("http://www.wikidata.org/entity/Q90"), "Q90");
        assert_eq!(extract_qid("Q90"), "Q90");
    }

    #[test]
    fn fallback_keeps_the_term_as_a_local_id() {
        let fallback = local_fallback("Paris");
        assert_eq!(fallback.id, "LOCAL:Paris");
        assert_eq!(fallback.label, "Paris");
        assert_eq!(fallback.entity_type, "Thing");
    }
}

//! `EmbeddingClient` — the excluded embedding provider, behind a narrow
//! trait (§4.5). The provider and vector dimensionality are configuration
//! constants; this adapter only knows the HTTP shape.

use async_trait::async_trait;
use kg_core::dto::EmbeddingKind;
use kg_core::error::KgError;
use kg_core::ports::{EmbeddingClient, Result};
use serde::{Deserialize, Serialize};

pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
    kind: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, texts: &[String], kind: EmbeddingKind) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbedRequest {
            input: texts,
            kind: match kind {
                EmbeddingKind::Query => "query",
                EmbeddingKind::Document => "document",
            },
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| KgError::ServiceUnavailable(format!("embedding provider unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(KgError::Internal(anyhow::anyhow!(
                "embedding provider returned {}",
                resp.status()
            )));
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| KgError::Internal(anyhow::anyhow!("malformed embedding response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(KgError::Internal(anyhow::anyhow!(
                "embedding provider returned {} vectors for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_stores_endpoint() {
        let c = HttpEmbeddingClient::new("https://embed.example/v1", "key");
        assert_eq!(c.endpoint, "https://embed.example/v1");
    }
}

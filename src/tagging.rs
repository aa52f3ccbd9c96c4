use crate::domain::TagSuggester;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing;

#[derive(Deserialize, Debug)]
struct TagsResponse {
    result: TagsResult,
}

#[derive(Deserialize, Debug)]
struct TagsResult {
    tags: Vec<TagEntry>,
}

#[derive(Deserialize, Debug)]
struct TagEntry {
    tag: LocalizedLabel,
}

#[derive(Deserialize, Debug)]
struct LocalizedLabel {
    en: String,
}

/// Imagga `/v2/tags` client.
#[derive(Debug, Clone)]
pub struct ImaggaTagger {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
}

impl ImaggaTagger {
    pub fn new(
        endpoint: String,
        api_key: String,
        api_secret: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint, api_key, api_secret })
    }
}

#[async_trait]
impl TagSuggester for ImaggaTagger {
    async fn suggest_tags(&self, image_url: &str) -> Vec<String> {
        tracing::debug!(%image_url, endpoint = %self.endpoint, "Tagging: requesting suggestions");

        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("image_url", image_url)])
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, timeout = e.is_timeout(), "Tagging: request failed");
                return Vec::new();
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Tagging: service returned an error");
            return Vec::new();
        }

        match response.json::<TagsResponse>().await {
            Ok(parsed) => {
                let labels: Vec<String> = parsed.result.tags.into_iter().map(|entry| entry.tag.en).collect();
                tracing::info!(count = labels.len(), tags = ?labels, "Tagging: received suggestions");
                labels
            }
            Err(e) => {
                tracing::error!(error = %e, "Tagging: malformed response body");
                Vec::new()
            }
        }
    }
}

//! OpenAI-compatible language-model client. Completion sampling is
//! pinned to temperature 0 so classification and SQL synthesis stay
//! reproducible across identical utterances.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use urbanbot_core::config::LlmConfig;
use urbanbot_core::LlmClient;

pub struct LlmApi {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    embed_model: String,
}

impl LlmApi {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            embed_model: config.embed_model.clone(),
        })
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{path}", self.base_url));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        builder
    }
}

fn extract_completion(response: &Value) -> Result<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("completion response missing choices[0].message.content"))
}

fn extract_embedding(response: &Value) -> Result<Vec<f32>> {
    let values = response
        .pointer("/data/0/embedding")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("embedding response missing data[0].embedding"))?;

    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|float| float as f32)
                .ok_or_else(|| anyhow!("embedding contains a non-numeric component"))
        })
        .collect()
}

#[async_trait]
impl LlmClient for LlmApi {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
        });

        let response = self
            .request("/chat/completions")
            .json(&payload)
            .send()
            .await
            .context("completion request failed")?
            .error_for_status()
            .context("completion endpoint returned an error status")?
            .json::<Value>()
            .await
            .context("completion response was not valid JSON")?;

        extract_completion(&response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let payload = json!({
            "model": self.embed_model,
            "input": text,
        });

        let response = self
            .request("/embeddings")
            .json(&payload)
            .send()
            .await
            .context("embedding request failed")?
            .error_for_status()
            .context("embedding endpoint returned an error status")?
            .json::<Value>()
            .await
            .context("embedding response was not valid JSON")?;

        extract_embedding(&response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_completion, extract_embedding};

    #[test]
    fn completion_content_is_extracted_from_the_first_choice() {
        let response = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "SELECT 1;"}}
            ]
        });
        assert_eq!(extract_completion(&response).expect("content"), "SELECT 1;");
    }

    #[test]
    fn missing_choices_is_an_error_not_a_panic() {
        let response = json!({"choices": []});
        assert!(extract_completion(&response).is_err());
    }

    #[test]
    fn embedding_components_are_parsed_as_f32() {
        let response = json!({"data": [{"embedding": [0.25, -1.5, 3.0]}]});
        assert_eq!(extract_embedding(&response).expect("vector"), vec![0.25, -1.5, 3.0]);
    }

    #[test]
    fn non_numeric_embedding_component_is_rejected() {
        let response = json!({"data": [{"embedding": [0.25, "oops"]}]});
        assert!(extract_embedding(&response).is_err());
    }
}

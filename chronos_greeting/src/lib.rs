use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GreetingError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Invalid greeting endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Greeting endpoint answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("{0}")]
    Network(#[from] reqwest::Error),
}

#[async_trait]
pub trait GreetingClient: Send + Sync {
    async fn fetch(&self, prompt: &str) -> Result<String, GreetingError>;
}

/// Text generation over `GET {base_url}/prompt/{prompt}`. The response body is the greeting.
pub struct PollinationsGreetingClient {
    client: reqwest::Client,
    base_url: Url,
}

impl PollinationsGreetingClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, GreetingError> {
        let base_url =
            Url::parse(base_url).map_err(|e| GreetingError::InvalidEndpoint(e.to_string()))?;

        if base_url.cannot_be_a_base() {
            return Err(GreetingError::InvalidEndpoint(base_url.to_string()));
        }

        Ok(Self { client, base_url })
    }

    pub fn prompt_url(&self, prompt: &str) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("Checked on construction that the url can be a base.")
            .pop_if_empty()
            .push("prompt")
            .push(prompt);
        url
    }
}

#[async_trait]
impl GreetingClient for PollinationsGreetingClient {
    async fn fetch(&self, prompt: &str) -> Result<String, GreetingError> {
        if prompt.trim().is_empty() {
            return Err(GreetingError::EmptyPrompt);
        }

        let url = self.prompt_url(prompt);
        log::info!("Requesting greeting from {}", url.host_str().unwrap_or_default());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("Greeting request failed with status {status}");
            return Err(GreetingError::Status(status));
        }

        Ok(response.text().await?)
    }
}

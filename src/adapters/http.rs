use crate::domain::ports::ConsoleProbe;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// HTTP GET against the console. Only reachability matters; the status
/// code is not inspected.
#[derive(Debug, Clone)]
pub struct HttpConsoleProbe {
    client: Client,
}

impl HttpConsoleProbe {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ConsoleProbe for HttpConsoleProbe {
    async fn responds(&self, url: &Url) -> bool {
        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                tracing::debug!("Console answered {} with {}", url, response.status());
                true
            }
            Err(e) => {
                tracing::debug!("Console not reachable at {}: {}", url, e);
                false
            }
        }
    }
}

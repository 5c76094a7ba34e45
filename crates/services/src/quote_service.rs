use std::env;

use reqwest::Client;
use serde::Deserialize;

use crate::error::QuoteError;

#[derive(Clone, Debug)]
pub struct QuoteConfig {
    pub api_url: String,
}

impl QuoteConfig {
    /// Reads the quote API URL from the environment.
    ///
    /// Unset falls back to the public zenquotes endpoint; setting
    /// `LMS_QUOTE_API_URL` to an empty string disables the service.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        match env::var("LMS_QUOTE_API_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => Some(Self { api_url: url }),
            Err(_) => Some(Self {
                api_url: "https://zenquotes.io/api/random".into(),
            }),
        }
    }
}

/// A motivational quote shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Fetches a random motivational quote from an external API.
#[derive(Clone)]
pub struct QuoteService {
    client: Client,
    config: Option<QuoteConfig>,
}

impl QuoteService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(QuoteConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<QuoteConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Fetch one random quote.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError` when the service is disabled, the request fails,
    /// or the response carries no quote.
    pub async fn random_quote(&self) -> Result<Quote, QuoteError> {
        let config = self.config.as_ref().ok_or(QuoteError::Disabled)?;

        let response = self.client.get(&config.api_url).send().await?;
        if !response.status().is_success() {
            return Err(QuoteError::HttpStatus(response.status()));
        }

        let body: Vec<QuoteResponse> = response.json().await?;
        let quote = body.into_iter().next().ok_or(QuoteError::EmptyResponse)?;

        Ok(Quote {
            text: quote.q.trim().to_string(),
            author: quote.a.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    q: String,
    a: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_service_reports_disabled() {
        let service = QuoteService::new(None);
        assert!(!service.enabled());
        let err = service.random_quote().await.unwrap_err();
        assert!(matches!(err, QuoteError::Disabled));
    }

    #[test]
    fn configured_service_is_enabled() {
        let service = QuoteService::new(Some(QuoteConfig {
            api_url: "https://quotes.example.com/random".into(),
        }));
        assert!(service.enabled());
    }
}

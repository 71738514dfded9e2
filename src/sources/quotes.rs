//! Quote service client.

use crate::config::QuotesConfig;
use crate::http::{build_client, get_json, FetchError};
use crate::models::{Quote, QuoteDeck};
use anyhow::Result;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    quotes: Vec<Quote>,
}

pub struct QuoteClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    pub fn new(config: &QuotesConfig, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            http_client: build_client(timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the quote list once and wrap it in a deck.
    pub async fn deck(&self) -> Result<QuoteDeck, FetchError> {
        let url = format!("{}/quotes", self.base_url);
        let response: QuotesResponse = get_json(self.http_client.get(&url)).await?;
        info!("Loaded {} quotes", response.quotes.len());
        Ok(QuoteDeck::new(response.quotes))
    }
}

/// Walk `count` quotes from `index`, forwards or backwards.
pub fn browse(deck: &mut QuoteDeck, index: usize, count: usize, reverse: bool) -> Vec<Quote> {
    let mut picked = Vec::with_capacity(count);
    let Some(first) = deck.seek(index) else {
        return picked;
    };
    picked.push(first.clone());

    while picked.len() < count.min(deck.len()) {
        let step = if reverse { deck.previous() } else { deck.next() };
        match step {
            Some(quote) => picked.push(quote.clone()),
            None => break,
        }
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const QUOTES_FIXTURE: &str = include_str!("../../fixtures/dummyjson_quotes.json");

    async fn fixture_deck() -> QuoteDeck {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/quotes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(QUOTES_FIXTURE)
            .create_async()
            .await;

        let config = QuotesConfig {
            base_url: format!("{}/", server.url()),
        };
        QuoteClient::new(&config, 5).unwrap().deck().await.unwrap()
    }

    #[tokio::test]
    async fn test_deck_loads_quotes() {
        let deck = fixture_deck().await;

        assert_eq!(deck.len(), 3);
        assert_eq!(deck.current().map(|q| q.author.as_str()), Some("Rumi"));
    }

    #[tokio::test]
    async fn test_browse_wraps_forward_and_backward() {
        let mut deck = fixture_deck().await;

        let forward: Vec<u64> = browse(&mut deck, 2, 3, false).iter().map(|q| q.id).collect();
        assert_eq!(forward, vec![3, 1, 2]);

        let backward: Vec<u64> = browse(&mut deck, 0, 2, true).iter().map(|q| q.id).collect();
        assert_eq!(backward, vec![1, 3]);
    }

    #[test]
    fn test_browse_caps_at_deck_size() {
        let mut deck = QuoteDeck::new(vec![Quote {
            id: 9,
            quote: "Only one".to_string(),
            author: "Solo".to_string(),
        }]);

        assert_eq!(browse(&mut deck, 4, 5, false).len(), 1);
        assert!(browse(&mut QuoteDeck::default(), 0, 3, false).is_empty());
    }

    #[tokio::test]
    async fn test_deck_propagates_http_errors() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/quotes")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let config = QuotesConfig {
            base_url: server.url(),
        };
        let err = QuoteClient::new(&config, 5).unwrap().deck().await.unwrap_err();

        assert_eq!(err.status(), Some(429));
    }
}

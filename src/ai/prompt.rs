// src/ai/prompt.rs
use anyhow::{anyhow, Context, Result};
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Sends a free-text prompt to the prediction endpoint. Not part of the scan flow.
pub struct PromptClient {
    endpoint: String,
    api_token: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    instances: Vec<PromptInstance<'a>>,
}

#[derive(Serialize)]
struct PromptInstance<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PromptResponse {
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    content: String,
}

impl PromptClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            endpoint: config.prompt_endpoint.clone(),
            api_token: config.api_token.clone(),
            client,
        })
    }

    pub fn send(&self, prompt: &str) -> Result<String> {
        info!("Sending prompt to {}", self.endpoint);

        let body = PromptRequest {
            instances: vec![PromptInstance { content: prompt }],
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!("Prompt API error {}: {}", status, error_text));
        }

        let parsed: PromptResponse = response.json().context("Unexpected prompt response")?;
        parsed
            .predictions
            .into_iter()
            .next()
            .map(|p| p.content)
            .ok_or_else(|| anyhow!("Prompt response had no predictions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;
    use tiny_http::{Response, Server};

    fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok(mut req) = server.recv() {
                let mut sent = String::new();
                req.as_reader().read_to_string(&mut sent).unwrap();
                let _ = req.respond(Response::from_string(body).with_status_code(status));
                let _ = tx.send(sent);
            }
        });
        (format!("http://127.0.0.1:{}/predict", port), rx)
    }

    fn client(endpoint: String) -> PromptClient {
        PromptClient::new(&Config {
            prompt_endpoint: endpoint,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn first_prediction_is_returned() {
        let (endpoint, sent) =
            serve_once(200, r#"{"predictions":[{"content":"A ripe banana."},{"content":"x"}]}"#);

        let reply = client(endpoint).send("What is this?").unwrap();

        assert_eq!(reply, "A ripe banana.");
        let body: serde_json::Value = serde_json::from_str(&sent.recv().unwrap()).unwrap();
        assert_eq!(body["instances"][0]["content"], "What is this?");
    }

    #[test]
    fn empty_predictions_is_an_error() {
        let (endpoint, _) = serve_once(200, r#"{"predictions":[]}"#);
        assert!(client(endpoint).send("hello").is_err());
    }

    #[test]
    fn failing_status_is_an_error() {
        let (endpoint, _) = serve_once(401, "unauthorized");
        let err = client(endpoint).send("hello").unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}

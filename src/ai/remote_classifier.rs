// src/ai/remote_classifier.rs
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::connector::{ClassificationResult, ImageClassifier};
use crate::capture::frame::Frame;
use crate::config::Config;

//Classifier backed by a remote HTTP endpoint
pub struct RemoteClassifier {
    endpoint: String,
    api_token: Option<String>,
    jpeg_quality: u8,
    upright_frames: bool,
    client: Client,
}

#[derive(Serialize)]
struct ClassifyRequest {
    image: String,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(rename = "type")]
    label: String,
    points: i64,
}

/// What came back from one round trip, before it is turned into a result.
enum Reply {
    Classified(ClassifyResponse),
    Status(StatusCode),
    /// 200 with a body that is not `{"type": .., "points": ..}`.
    Malformed(String),
}

impl RemoteClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing remote classifier at {}", config.endpoint);

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            jpeg_quality: config.jpeg_quality,
            upright_frames: config.upright_frames,
            client,
        })
    }

    fn request(&self, frame: Frame) -> Result<Reply> {
        let frame = if self.upright_frames { frame.upright() } else { frame };
        debug!(
            "Encoding {}x{} frame (rotation {}) at quality {}",
            frame.width(),
            frame.height(),
            frame.rotation(),
            self.jpeg_quality
        );

        //Convert frame to base64 JPEG, the frame is released here
        let image = frame.to_jpeg_base64(self.jpeg_quality)?;
        drop(frame);

        let mut request = self.client.post(&self.endpoint).json(&ClassifyRequest { image });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(Reply::Status(status));
        }

        let body = response.text().context("Failed to read response body")?;
        match serde_json::from_str::<ClassifyResponse>(&body) {
            Ok(parsed) => Ok(Reply::Classified(parsed)),
            Err(e) => Ok(Reply::Malformed(format!("{} in body: {}", e, body))),
        }
    }
}

impl ImageClassifier for RemoteClassifier {
    fn classify(&self, frame: Frame) -> ClassificationResult {
        info!("Sending frame to {}", self.endpoint);

        match self.request(frame) {
            Ok(Reply::Classified(response)) => {
                info!("Classified as '{}' ({} points)", response.label, response.points);
                ClassificationResult::new(response.label, response.points)
            }
            Ok(Reply::Status(status)) => {
                warn!("Classifier responded with status: {}", status);
                ClassificationResult::http_error(status.as_u16())
            }
            Ok(Reply::Malformed(reason)) => {
                warn!("Classifier reply could not be parsed: {}", reason);
                ClassificationResult::error()
            }
            Err(e) => {
                error!("Classification failed: {:#}", e);
                ClassificationResult::error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::test_frame;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use tiny_http::{Header, Response, Server};

    struct Captured {
        body: String,
        authorization: Option<String>,
        content_type: Option<String>,
    }

    /// Serve one request with `status`/`body`, handing back what the client sent.
    fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            if let Ok(mut req) = server.recv() {
                let mut sent = String::new();
                req.as_reader().read_to_string(&mut sent).unwrap();
                let header = |name: &str| {
                    req.headers()
                        .iter()
                        .find(|h| h.field.to_string().eq_ignore_ascii_case(name))
                        .map(|h| h.value.to_string())
                };
                let captured = Captured {
                    body: sent,
                    authorization: header("Authorization"),
                    content_type: header("Content-Type"),
                };
                let json = Header::from_bytes("Content-Type", "application/json").unwrap();
                let _ = req.respond(Response::from_string(body).with_status_code(status).with_header(json));
                let _ = tx.send(captured);
            }
        });

        (format!("http://127.0.0.1:{}/classify", port), rx)
    }

    fn classifier(endpoint: String) -> RemoteClassifier {
        RemoteClassifier::new(&Config {
            endpoint,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn success_reply_becomes_result() {
        let (endpoint, _) = serve_once(200, r#"{"type":"Banana","points":10}"#);
        let result = classifier(endpoint).classify(test_frame(16, 16));
        assert_eq!(result, ClassificationResult::new("Banana", 10));
    }

    #[test]
    fn zero_timeout_from_config_file_waits_for_reply() {
        let (endpoint, _) = serve_once(200, r#"{"type":"Banana","points":10}"#);
        let mut config: Config = serde_json::from_str(r#"{"timeout_secs": 0}"#).unwrap();
        config.endpoint = endpoint;

        let result = RemoteClassifier::new(&config).unwrap().classify(test_frame(8, 8));
        assert_eq!(result, ClassificationResult::new("Banana", 10));
    }

    #[test]
    fn request_body_carries_base64_jpeg() {
        let (endpoint, captured) = serve_once(200, r#"{"type":"Apple","points":3}"#);
        let frame = test_frame(16, 16);
        let expected = frame.to_jpeg_base64(100).unwrap();

        classifier(endpoint).classify(frame);

        let captured = captured.recv().unwrap();
        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body["image"].as_str(), Some(expected.as_str()));
        assert_eq!(captured.content_type.as_deref(), Some("application/json"));
        assert_eq!(captured.authorization, None);
    }

    #[test]
    fn token_is_sent_as_bearer() {
        let (endpoint, captured) = serve_once(200, r#"{"type":"Apple","points":3}"#);
        let classifier = RemoteClassifier::new(&Config {
            endpoint,
            api_token: Some("abc123".to_string()),
            ..Config::default()
        })
        .unwrap();

        classifier.classify(test_frame(8, 8));

        let captured = captured.recv().unwrap();
        assert_eq!(captured.authorization.as_deref(), Some("Bearer abc123"));
    }

    #[test]
    fn not_found_is_labelled_with_status() {
        let (endpoint, _) = serve_once(404, "missing");
        let result = classifier(endpoint).classify(test_frame(8, 8));
        assert_eq!(result, ClassificationResult::http_error(404));
        assert_eq!(result.label, "Error: 404");
    }

    #[test]
    fn other_success_codes_are_still_errors() {
        let (endpoint, _) = serve_once(201, r#"{"type":"Banana","points":10}"#);
        let result = classifier(endpoint).classify(test_frame(8, 8));
        assert_eq!(result, ClassificationResult::http_error(201));
    }

    #[test]
    fn missing_points_is_a_generic_error() {
        let (endpoint, _) = serve_once(200, r#"{"type":"Banana"}"#);
        let result = classifier(endpoint).classify(test_frame(8, 8));
        assert_eq!(result, ClassificationResult::error());
    }

    #[test]
    fn garbage_body_is_a_generic_error() {
        let (endpoint, _) = serve_once(200, "<html>oops</html>");
        let result = classifier(endpoint).classify(test_frame(8, 8));
        assert_eq!(result, ClassificationResult::error());
    }

    #[test]
    fn unreachable_endpoint_is_a_generic_error() {
        // grab a free port, then close it so nothing is listening
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let result = classifier(format!("http://127.0.0.1:{}/classify", port)).classify(test_frame(8, 8));
        assert_eq!(result, ClassificationResult::error());
    }
}

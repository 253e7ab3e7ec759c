//! 推論エンドポイントのHTTPクライアント（reqwest）

use std::time::Duration;

use emotion_common::{parse_predict_response, Error, ImageFile, PredictResponse, PredictionClient};
use reqwest::multipart::{Form, Part};

use crate::config::Config;
use crate::error::Result;

pub struct HttpClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.resolve_endpoint(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PredictionClient for HttpClient {
    async fn predict(&self, image: &ImageFile) -> emotion_common::Result<PredictResponse> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| Error::Network(e.to_string()))?;
        let form = Form::new().part("file", part);

        log::debug!("POST {} ({}, {} bytes)", self.endpoint, image.name, image.bytes.len());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(connection_message(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        log::debug!("Response status {}: {}", status, body);
        parse_predict_response(status, &body)
    }
}

fn connection_message(error: &reqwest::Error) -> String {
    if error.is_connect() {
        format!("Could not connect to the prediction server ({})", error)
    } else if error.is_timeout() {
        format!("Request timed out ({})", error)
    } else {
        error.to_string()
    }
}

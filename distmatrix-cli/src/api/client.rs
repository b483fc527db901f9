//! HTTP implementation of [`MatrixBackend`]

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use super::endpoints::Endpoints;
use super::models::{ConvertTimeData, ConvertTimeRequest, Envelope, MatrixResult, UploadForm};
use super::{MatrixBackend, classify_status};
use crate::config::ApiConfig;
use crate::error::AppError;

/// reqwest-backed client for the distance matrix backend
#[derive(Debug, Clone)]
pub struct MatrixClient {
    http: Client,
    endpoints: Endpoints,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl MatrixClient {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(concat!("distmatrix-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        let endpoints = Endpoints::new(&config.base_url);
        log::debug!("API base: {}", endpoints.base());

        Ok(Self {
            http,
            endpoints,
            request_timeout: config.request_timeout(),
            upload_timeout: config.upload_timeout(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send a request and return the raw body of a 2xx response
    async fn send(&self, request: RequestBuilder, label: &str) -> Result<Vec<u8>, AppError> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            log::error!("{} failed after {:?}: {}", label, start.elapsed(), e);
            AppError::from(e)
        })?;

        let status = response.status();
        log::debug!("{} <- {} ({:?})", label, status.as_u16(), start.elapsed());

        let body = response.bytes().await.map_err(AppError::from)?;

        if !status.is_success() {
            let err = classify_status(status.as_u16(), &body);
            log::warn!("{} returned {}: {}", label, status.as_u16(), err);
            return Err(err);
        }

        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        label: &str,
    ) -> Result<T, AppError> {
        let body = self.send(request, label).await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| {
                if let Some(message) = envelope.message.as_deref() {
                    log::debug!("{}: {}", label, message);
                }
                envelope.data
            })
            .map_err(|e| {
                log::error!("{} returned an unexpected payload: {}", label, e);
                AppError::Unknown(format!("Unexpected response from server: {}", e))
            })
    }
}

#[async_trait]
impl MatrixBackend for MatrixClient {
    async fn check_health(&self) -> bool {
        let url = self.endpoints.health();
        log::debug!("GET {}", url);
        match self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().as_u16() == 200,
            Err(e) => {
                log::warn!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn convert_time(&self, request: &ConvertTimeRequest) -> Result<ConvertTimeData, AppError> {
        let url = self.endpoints.convert_time();
        log::debug!("POST {} {:?}", url, request);
        let builder = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(request);
        self.send_json(builder, "convert-time").await
    }

    async fn upload_matrix(&self, form: UploadForm) -> Result<MatrixResult, AppError> {
        let url = self.endpoints.upload_matrix();
        log::info!(
            "POST {} file={} ({} bytes) departureDate={} departureTime={} timestamp={:?}",
            url,
            form.file_name,
            form.file_bytes.len(),
            form.departure_date,
            form.departure_time,
            form.timestamp
        );

        let part = Part::bytes(form.file_bytes)
            .file_name(form.file_name)
            .mime_str(&form.mime_type)
            .map_err(|e| AppError::Unknown(format!("Error preparing file for upload: {}", e)))?;

        let mut multipart = Form::new()
            .part("file", part)
            .text("departureDate", form.departure_date)
            .text("departureTime", form.departure_time);
        if let Some(timestamp) = form.timestamp {
            multipart = multipart.text("timestamp", timestamp.to_string());
        }

        let builder = self
            .http
            .post(&url)
            .timeout(self.upload_timeout)
            .multipart(multipart);
        self.send_json(builder, "upload-distance-matrix").await
    }

    async fn download_result(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        let url = self.endpoints.download_result(filename);
        log::debug!("GET {}", url);
        let builder = self.http.get(&url).timeout(self.request_timeout);
        self.send(builder, "download-result").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn unreachable_client() -> MatrixClient {
        // Port 1 on loopback refuses connections immediately
        MatrixClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 5,
            upload_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_false_when_unreachable() {
        assert!(!unreachable_client().check_health().await);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let err = unreachable_client()
            .download_result("result.xlsx")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_endpoints_follow_config() {
        let client = MatrixClient::new(&ApiConfig {
            base_url: "matrix.example.com/api".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoints().upload_matrix(),
            "https://matrix.example.com/api/upload-distance-matrix"
        );
    }
}

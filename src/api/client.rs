//! HTTP client for the `/api/v1` REST endpoints

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::config::Config;
use crate::models::{EntityId, EntityKind, Resource};

/// Request/response contract for one entity type.
///
/// Every call issues exactly one request. Failures of any kind come back as
/// `Err(ApiError)`; nothing is retried.
#[async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, ApiError>;

    async fn get(&self, id: &EntityId) -> Result<R, ApiError>;

    async fn create(&self, payload: &Value) -> Result<R, ApiError>;

    async fn update(&self, id: &EntityId, payload: &Value) -> Result<R, ApiError>;

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError>;
}

/// Shared HTTP client bound to one API base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(&config.http.user_agent);
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|source| ApiError::Network {
            url: config.api_url.clone(),
            source,
        })?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Typed client for one entity type
    pub fn resource<R: Resource>(&self) -> ResourceClient<R> {
        ResourceClient {
            client: self.clone(),
            _marker: PhantomData,
        }
    }

    /// `{base}/api/v1/{path}/` or `{base}/api/v1/{path}/{id}`
    pub fn endpoint(&self, kind: EntityKind, id: Option<&EntityId>) -> String {
        match id {
            Some(id) => format!("{}/api/v1/{}/{}", self.base_url, kind.path(), id),
            None => format!("{}/api/v1/{}/", self.base_url, kind.path()),
        }
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<String, ApiError> {
        debug!("{} {}", method, url);

        let mut request: RequestBuilder = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| {
            warn!("{} {} failed: {}", method, url, source);
            ApiError::Network {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ApiError::Network {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            let err = ApiError::from_response(status, &text);
            warn!("{} {} returned {}: {}", method, url, status, err.message());
            return Err(err);
        }

        Ok(text)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let text = self.send(method, url, body).await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// `ResourceApi` implementation backed by HTTP
#[derive(Debug, Clone)]
pub struct ResourceClient<R> {
    client: ApiClient,
    _marker: PhantomData<fn() -> R>,
}

#[async_trait]
impl<R: Resource> ResourceApi<R> for ResourceClient<R> {
    async fn list(&self) -> Result<Vec<R>, ApiError> {
        let url = self.client.endpoint(R::KIND, None);
        self.client.send_json(Method::GET, &url, None).await
    }

    async fn get(&self, id: &EntityId) -> Result<R, ApiError> {
        let url = self.client.endpoint(R::KIND, Some(id));
        self.client.send_json(Method::GET, &url, None).await
    }

    async fn create(&self, payload: &Value) -> Result<R, ApiError> {
        let url = self.client.endpoint(R::KIND, None);
        self.client.send_json(Method::POST, &url, Some(payload)).await
    }

    async fn update(&self, id: &EntityId, payload: &Value) -> Result<R, ApiError> {
        let url = self.client.endpoint(R::KIND, Some(id));
        self.client.send_json(Method::PUT, &url, Some(payload)).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        let url = self.client.endpoint(R::KIND, Some(id));
        // Body is `{}` or empty depending on the endpoint
        self.client.send(Method::DELETE, &url, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Study;

    fn client() -> ApiClient {
        let config = Config::from_lookup(|name| match name {
            "STUDYADMIN_API_URL" => Some("http://127.0.0.1:9/".to_string()),
            _ => None,
        })
        .unwrap();
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_layout() {
        let client = client();
        assert_eq!(
            client.endpoint(EntityKind::Study, None),
            "http://127.0.0.1:9/api/v1/studies/"
        );
        assert_eq!(
            client.endpoint(EntityKind::DatabaseRelease, Some(&EntityId::new("12"))),
            "http://127.0.0.1:9/api/v1/database-releases/12"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error_value() {
        // Port 9 (discard) is closed on test hosts; the failure must come back as a value.
        let studies = client().resource::<Study>();
        let err = studies.list().await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
        assert!(err.message().starts_with("Could not reach the API"));
    }
}

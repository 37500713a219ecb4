//! Presentation service client.

use bytes::Bytes;
use deck_core::{
    Error, GenerationConfig, Presentation, PresentationSummary, Result, StoredPresentation,
    TextExporter,
};
use futures_util::{Stream, StreamExt};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::pin::Pin;

use crate::config::ClientConfig;

/// Raw body chunks of a generation response, in arrival order.
///
/// Dropping the stream closes the underlying connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Default page size of the listing endpoint.
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}

/// Body read failures: a body that is not what the endpoint promises is a
/// decode error, anything else is transport.
fn body_error(err: reqwest::Error) -> Error {
    if err.is_decode() {
        Error::Decode(err.to_string())
    } else {
        transport(err)
    }
}

/// Client for the presentation generation service.
#[derive(Debug, Clone)]
pub struct PresentationClient {
    http: reqwest::Client,
    config: ClientConfig,
    exporter: TextExporter,
}

impl PresentationClient {
    /// Create a client from the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            config,
            exporter: TextExporter::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Map non-success statuses to errors. `id` turns a 404 into `NotFound`.
    async fn check(response: Response, id: Option<&str>) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(Error::NotFound(id.to_string()));
            }
        }

        let message = response.text().await.unwrap_or_default();
        Err(Error::Http {
            status: status.as_u16(),
            message,
        })
    }

    /// Start a generation run and return its raw body stream.
    ///
    /// The options are validated before anything is sent. Body read
    /// failures surface as [`Error::Transport`] items on the stream.
    pub async fn generate(&self, request: &GenerationConfig) -> Result<ChunkStream> {
        request.validate()?;

        let url = self.config.endpoint("generate-presentation-stream/");
        log::info!("Requesting {} slides for {:?}", request.num_slides, request.title);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(response, None).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(transport));
        Ok(Box::pin(stream))
    }

    /// Fetch a persisted presentation with its joined content.
    pub async fn get(&self, id: &str) -> Result<StoredPresentation> {
        let url = self.config.endpoint(id);
        let response = self.http.get(&url).send().await.map_err(transport)?;
        let response = Self::check(response, Some(id)).await?;

        response.json().await.map_err(body_error)
    }

    /// Fetch a persisted presentation and re-hydrate its slides.
    pub async fn fetch_presentation(&self, id: &str) -> Result<Presentation> {
        let stored = self.get(id).await?;
        Ok(self.exporter.from_stored(stored))
    }

    /// List persisted presentations.
    pub async fn list(&self, limit: usize) -> Result<Vec<PresentationSummary>> {
        let url = self.config.root_endpoint("presentations");
        let response = self
            .http
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(response, None).await?;

        response.json().await.map_err(body_error)
    }

    /// Download the binary slide deck rendered by the service.
    pub async fn download_deck(&self, id: &str) -> Result<Bytes> {
        let url = self.config.endpoint(&format!("{}/download/ppt", id));
        let response = self.http.get(&url).send().await.map_err(transport)?;
        let response = Self::check(response, Some(id)).await?;

        response.bytes().await.map_err(body_error)
    }

    /// Whether the service reports itself healthy.
    ///
    /// Deployments that route `health` to the by-id lookup answer 404; in
    /// that case a one-row listing through the root alias stands in.
    pub async fn health(&self) -> Result<bool> {
        let url = self.config.endpoint("health");
        let response = self.http.get(&url).send().await.map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("Health route unavailable, falling back to listing");
            return self.list(1).await.map(|_| true);
        }

        let response = Self::check(response, None).await?;
        let health: HealthResponse = response.json().await.map_err(body_error)?;
        Ok(health.status == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{drive, PresentationAccumulator, PresentationStatus, RunOutcome};
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PresentationClient {
        PresentationClient::new(ClientConfig::new(server.uri())).unwrap()
    }

    fn record(content: &str) -> String {
        format!("{}\n\n", serde_json::json!({ "index": 1, "content": content }))
    }

    #[tokio::test]
    async fn test_generate_streams_slides() {
        let server = MockServer::start().await;
        let body = [
            record("**Loans**\n- Personal\n- Mortgage"),
            record("---SLIDE_SEPARATOR---"),
            record("Title: Cards\n* Debit"),
        ]
        .concat();
        Mock::given(method("POST"))
            .and(path("/api/v1/presentation/generate-presentation-stream/"))
            .and(body_partial_json(serde_json::json!({
                "title": "Banking",
                "scope": "Entire Document",
                "num_slides": 10
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let chunks = client
            .generate(&GenerationConfig::new("Banking"))
            .await
            .unwrap();

        let mut acc = PresentationAccumulator::new(Presentation::new("Banking"));
        let outcome = drive(chunks, &mut acc, &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        let presentation = acc.into_presentation();
        assert_eq!(presentation.status, PresentationStatus::Completed);
        assert_eq!(presentation.slides.len(), 2);
        assert_eq!(presentation.slides[0].title, "Loans");
        assert_eq!(presentation.slides[0].content, "• Personal\n• Mortgage");
        assert_eq!(presentation.slides[1].title, "Cards");
        assert_eq!(presentation.slides[1].index, 1);
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_config_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .generate(&GenerationConfig::new("Banking").with_num_slides(2))
            .await;

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.generate(&GenerationConfig::new("Banking")).await;

        assert!(matches!(
            result,
            Err(Error::Http { status: 500, ref message }) if message == "boom"
        ));
    }

    #[tokio::test]
    async fn test_fetch_presentation_rehydrates_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "abc",
                "title": "Banking",
                "status": "completed",
                "output_file_path": "/tmp/Banking.txt",
                "created_at": "2024-05-01T09:30:00",
                "content": "Banking\nProfessional Banking Services Overview\n\n---SLIDE_SEPARATOR---\n\n**Loans**\n- Personal"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let presentation = client.fetch_presentation("abc").await.unwrap();

        assert_eq!(presentation.id, "abc");
        assert_eq!(presentation.status, PresentationStatus::Completed);
        assert_eq!(presentation.slides.len(), 2);
        assert_eq!(presentation.slides[0].title, "Banking");
        assert_eq!(presentation.slides[1].title, "Loans");
        assert_eq!(presentation.slides[1].content, "• Personal");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.get("nope").await;

        assert!(matches!(result, Err(Error::NotFound(ref id)) if id == "nope"));
    }

    #[tokio::test]
    async fn test_list_passes_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presentations"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "1", "title": "Loans", "status": "completed", "output_file_path": null, "created_at": "2024-05-01T09:30:00+00:00"},
                {"id": "2", "title": "Cards", "status": "failed", "output_file_path": null, "created_at": null}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let summaries = client.list(5).await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].title, "Loans");
        assert_eq!(summaries[1].status, PresentationStatus::Failed);
    }

    #[tokio::test]
    async fn test_download_deck_returns_bytes() {
        let server = MockServer::start().await;
        let deck = vec![0x50, 0x4B, 0x03, 0x04, 0x00];
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/abc/download/ppt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(deck.clone()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let bytes = client.download_deck("abc").await.unwrap();

        assert_eq!(bytes.as_ref(), deck.as_slice());
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.health().await.unwrap());
    }

    #[tokio::test]
    async fn test_list_avoids_shadowed_prefixed_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/presentations"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"detail": "Presentation not found"})),
            )
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presentations"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let summaries = client.list(DEFAULT_LIST_LIMIT).await.unwrap();

        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn test_health_falls_back_to_listing_when_shadowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/health"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"detail": "Presentation not found"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presentations"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.health().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_fallback_reports_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/health"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presentations"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.health().await;

        assert!(matches!(result, Err(Error::Http { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/presentation/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presentations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"not": "a list"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);

        assert!(matches!(client.get("abc").await, Err(Error::Decode(_))));
        assert!(matches!(client.list(5).await, Err(Error::Decode(_))));
    }
}

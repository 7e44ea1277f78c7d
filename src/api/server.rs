//! API Server module
//!
//! This module serves the aggregated directory over HTTP for UI clients.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aggregator::{service_tags, DEFAULT_TAG_COUNT};
use crate::api::{ClientError, DirectoryApi};
use crate::directory::{FetchOutcome, SharedDirectory};
use crate::locations::{self, StateCities};
use crate::models::{Provider, SearchParams};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: SharedDirectory,
    pub api: Arc<dyn DirectoryApi>,
    /// Server-side filters sent with every refresh
    pub params: SearchParams,
}

impl AppState {
    pub fn new(api: Arc<dyn DirectoryApi>, params: SearchParams) -> Self {
        Self {
            directory: SharedDirectory::new(),
            api,
            params,
        }
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.directory.refresh(self.api.as_ref(), &self.params).await
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }

    pub fn data(self) -> Option<T> {
        self.data
    }
}

/// Listing filters taken from the query string
#[derive(Debug, Default, Deserialize)]
pub struct ProviderQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationsResponse {
    /// Fixed catalog offered by the picker
    pub catalog: Vec<StateCities>,
    /// Locations present in the loaded providers
    pub from_data: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(flatten)]
    pub outcome: FetchOutcome,
    pub loaded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Helper function to map remote results to Axum responses
fn map_remote_result<T: Serialize>(result: Result<T, ClientError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => {
            tracing::error!("Remote API request failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::<T>::error(format!("Remote API error: {}", e))),
            )
                .into_response()
        }
    }
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        // --- Directory --- //
        .route("/api/providers", get(list_providers))
        .route("/api/providers/:id", get(get_provider))
        .route("/api/suggestions", get(get_suggestions))
        .route("/api/locations", get(get_locations))
        .route("/api/refresh", post(refresh))
        // --- Content pass-through --- //
        .route("/api/blogs", get(list_blogs))
        .route("/api/events", get(list_events))
        // --- UI --- //
        .route("/ui", get(ui_handler))
        .route("/ui/updates", get(updates_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Directory Handlers --- //

async fn list_providers(
    State(state): State<AppState>,
    Query(filters): Query<ProviderQuery>,
) -> impl IntoResponse {
    let location = filters.location.filter(|l| !l.is_empty());
    let providers = state.directory.view(&filters.query, location.as_deref());
    Json(ApiResponse::success(providers))
}

async fn get_provider(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.directory.provider(&id) {
        Some(provider) => (StatusCode::OK, Json(ApiResponse::success(provider))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<Provider>::error(format!(
                "Provider '{}' not found",
                id
            ))),
        )
            .into_response(),
    }
}

async fn get_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.directory.suggestions(&params.query)))
}

async fn get_locations(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(LocationsResponse {
        catalog: locations::catalog(),
        from_data: state.directory.locations(),
    }))
}

async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.refresh().await;
    Json(ApiResponse::success(RefreshResponse {
        outcome,
        loaded_at: state.directory.loaded_at(),
    }))
}

// --- Content Handlers --- //

async fn list_blogs(State(state): State<AppState>) -> Response {
    map_remote_result(state.api.blogs().await)
}

async fn list_events(State(state): State<AppState>) -> Response {
    map_remote_result(state.api.events().await)
}

// --- UI and Update Handlers --- //

async fn updates_handler(State(state): State<AppState>) -> impl IntoResponse {
    let receiver = state.directory.subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            // Lagging only means several refreshes collapsed into one notification
            Ok(_) | Err(RecvError::Lagged(_)) => Some((
                Ok::<_, Infallible>("event: update\ndata: change\n\n".to_string()),
                receiver,
            )),
            Err(RecvError::Closed) => None,
        }
    });

    let headers = [
        (
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("text/event-stream"),
        ),
        (
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-cache"),
        ),
    ];

    (headers, axum::body::Body::from_stream(stream))
}

async fn ui_handler(
    State(state): State<AppState>,
    Query(filters): Query<ProviderQuery>,
) -> impl IntoResponse {
    let location = filters.location.filter(|l| !l.is_empty());
    let providers = state.directory.view(&filters.query, location.as_deref());
    Html(render_ui(&filters.query, location.as_deref(), &providers))
}

fn render_ui(query: &str, location: Option<&str>, providers: &[Provider]) -> String {
    use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><title>Solution Providers</title></head><body>");
    html.push_str("<h1>Solution Providers</h1>");
    html.push_str(&format!(
        "<form method=\"get\" action=\"/ui\"><input name=\"query\" placeholder=\"Search services...\" value=\"{}\"><input name=\"location\" placeholder=\"City, State\" value=\"{}\"><button>Search</button></form>",
        attr(query),
        attr(location.unwrap_or_default())
    ));

    if providers.is_empty() {
        html.push_str("<p>No providers found matching your criteria.</p>");
    } else {
        html.push_str(&format!("<p>{} providers found</p><ul>", providers.len()));
        for provider in providers {
            let (shown, extra) = service_tags(&provider.services, DEFAULT_TAG_COUNT);
            html.push_str(&format!(
                "<li><h2>{}</h2><p class='location'>{}</p><p class='services'>",
                text(&provider.name),
                text(&provider.location)
            ));
            for service in shown {
                html.push_str(&format!("<span class='tag'>{}</span> ", text(&service.name)));
            }
            if extra > 0 {
                html.push_str(&format!("<span class='more'>+{} more</span>", extra));
            }
            html.push_str(&format!(
                "</p><p class='about'>{}</p></li>",
                text(provider.about_or_default())
            ));
        }
        html.push_str("</ul>");
    }

    html.push_str(
        "<script>new EventSource('/ui/updates').addEventListener('update', () => location.reload());</script>",
    );
    html.push_str("</body></html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressRecord, BlogPost, Event, SearchResponse, ServiceGroupRecord};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt; // for `collect`
    use serde::de::DeserializeOwned;
    use tower::ServiceExt; // for `oneshot`

    struct StubApi {
        groups: Vec<ServiceGroupRecord>,
        content_fails: bool,
    }

    #[async_trait::async_trait]
    impl DirectoryApi for StubApi {
        async fn search_services(
            &self,
            _params: &SearchParams,
        ) -> Result<SearchResponse, ClientError> {
            Ok(SearchResponse {
                services: self.groups.clone(),
                total: self.groups.len() as u64,
                filtered_response: false,
            })
        }

        async fn blogs(&self) -> Result<Vec<BlogPost>, ClientError> {
            if self.content_fails {
                return Err(ClientError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(vec![BlogPost {
                id: "1".to_string(),
                title: "From Silos to Solutions".to_string(),
                ..Default::default()
            }])
        }

        async fn events(&self) -> Result<Vec<Event>, ClientError> {
            Ok(Vec::new())
        }
    }

    fn group(id: &str, name: &str, org: &str, city: &str, state: &str) -> ServiceGroupRecord {
        ServiceGroupRecord {
            id: id.to_string(),
            service_name: name.to_string(),
            service_description: String::new(),
            addresses: vec![AddressRecord {
                organization_name: org.to_string(),
                city: city.to_string(),
                state: state.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    // Helper to create a loaded state and Router
    async fn setup_test_app(content_fails: bool) -> (AppState, Router) {
        let api = StubApi {
            groups: vec![
                group("s1", "Physiotherapy", "Hope Center", "Pune", "Maharashtra"),
                group("s2", "Counselling", "Hope Center", "Pune", "Maharashtra"),
                group("s3", "Braille <Training>", "Drishti", "Bangalore", "Karnataka"),
            ],
            content_fails,
        };
        let state = AppState::new(Arc::new(api), SearchParams::default());
        state.refresh().await;
        let app = router(state.clone());
        (state, app)
    }

    // Helper to make requests and deserialize JSON response data
    async fn request_json<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
    ) -> (StatusCode, ApiResponse<T>) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed = serde_json::from_slice::<ApiResponse<T>>(&body_bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to parse response: {}. Body: {}",
                e,
                String::from_utf8_lossy(&body_bytes)
            )
        });
        (status, parsed)
    }

    #[tokio::test]
    async fn test_list_providers_applies_filters() {
        let (_state, app) = setup_test_app(false).await;

        let (status, resp) = request_json::<Vec<Provider>>(&app, "GET", "/api/providers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data().unwrap().len(), 2);

        let (_, resp) =
            request_json::<Vec<Provider>>(&app, "GET", "/api/providers?query=COUNSEL").await;
        let providers = resp.data().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].services.len(), 2);

        let (_, resp) = request_json::<Vec<Provider>>(
            &app,
            "GET",
            "/api/providers?location=Bangalore%2C%20Karnataka",
        )
        .await;
        let providers = resp.data().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Drishti");
    }

    #[tokio::test]
    async fn test_empty_location_means_no_location_filter() {
        let (_state, app) = setup_test_app(false).await;

        let (status, resp) =
            request_json::<Vec<Provider>>(&app, "GET", "/api/providers?location=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data().unwrap().len(), 2);

        let (_, resp) =
            request_json::<Vec<Provider>>(&app, "GET", "/api/providers?query=hope&location=").await;
        let providers = resp.data().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Hope Center");
    }

    #[tokio::test]
    async fn test_get_provider_by_id() {
        let (_state, app) = setup_test_app(false).await;

        let (status, resp) = request_json::<Provider>(
            &app,
            "GET",
            "/api/providers/Hope%20Center__Pune__Maharashtra",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data().unwrap().name, "Hope Center");

        let (status, resp) =
            request_json::<Provider>(&app, "GET", "/api/providers/Nobody__X__Y").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!resp.success);
    }

    #[tokio::test]
    async fn test_suggestions_and_locations() {
        let (_state, app) = setup_test_app(false).await;

        let (_, resp) = request_json::<Vec<String>>(&app, "GET", "/api/suggestions?query=the").await;
        assert_eq!(resp.data().unwrap(), vec!["Physiotherapy".to_string()]);

        let (_, resp) = request_json::<Vec<String>>(&app, "GET", "/api/suggestions").await;
        assert!(resp.data().unwrap().is_empty());

        let (_, resp) = request_json::<LocationsResponse>(&app, "GET", "/api/locations").await;
        let locations = resp.data().unwrap();
        assert_eq!(locations.catalog.len(), locations::STATES.len());
        assert_eq!(
            locations.from_data,
            vec![
                "Pune, Maharashtra".to_string(),
                "Bangalore, Karnataka".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_refresh_reports_outcome() {
        let (state, app) = setup_test_app(false).await;

        let (status, resp) = request_json::<RefreshResponse>(&app, "POST", "/api/refresh").await;
        assert_eq!(status, StatusCode::OK);
        let refreshed = resp.data().unwrap();
        assert_eq!(refreshed.outcome, FetchOutcome::Applied { providers: 2 });
        assert!(refreshed.loaded_at.is_some());
        assert_eq!(state.directory.providers().len(), 2);
    }

    #[tokio::test]
    async fn test_content_passthrough_and_remote_failure() {
        let (_state, app) = setup_test_app(false).await;
        let (status, resp) = request_json::<Vec<BlogPost>>(&app, "GET", "/api/blogs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data().unwrap()[0].title, "From Silos to Solutions");

        let (_state, app) = setup_test_app(true).await;
        let (status, resp) = request_json::<Vec<BlogPost>>(&app, "GET", "/api/blogs").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(resp.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_ui_escapes_and_reports_empty_results() {
        let (_state, app) = setup_test_app(false).await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ui?query=braille").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("Braille &lt;Training&gt;"));
        assert!(html.contains("No description available."));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ui?query=zzz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body)
            .contains("No providers found matching your criteria."));
    }

    #[test]
    fn test_render_ui_shows_extra_service_count() {
        let provider = Provider {
            id: "A__B__C".to_string(),
            name: "A".to_string(),
            location: "B, C".to_string(),
            city: "B".to_string(),
            state: "C".to_string(),
            services: ["x", "y", "z"]
                .iter()
                .map(|n| crate::models::Service {
                    id: n.to_string(),
                    name: n.to_string(),
                    category: "Service".to_string(),
                })
                .collect(),
            about: "About A".to_string(),
            contact_info: Vec::new(),
        };
        let html = render_ui("", None, &[provider]);
        assert!(html.contains("+1 more"));
        assert!(html.contains("1 providers found"));
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use reqwest::header::{AUTHORIZATION, SET_COOKIE};

use captain_api::app::{router, AppState};
use captain_api::auth::{self, TokenSpec};
use captain_api::config::AppConfig;
use captain_api::database::{MemoryRegistry, RegistryStore};
use captain_api::session::MemorySessionStore;

pub const COOKIE_KEY: &str = "test-cookie-key";
pub const ADMIN_KEY: &str = "test-admin-key";
pub const START_KEY: &str = "test-start-key";
pub const COOKIE_NAME: &str = "session-key";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub registry: Arc<MemoryRegistry>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Server with start tokens unchecked
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(test_config(false)).await
    }

    /// Server that checks `/start/:card_id` against `START_KEY`
    pub async fn spawn_with_start_key() -> Result<Self> {
        Self::spawn_with(test_config(true)).await
    }

    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        let registry = Arc::new(MemoryRegistry::new());
        let state = AppState::new(
            &config,
            Arc::new(MemorySessionStore::new()),
            registry.clone() as Arc<dyn RegistryStore>,
        )?;

        let (port, base_url) = serve(router(state)).await?;
        let server = Self {
            port,
            base_url,
            registry,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request carrying the session as `Authorization: Cookie <id>`
    pub fn request(&self, method: reqwest::Method, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(AUTHORIZATION, format!("Cookie {}", session))
    }

    pub fn get(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path, session)
    }

    pub fn put(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::PUT, path, session)
    }

    pub fn delete(&self, path: &str, session: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::DELETE, path, session)
    }

    /// Log in as admin; returns the encoded session id
    pub async fn admin_session(&self) -> Result<String> {
        let resp = self
            .client
            .get(self.url(&format!("/cardlogin/{}", admin_token())))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "admin login failed: {}", resp.status());
        session_from(&resp).context("admin login did not set a session cookie")
    }

    /// Start a session bound to `card_id`; returns the encoded session id
    pub async fn card_session(&self, card_id: &str) -> Result<String> {
        let resp = self
            .client
            .get(self.url(&format!("/start/{}", card_id)))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "start failed: {}", resp.status());
        session_from(&resp).context("start did not set a session cookie")
    }
}

pub fn test_config(check_start_tokens: bool) -> AppConfig {
    let mut config = AppConfig::development();
    config.security.cookie_secret_key = COOKIE_KEY.to_string();
    config.security.admin_secret_key = ADMIN_KEY.to_string();
    if check_start_tokens {
        config.security.start_secret_key = START_KEY.to_string();
    }
    config.relay.timeout_ms = 2_000;
    config
}

pub fn admin_token() -> String {
    auth::generate(ADMIN_KEY.as_bytes(), TokenSpec::default()).expect("token generation")
}

pub fn start_token() -> String {
    auth::generate(START_KEY.as_bytes(), TokenSpec::default()).expect("token generation")
}

/// Encoded session id from the response's `Set-Cookie`
pub fn session_from(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == COOKIE_NAME).then(|| value.to_string())
        })
}

async fn serve(app: Router) -> Result<(u16, String)> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((port, format!("http://127.0.0.1:{}", port)))
}

/// A request as seen by the fake robot
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Robot endpoint that records every request.
///
/// `/ping` answers 418 with a JSON body, `/run` 200 text, `/stop` 500 text and
/// `/upload` 201 text; anything else is 404.
pub struct FakeRobot {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub const PING_BODY: &str = r#"{"robot":"thymio","battery":87}"#;

impl FakeRobot {
    /// Robot whose command endpoints live under `/bot`
    pub async fn spawn() -> Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&requests));
        let (_, base_url) = serve(app).await?;
        Ok(Self {
            base_url: format!("{}/bot", base_url),
            requests,
        })
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("lock").clone()
    }
}

async fn record(
    State(requests): State<Arc<Mutex<Vec<Recorded>>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    requests.lock().expect("lock").push(Recorded {
        method,
        path: path.clone(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body,
    });

    match path.as_str() {
        "/bot/ping" => (
            StatusCode::IM_A_TEAPOT,
            [(header::CONTENT_TYPE, "application/json")],
            PING_BODY.to_string(),
        ),
        "/bot/run" => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "running".to_string()),
        "/bot/stop" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "motor stalled".to_string(),
        ),
        "/bot/upload" => (StatusCode::CREATED, [(header::CONTENT_TYPE, "text/plain")], "stored".to_string()),
        _ => (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "text/plain")], "no such command".to_string()),
    }
}

/// Robot that accepts connections and never answers in time
pub async fn hanging_robot_url() -> Result<String> {
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        StatusCode::OK
    });
    let (_, base_url) = serve(app).await?;
    Ok(base_url)
}

/// URL on which nothing listens
pub fn unreachable_url() -> String {
    let port = portpicker::pick_unused_port().unwrap_or(9);
    format!("http://127.0.0.1:{}", port)
}

// services/relay_service.rs - Forward card commands to the associated robot
//
// The robot's answer is passed through untouched: status, content type and a
// streamed body. Only transport failures are errors of the relay.

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::registry_service::{RegistryError, RegistryService};
use crate::database::Robot;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Run,
    Stop,
    Upload,
}

impl Command {
    pub fn path(self) -> &'static str {
        match self {
            Command::Ping => "/ping",
            Command::Run => "/run",
            Command::Stop => "/stop",
            Command::Upload => "/upload",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path()[1..])
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid robot url: {0}")]
    InvalidUrl(String),

    #[error("Robot unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("Cannot encode program: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Join the robot base url and the command segment.
///
/// A trailing slash on the base path is dropped so `http://r/api/` and
/// `http://r/api` both give `http://r/api/ping`.
pub fn command_url(base: &str, command: Command) -> Result<Url, RelayError> {
    let mut url = Url::parse(base).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
    let path = format!("{}{}", url.path().trim_end_matches('/'), command.path());
    url.set_path(&path);
    Ok(url)
}

/// Robot response on its way back to the caller
pub struct RelayResponse {
    inner: reqwest::Response,
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let status = self.inner.status();
        let content_type = self.inner.headers().get(header::CONTENT_TYPE).cloned();

        let mut response = Response::new(Body::from_stream(self.inner.bytes_stream()));
        *response.status_mut() = status;
        if let Some(value) = content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

pub struct CommandRelay {
    registry: RegistryService,
    client: Client,
}

impl CommandRelay {
    pub fn new(registry: RegistryService, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;
        Ok(Self { registry, client })
    }

    /// Send `command` to the robot bound to `card_id`
    pub async fn relay(&self, card_id: &str, command: Command) -> Result<RelayResponse, RelayError> {
        let robot = self.registry.robot_for_card(card_id).await?;
        self.send(&robot, card_id, command).await
    }

    /// Send `command` to a robot by name, regardless of association
    pub async fn relay_to_robot(&self, name: &str, command: Command) -> Result<RelayResponse, RelayError> {
        let robot = self.registry.get_robot(name).await?;
        let card_id = robot.card_id.clone();
        self.send(&robot, &card_id, command).await
    }

    async fn send(&self, robot: &Robot, card_id: &str, command: Command) -> Result<RelayResponse, RelayError> {
        let url = command_url(&robot.url, command)?;
        debug!("Relaying {} for card '{}' to {}", command, card_id, url);

        let request = match command {
            Command::Upload => {
                let card = self.registry.get_card(card_id).await?;
                self.client
                    .put(url)
                    .header(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
                    .body(serde_json::to_vec(&card)?)
            }
            _ => self.client.get(url),
        };

        let inner = request.send().await.map_err(RelayError::Unavailable)?;
        info!(
            "Robot {} answered {} with {}",
            robot.name,
            command,
            inner.status()
        );
        Ok(RelayResponse { inner })
    }
}

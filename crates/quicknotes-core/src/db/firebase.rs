//! Firebase Realtime Database REST client.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;

use super::push_id::PushIdGenerator;
use super::stream::{apply_event, EventStreamParser, StreamAction};
use super::{DatabaseError, DatabaseProvider, DatabaseResult, DbPath, Subscription, SubscriptionEvent};
use crate::config::ResolvedFirebaseConfig;
use crate::models::NoteId;
use crate::util::{compact_text, is_http_url};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct FirebaseDatabaseClient {
    base_url: String,
    request_timeout: Duration,
    client: Client,
    auth_token: Arc<RwLock<Option<String>>>,
    push_ids: Arc<PushIdGenerator>,
}

impl FirebaseDatabaseClient {
    pub fn new(config: &ResolvedFirebaseConfig) -> DatabaseResult<Self> {
        let base_url = config.database_url.trim().trim_end_matches('/').to_string();
        if !is_http_url(&base_url) {
            return Err(DatabaseError::InvalidConfiguration(
                "database URL must include http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            request_timeout: config.request_timeout,
            client: Client::builder().build()?,
            auth_token: Arc::new(RwLock::new(None)),
            push_ids: Arc::new(PushIdGenerator::new()),
        })
    }

    /// Set the id token sent with every request.
    ///
    /// Live subscriptions pick the new token up on their next reconnect.
    pub fn set_auth_token(&self, token: Option<String>) {
        let mut guard = self
            .auth_token
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = token;
    }

    fn location_url(&self, path: &DbPath) -> String {
        location_url(&self.base_url, path)
    }

    async fn send_ack(&self, request: RequestBuilder) -> DatabaseResult<()> {
        let request = with_auth(request, current_token(&self.auth_token));
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response.status(), response).await.map(|_| ())
    }
}

impl DatabaseProvider for FirebaseDatabaseClient {
    fn new_key(&self, _collection: &DbPath) -> NoteId {
        NoteId::from_generated(self.push_ids.next_id())
    }

    async fn write(&self, path: &DbPath, value: &Value) -> DatabaseResult<()> {
        tracing::debug!("PUT {}", path);
        self.send_ack(self.client.put(self.location_url(path)).json(value))
            .await
    }

    async fn delete(&self, path: &DbPath) -> DatabaseResult<()> {
        tracing::debug!("DELETE {}", path);
        self.send_ack(self.client.delete(self.location_url(path)))
            .await
    }

    async fn subscribe(&self, path: &DbPath) -> DatabaseResult<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_event_stream(
            self.client.clone(),
            self.location_url(path),
            Arc::clone(&self.auth_token),
            sender,
        ));
        tracing::info!("Subscribed to {}", path);
        Ok(Subscription::new(receiver, Some(task.abort_handle())))
    }
}

fn location_url(base_url: &str, path: &DbPath) -> String {
    let encoded = path
        .segments()
        .iter()
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{base_url}/{encoded}.json")
}

fn current_token(auth_token: &RwLock<Option<String>>) -> Option<String> {
    auth_token
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn with_auth(request: RequestBuilder, token: Option<String>) -> RequestBuilder {
    match token {
        Some(token) => request.query(&[("auth", token)]),
        None => request,
    }
}

fn map_transport_error(error: reqwest::Error) -> DatabaseError {
    if error.is_timeout() {
        DatabaseError::Timeout
    } else {
        DatabaseError::Http(error)
    }
}

async fn check_status(
    status: StatusCode,
    response: reqwest::Response,
) -> DatabaseResult<reqwest::Response> {
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(DatabaseError::Unauthorized),
        StatusCode::FORBIDDEN => Err(DatabaseError::PermissionDenied),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(DatabaseError::Api(parse_api_error(status, &body)))
        }
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string));
    match message {
        Some(message) => format!("{} ({})", message.trim(), status.as_u16()),
        None if body.trim().is_empty() => format!("HTTP {}", status.as_u16()),
        None => format!("{} ({})", compact_text(body), status.as_u16()),
    }
}

/// Keep a streaming read open until the subscriber goes away, reconnecting
/// after failures.
async fn run_event_stream(
    client: Client,
    url: String,
    auth_token: Arc<RwLock<Option<String>>>,
    sender: mpsc::UnboundedSender<SubscriptionEvent>,
) {
    loop {
        let token = current_token(&auth_token);
        match stream_once(&client, &url, token, &sender).await {
            Ok(()) => tracing::debug!("Event stream for {} ended", url),
            Err(error) => {
                if sender.send(SubscriptionEvent::Error(error.to_string())).is_err() {
                    return;
                }
            }
        }

        if sender.is_closed() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn stream_once(
    client: &Client,
    url: &str,
    token: Option<String>,
    sender: &mpsc::UnboundedSender<SubscriptionEvent>,
) -> DatabaseResult<()> {
    let request = with_auth(client.get(url).header(ACCEPT, "text/event-stream"), token);
    let response = request.send().await.map_err(map_transport_error)?;
    let mut response = check_status(response.status(), response).await?;

    let mut parser = EventStreamParser::default();
    let mut cache = Value::Null;
    while let Some(chunk) = response.chunk().await? {
        for event in parser.feed(&chunk) {
            match apply_event(&mut cache, &event)? {
                StreamAction::Updated => {
                    if sender.send(SubscriptionEvent::Snapshot(cache.clone())).is_err() {
                        return Ok(());
                    }
                }
                StreamAction::KeepAlive => {}
                StreamAction::Cancelled(reason) => {
                    tracing::warn!("Event stream cancelled by server: {}", reason);
                    return Err(DatabaseError::PermissionDenied);
                }
                StreamAction::AuthRevoked => return Err(DatabaseError::Unauthorized),
                StreamAction::Ignored(name) => {
                    tracing::debug!("Ignoring stream event '{}'", name);
                }
            }
        }
    }
    Ok(())
}

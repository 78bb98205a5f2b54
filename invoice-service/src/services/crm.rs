//! CRM connection: login, streaming subscription, record creation.
//!
//! The client is constructed once at process start and shared as
//! `Arc<dyn CrmClient>` by every in-flight event.

use crate::config::SalesforceConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Event payloads buffered between the long-poll loop and the pipeline.
const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("record rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        CrmError::Connection(err.to_string())
    }
}

/// Result of creating a record on the response object.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
}

#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Subscribe to a platform-event topic. Each received event's payload is
    /// delivered on the returned channel; the channel closing means the
    /// subscription is gone.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Value>, CrmError>;

    /// Create one record on the given object.
    async fn create_record(&self, object: &str, fields: Value) -> Result<CreateResult, CrmError>;
}

/// Live client: SOAP username/password login, CometD long-polling for the
/// subscription, REST for record creation.
#[derive(Clone)]
pub struct SalesforceClient {
    http: Client,
    instance_url: String,
    session_id: String,
    api_version: String,
}

impl SalesforceClient {
    pub async fn login(config: &SalesforceConfig) -> Result<Self, CrmError> {
        // The connect long-poll holds for up to ~110s server-side.
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CrmError::Connection(e.to_string()))?;

        let envelope = format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" "#,
                r#"xmlns:urn="urn:partner.soap.sforce.com">"#,
                r#"<soapenv:Body><urn:login>"#,
                r#"<urn:username>{}</urn:username>"#,
                r#"<urn:password>{}</urn:password>"#,
                r#"</urn:login></soapenv:Body></soapenv:Envelope>"#
            ),
            xml_escape(&config.username),
            xml_escape(&config.password),
        );

        let response = http
            .post(format!(
                "{}/services/Soap/u/{}",
                config.login_url, config.api_version
            ))
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let fault = extract_tag(&body, "faultstring").unwrap_or_else(|| body.clone());
            return Err(CrmError::Auth(format!("login returned {}: {}", status, fault)));
        }

        let session_id = extract_tag(&body, "sessionId")
            .ok_or_else(|| CrmError::Protocol("sessionId missing from login response".into()))?;
        let server_url = extract_tag(&body, "serverUrl")
            .ok_or_else(|| CrmError::Protocol("serverUrl missing from login response".into()))?;
        let instance_url = origin_of(&server_url)
            .ok_or_else(|| CrmError::Protocol(format!("unparseable serverUrl: {}", server_url)))?;

        tracing::info!(instance = %instance_url, "logged in to CRM");

        Ok(Self {
            http,
            instance_url,
            session_id,
            api_version: config.api_version.clone(),
        })
    }

    async fn bayeux_post(&self, messages: Value) -> Result<Vec<Value>, CrmError> {
        let url = format!("{}/cometd/{}", self.instance_url, self.api_version);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.session_id)
            .json(&messages)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Protocol(format!(
                "streaming endpoint returned {}",
                status
            )));
        }
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| CrmError::Protocol(format!("unparseable bayeux response: {}", e)))
    }

    async fn connect_loop(self, channel: String, client_id: String, tx: mpsc::Sender<Value>) {
        loop {
            let connect = json!([{
                "channel": "/meta/connect",
                "clientId": client_id,
                "connectionType": "long-polling",
            }]);
            match self.bayeux_post(connect).await {
                Ok(messages) => {
                    for message in messages {
                        if message["channel"] == channel.as_str() {
                            if let Some(payload) = message.pointer("/data/payload") {
                                if tx.send(payload.clone()).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "streaming connect failed; backing off");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
            if tx.is_closed() {
                return;
            }
        }
    }
}

#[async_trait]
impl CrmClient for SalesforceClient {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Value>, CrmError> {
        let channel = format!("/event/{}", topic);

        let responses = self
            .bayeux_post(json!([{
                "channel": "/meta/handshake",
                "version": "1.0",
                "supportedConnectionTypes": ["long-polling"],
            }]))
            .await?;
        let handshake = responses
            .first()
            .ok_or_else(|| CrmError::Protocol("empty handshake response".into()))?;
        if !handshake["successful"].as_bool().unwrap_or(false) {
            return Err(CrmError::Protocol(format!(
                "handshake refused: {}",
                handshake["error"].as_str().unwrap_or("unknown")
            )));
        }
        let client_id = handshake["clientId"]
            .as_str()
            .ok_or_else(|| CrmError::Protocol("clientId missing from handshake".into()))?
            .to_string();

        let responses = self
            .bayeux_post(json!([{
                "channel": "/meta/subscribe",
                "clientId": client_id,
                "subscription": channel,
            }]))
            .await?;
        let subscribe = responses
            .iter()
            .find(|m| m["channel"] == "/meta/subscribe")
            .ok_or_else(|| CrmError::Protocol("no subscribe acknowledgement".into()))?;
        if !subscribe["successful"].as_bool().unwrap_or(false) {
            return Err(CrmError::Protocol(format!(
                "subscribe refused: {}",
                subscribe["error"].as_str().unwrap_or("unknown")
            )));
        }

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let client = self.clone();
        tokio::spawn(client.connect_loop(channel, client_id, tx));
        Ok(rx)
    }

    async fn create_record(&self, object: &str, fields: Value) -> Result<CreateResult, CrmError> {
        let url = format!(
            "{}/services/data/v{}/sobjects/{}/",
            self.instance_url, self.api_version, object
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.session_id)
            .json(&fields)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CrmError::Rejected(format!(
                "create returned {}: {}",
                status, body
            )));
        }

        let result: CreateResult = serde_json::from_str(&body)
            .map_err(|e| CrmError::Protocol(format!("unparseable create response: {}", e)))?;
        if !result.success {
            return Err(CrmError::Rejected(format!("{:?}", result.errors)));
        }
        Ok(result)
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// First occurrence of `<tag>...</tag>`, namespace-free as the login
/// response emits them.
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

/// `scheme://host` part of a URL.
fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")? + 3;
    match url[scheme_end..].find('/') {
        Some(path) => Some(url[..scheme_end + path].to_string()),
        None => Some(url.to_string()),
    }
}

/// In-memory double for tests: inbound payloads are injected through
/// [`MockCrmClient::sender`], created records are captured for assertions.
pub struct MockCrmClient {
    inbound: Mutex<Option<mpsc::Receiver<Value>>>,
    sender: mpsc::Sender<Value>,
    created: Mutex<Vec<(String, Value)>>,
    reject_publish: bool,
}

impl MockCrmClient {
    pub fn new() -> Self {
        Self::with_rejection(false)
    }

    /// A mock whose `create_record` reports an application-level rejection.
    pub fn with_rejection(reject_publish: bool) -> Self {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        Self {
            inbound: Mutex::new(Some(receiver)),
            sender,
            created: Mutex::new(Vec::new()),
            reject_publish,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<Value> {
        self.sender.clone()
    }

    pub fn created(&self) -> Vec<(String, Value)> {
        self.created.lock().unwrap().clone()
    }
}

impl Default for MockCrmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrmClient for MockCrmClient {
    async fn subscribe(&self, _topic: &str) -> Result<mpsc::Receiver<Value>, CrmError> {
        self.inbound
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| CrmError::Protocol("mock already subscribed".into()))
    }

    async fn create_record(&self, object: &str, fields: Value) -> Result<CreateResult, CrmError> {
        if self.reject_publish {
            return Err(CrmError::Rejected("mock rejection".into()));
        }
        let mut created = self.created.lock().unwrap();
        created.push((object.to_string(), fields));
        Ok(CreateResult {
            id: Some(format!("mock-{}", created.len())),
            success: true,
            errors: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_escape_covers_credential_characters() {
        assert_eq!(xml_escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn extract_tag_reads_login_fields() {
        let xml = "<result><serverUrl>https://na1.salesforce.com/services/Soap/u/58.0</serverUrl>\
                   <sessionId>00D!AQEA</sessionId></result>";
        assert_eq!(extract_tag(xml, "sessionId").as_deref(), Some("00D!AQEA"));
        assert_eq!(
            extract_tag(xml, "serverUrl").as_deref(),
            Some("https://na1.salesforce.com/services/Soap/u/58.0")
        );
        assert_eq!(extract_tag(xml, "missing"), None);
    }

    #[test]
    fn origin_strips_the_soap_path() {
        assert_eq!(
            origin_of("https://na1.salesforce.com/services/Soap/u/58.0").as_deref(),
            Some("https://na1.salesforce.com")
        );
        assert_eq!(
            origin_of("https://na1.salesforce.com").as_deref(),
            Some("https://na1.salesforce.com")
        );
        assert_eq!(origin_of("no-scheme"), None);
    }

    #[test]
    fn create_result_deserializes_rest_response() {
        let result: CreateResult =
            serde_json::from_str(r#"{"id":"a0X1","success":true,"errors":[]}"#).unwrap();
        assert!(result.success);
        assert_eq!(result.id.as_deref(), Some("a0X1"));
    }
}

use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use log::{ debug, error, info, warn };
use reqwest::header::{ ACCEPT, AUTHORIZATION, CONTENT_TYPE };
use reqwest::{ Client, Method, StatusCode, Url };
use serde_json::{ json, Value };

use crate::config::ClusterConfig;
use crate::error::{ Error, Result };
use crate::index::{ CreateIndexOutcome, EmbeddingModel, IndexAdmin, ModelTensorOutput };

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// REST client for the cluster that owns the managed indices and hosts the
/// embedding models.
pub struct ClusterClient {
    client: Client,
    base: Url,
    api_key: Option<String>,
    user: Option<String>,
    pass: Option<String>,
}

impl ClusterClient {
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        let base = Url::parse(&config.host).map_err(|e|
            Error::Configuration(format!("invalid cluster host '{}': {}", config.host, e))
        )?;
        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!("cluster host '{}' cannot carry a path", config.host)));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build cluster client: {}", e)))?;

        info!("Initializing cluster client for host: {}", base);

        Ok(Self {
            client,
            base,
            api_key: config.api_key.clone(),
            user: config.user.clone(),
            pass: config.pass.clone(),
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`: the base always accepts path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn build_request(&self, method: Method, url: Url, body: Option<&Value>) -> reqwest::RequestBuilder {
        let mut request_builder = self.client.request(method, url).header(ACCEPT, "application/json");

        let auth_header_value = if let (Some(user), Some(pass)) = (&self.user, &self.pass) {
            if !user.is_empty() && !pass.is_empty() {
                Some(format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass))))
            } else {
                warn!("Cluster basic auth user or pass provided but empty.");
                None
            }
        } else if let Some(secret) = &self.api_key {
            if !secret.is_empty() {
                Some(format!("ApiKey {}", secret))
            } else {
                warn!("Cluster API key provided but is empty.");
                None
            }
        } else {
            None
        };
        if let Some(auth) = auth_header_value {
            request_builder = request_builder.header(AUTHORIZATION, auth);
        }

        if let Some(b) = body {
            request_builder = request_builder.header(CONTENT_TYPE, "application/json").json(b);
        }
        request_builder
    }

    /// Sends the request and returns status plus raw body, whatever the status.
    async fn send_raw(&self, method: Method, url: Url, body: Option<&Value>) -> Result<(StatusCode, String)> {
        let target = format!("{} {}", method, url.path());
        let response = self.build_request(method, url, body).send().await.map_err(|e| {
            error!("{} failed: {}", target, e);
            Error::from(e)
        })?;
        let status = response.status();
        let text = response.text().await?;
        debug!("{} -> {}: {}", target, status, text);
        Ok((status, text))
    }

    async fn send_json(&self, method: Method, url: Url, body: Option<&Value>) -> Result<(StatusCode, Value)> {
        let target = format!("{} {}", method, url.path());
        let (status, text) = self.send_raw(method, url, body).await?;

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            error!("{} returned {}: {}", target, status, text);
            return Err(Error::cluster_status(status.as_u16(), &text));
        }
        Ok((status, parse_body(&text)?))
    }
}

fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json
        ::from_str(text)
        .map_err(|e| Error::Transport(format!("unparsable cluster response: {}", e).into()))
}

fn acknowledged(body: &Value) -> bool {
    body.get("acknowledged").and_then(Value::as_bool).unwrap_or(false)
}

fn error_type(body: &Value) -> Option<&str> {
    body.get("error").and_then(|e| e.get("type")).and_then(Value::as_str)
}

fn require_found(status: StatusCode, target: &str, body: &Value) -> Result<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(Error::cluster_status(status.as_u16(), &format!("{} not found: {}", target, body)));
    }
    Ok(())
}

#[async_trait]
impl IndexAdmin for ClusterClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.endpoint(&[index]);
        let status = self.build_request(Method::HEAD, url, None).send().await?.status();
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(Error::cluster_status(other.as_u16(), "index existence check failed")),
        }
    }

    async fn create_index(&self, index: &str, settings: &Value, mapping: &Value) -> Result<CreateIndexOutcome> {
        let body = json!({ "settings": settings, "mappings": mapping });
        let (status, text) = self.send_raw(Method::PUT, self.endpoint(&[index]), Some(&body)).await?;

        if status.is_success() {
            return Ok(match acknowledged(&parse_body(&text)?) {
                true => CreateIndexOutcome::Acknowledged,
                false => CreateIndexOutcome::NotAcknowledged,
            });
        }
        if status == StatusCode::BAD_REQUEST {
            if let Ok(response) = serde_json::from_str::<Value>(&text) {
                if error_type(&response) == Some(ALREADY_EXISTS) {
                    debug!("Index '{}' already exists", index);
                    return Ok(CreateIndexOutcome::AlreadyExists);
                }
            }
        }
        error!("Creating '{}' returned {}: {}", index, status, text);
        Err(Error::cluster_status(status.as_u16(), &text))
    }

    async fn get_mapping(&self, index: &str) -> Result<Option<Value>> {
        let url = self.endpoint(&[index, "_mapping"]);
        let (status, response) = self.send_json(Method::GET, url, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        // Keyed by concrete index name, which may differ from `index` behind an alias.
        let mappings = response
            .get(index)
            .or_else(|| response.as_object().and_then(|o| o.values().next()))
            .and_then(|entry| entry.get("mappings"))
            .cloned();
        Ok(Some(mappings.unwrap_or_else(|| json!({}))))
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<bool> {
        let url = self.endpoint(&[index, "_mapping"]);
        let (status, response) = self.send_json(Method::PUT, url, Some(mapping)).await?;
        require_found(status, index, &response)?;
        Ok(acknowledged(&response))
    }
}

#[async_trait]
impl EmbeddingModel for ClusterClient {
    async fn predict(&self, model_id: &str, texts: &[&str]) -> Result<ModelTensorOutput> {
        let url = self.endpoint(&["_plugins", "_ml", "_predict", "text_embedding", model_id]);
        let body =
            json!({
            "text_docs": texts,
            "return_number": true,
            "target_response": ["sentence_embedding"]
        });
        let (status, response) = self.send_json(Method::POST, url, Some(&body)).await?;
        require_found(status, model_id, &response)?;
        serde_json
            ::from_value(response)
            .map_err(|e| Error::Invocation(format!("unexpected predict response for '{}': {}", model_id, e)))
    }
}

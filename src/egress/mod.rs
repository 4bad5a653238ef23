pub mod address;
pub mod target;
use log::{ info, warn };
use reqwest::dns::{ Addrs, Name, Resolve, Resolving };
use reqwest::redirect::Policy;
use reqwest::{ Client, ClientBuilder, Method, Request, RequestBuilder, Response };
use serde::Serialize;
use std::net::{ IpAddr, SocketAddr };
use std::sync::Arc;
use std::time::Duration;

use crate::config::EgressConfig;
use crate::error::{ self, BoxError, Error, Result };

pub use target::EgressTarget;

/// Owns the one pooled client used for every call to an externally
/// configured endpoint.
///
/// Targets are checked twice: the URL (scheme, port, IP literal) before a
/// request is built, and every hostname inside the client's DNS resolver, so
/// a connection can never be opened to an address that was not checked.
/// Redirects are never followed.
pub struct EgressGuard {
    client: EgressClient,
}

impl EgressGuard {
    pub fn new(config: &EgressConfig) -> Result<Self> {
        Self::build(config, Arc::new(GuardedResolver))
    }

    fn build<R: Resolve + 'static>(config: &EgressConfig, resolver: Arc<R>) -> Result<Self> {
        let client = client_builder(config)
            .dns_resolver(resolver)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build egress client: {}", e)))?;

        info!(
            "Egress client ready (connect timeout {:?}, request timeout {:?}, max idle per host {})",
            config.connect_timeout(),
            config.request_timeout(),
            config.pool_max_idle_per_host
        );
        Ok(Self {
            client: EgressClient { inner: client },
        })
    }

    /// Handle onto the shared connection pool.
    pub fn shared_client(&self) -> EgressClient {
        self.client.clone()
    }
}

fn client_builder(config: &EgressConfig) -> ClientBuilder {
    let mut builder = Client::builder()
        .redirect(Policy::none())
        // A proxy would resolve the target on our behalf, out of the resolver's reach.
        .no_proxy()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .pool_idle_timeout(config.pool_idle_timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host);
    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent.clone());
    }
    builder
}

struct GuardedResolver;

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolve_public(&host).await.map_err(|e| -> BoxError { Box::new(e) })?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

/// Resolves `host` and fails closed if any returned address is private.
pub async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net
        ::lookup_host((host, 0))
        .await
        .map_err(|e| Error::Transport(Box::new(e)))?
        .collect();

    if addrs.is_empty() {
        return Err(Error::Transport(format!("no addresses found for '{}'", host).into()));
    }

    let ips: Vec<IpAddr> = addrs.iter().map(SocketAddr::ip).collect();
    if address::has_private_address(&ips) {
        warn!("Refusing egress to '{}': resolves to a private address ({:?})", host, ips);
        return Err(Error::Validation(format!("host '{}' resolves to a private address", host)));
    }
    Ok(addrs)
}

/// Cheap handle onto the guarded client. The raw `reqwest::Client` is never
/// handed out.
#[derive(Clone)]
pub struct EgressClient {
    inner: Client,
}

impl EgressClient {
    pub fn request(&self, method: Method, url: &str) -> Result<EgressRequest> {
        let url = target::parse_url(url)?;
        EgressTarget::from_url(&url).validate()?;
        Ok(EgressRequest {
            client: self.clone(),
            builder: self.inner.request(method, url),
        })
    }

    pub fn get(&self, url: &str) -> Result<EgressRequest> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<EgressRequest> {
        self.request(Method::POST, url)
    }

    /// 3xx responses come back untouched.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        EgressTarget::from_url(request.url()).validate()?;
        self.inner.execute(request).await.map_err(send_error)
    }
}

pub struct EgressRequest {
    client: EgressClient,
    builder: RequestBuilder,
}

impl EgressRequest {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.builder = self.builder.bearer_auth(token);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    pub async fn send(self) -> Result<Response> {
        let request = self.builder.build()?;
        self.client.execute(request).await
    }
}

fn send_error(err: reqwest::Error) -> Error {
    error::rejection_in_chain(&err).unwrap_or_else(|| Error::from(err))
}

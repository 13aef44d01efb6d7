use std::fmt;

use reqwest::{Client, Proxy};
use tracing::debug;

use crate::config::{HttpTimeouts, ResolverConfig};
use crate::errors::{ResolveError, Result};
use crate::limiter::QuotaLimiter;

/// Route an outbound request takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Direct,
    Proxy,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Proxy => f.write_str("proxy"),
        }
    }
}

/// HTTP client chosen for one attempt
#[derive(Debug, Clone, Copy)]
pub struct Transport<'a> {
    pub client: &'a Client,
    pub kind: TransportKind,
}

impl Transport<'_> {
    pub fn is_proxy(&self) -> bool {
        self.kind == TransportKind::Proxy
    }
}

/// Picks the direct connection while the quota lasts, the proxy afterwards
#[derive(Debug)]
pub struct TransportSelector {
    direct: Client,
    proxy: Option<Client>,
    limiter: QuotaLimiter,
}

impl TransportSelector {
    pub fn new(direct: Client, proxy: Option<Client>, limiter: QuotaLimiter) -> Self {
        Self {
            direct,
            proxy,
            limiter,
        }
    }

    /// Build both clients from the resolver configuration
    pub fn from_config(config: &ResolverConfig, limiter: QuotaLimiter) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or("craftgate");
        let direct = build_client(&config.http_timeouts, user_agent, None)?;
        let proxy = config
            .proxy
            .as_ref()
            .map(|url| -> Result<Client> {
                let proxy = Proxy::all(url.as_str())?;
                build_client(&config.http_timeouts, user_agent, Some(proxy))
            })
            .transpose()?;

        Ok(Self::new(direct, proxy, limiter))
    }

    /// Choose a transport for a quota-limited request. Never blocks or retries.
    pub fn select(&self) -> Result<Transport<'_>> {
        if self.limiter.try_acquire() {
            return Ok(self.direct());
        }

        debug!("Direct quota consumed, falling back to proxy");
        self.proxy().ok_or(ResolveError::QuotaExhausted)
    }

    /// Direct transport without touching the quota
    pub fn direct(&self) -> Transport<'_> {
        Transport {
            client: &self.direct,
            kind: TransportKind::Direct,
        }
    }

    pub fn proxy(&self) -> Option<Transport<'_>> {
        self.proxy.as_ref().map(|client| Transport {
            client,
            kind: TransportKind::Proxy,
        })
    }

    pub fn has_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    pub fn limiter(&self) -> &QuotaLimiter {
        &self.limiter
    }
}

fn build_client(timeouts: &HttpTimeouts, user_agent: &str, proxy: Option<Proxy>) -> Result<Client> {
    let mut builder = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .user_agent(user_agent);

    builder = match proxy {
        Some(proxy) => builder.proxy(proxy),
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

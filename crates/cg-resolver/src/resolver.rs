use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::cache::{MemoryCache, ProfileCache};
use crate::config::{Endpoints, ResolverConfig};
use crate::errors::{ResolveError, Result};
use crate::limiter::QuotaLimiter;
use crate::models::*;
use crate::name::is_valid_name;
use crate::router::EndpointRouter;
use crate::transport::{Transport, TransportSelector};

/// Read-only lookups of player identities and textures
#[async_trait::async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Resolve a player name to its current profile.
    ///
    /// `Ok(None)` means the provider knows no such player. Negative results
    /// are never cached.
    async fn find_profile(&self, name: &str) -> Result<Option<Profile>>;

    /// Resolve the profile that owned `name` at a point in time
    async fn find_profile_at(&self, name: &str, at: DateTime<Utc>) -> Result<Option<Profile>>;

    /// Resolve many names in one request
    async fn find_profiles(&self, names: &[&str]) -> Result<Vec<Profile>>;

    /// Fetch the name history of a player
    async fn find_names(&self, id: &Uuid) -> Result<Vec<NameChange>>;

    /// Fetch the signed textures property of a player
    async fn download_skin(&self, id: &Uuid) -> Result<Option<SkinProperty>>;
}

/// Session verification and authenticated skin mutations
#[async_trait::async_trait]
pub trait AuthResolver: Send + Sync {
    /// Check whether `username` joined the server identified by `server_hash`.
    ///
    /// `host_ip` enables the provider's anti-proxy check for IPv4 clients.
    async fn has_joined(
        &self,
        username: &str,
        server_hash: &str,
        host_ip: Option<IpAddr>,
    ) -> Result<Option<Verification>>;

    /// Let the provider download a new skin from `source`
    async fn change_skin(
        &self,
        account: &MinecraftAccount,
        source: &Url,
        model: SkinModel,
    ) -> Result<()>;

    /// Upload a PNG skin directly
    async fn change_skin_image(
        &self,
        account: &MinecraftAccount,
        png: &[u8],
        model: SkinModel,
    ) -> Result<()>;

    /// Restore the default skin. Returns whether the provider accepted it.
    async fn reset_skin(&self, account: &MinecraftAccount) -> Result<bool>;
}

/// Resolver backed by the Mojang HTTP APIs
pub struct MojangResolver {
    transports: TransportSelector,
    name_router: EndpointRouter,
    endpoints: Endpoints,
    cache: Arc<dyn ProfileCache>,
    interrupt: Notify,
}

impl MojangResolver {
    /// Create a resolver with an in-memory cache and a wall-clock quota
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let limiter = QuotaLimiter::new(config.effective_max_name_requests(), config.quota_window);
        Self::with_limiter(config, limiter)
    }

    /// Create a resolver around a prebuilt quota limiter
    pub fn with_limiter(config: ResolverConfig, limiter: QuotaLimiter) -> Result<Self> {
        let transports = TransportSelector::from_config(&config, limiter)?;
        let endpoints = config.endpoints.normalized();
        let name_router = EndpointRouter::new(
            endpoints.name_lookup.clone(),
            endpoints.name_lookup_backup.clone(),
        );

        Ok(Self {
            transports,
            name_router,
            endpoints,
            cache: Arc::new(MemoryCache::new()),
            interrupt: Notify::new(),
        })
    }

    /// Replace the cache backend
    pub fn with_cache(mut self, cache: Arc<dyn ProfileCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<dyn ProfileCache> {
        &self.cache
    }

    pub fn name_router(&self) -> &EndpointRouter {
        &self.name_router
    }

    pub fn limiter(&self) -> &QuotaLimiter {
        self.transports.limiter()
    }

    /// Abort every request currently waiting on the provider.
    ///
    /// Name lookups resolve to `Ok(None)`, every other operation fails with
    /// [`ResolveError::Interrupted`]. Later requests are unaffected.
    pub fn interrupt(&self) {
        debug!("Interrupting in-flight requests");
        self.interrupt.notify_waiters();
    }

    /// Send a request and read the whole body, unless interrupted first
    async fn fetch(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let interrupted = self.interrupt.notified();
        let exchange = async {
            let response = request.header(ACCEPT, "application/json").send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, ResolveError>((status, body))
        };

        tokio::select! {
            result = exchange => result,
            _ = interrupted => Err(ResolveError::Interrupted),
        }
    }

    /// Name lookup with at most one fallback attempt: either the proxy after a
    /// quota rejection or the backup endpoint after a deprecation signal.
    async fn lookup_name<'a>(
        &'a self,
        mut transport: Transport<'a>,
        mut endpoint: &'a Url,
        name: &str,
    ) -> Result<Option<Profile>> {
        let mut retried = false;

        loop {
            let url = endpoint.join(name)?;
            debug!(%url, transport = %transport.kind, "Looking up profile");
            let (status, body) = self.fetch(transport.client.get(url)).await?;

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let proxy = match self.transports.proxy() {
                        Some(proxy) if !transport.is_proxy() && !retried => proxy,
                        _ => {
                            warn!(transport = %transport.kind, "Name lookup rate limited");
                            return Err(ResolveError::QuotaExhausted);
                        }
                    };

                    warn!("Name lookup rate limited on direct transport, retrying via proxy");
                    transport = proxy;
                    retried = true;
                }
                StatusCode::FORBIDDEN => {
                    if self.name_router.is_backup(endpoint) {
                        return Err(ResolveError::EndpointExhausted);
                    }

                    self.name_router.mark_deprecated();
                    if retried {
                        return Err(http_error(status, &body));
                    }

                    warn!(%endpoint, "Name lookup endpoint rejected the request, retrying on backup");
                    endpoint = self.name_router.backup();
                    retried = true;
                }
                StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
                status if status.is_success() => {
                    if body.trim().is_empty() {
                        return Ok(None);
                    }

                    let profile: Profile = serde_json::from_str(&body)?;
                    debug!(id = %profile.id, "Resolved profile");
                    self.cache.add(&profile).await;
                    return Ok(Some(profile));
                }
                status => return Err(http_error(status, &body)),
            }
        }
    }

    fn skin_url(&self, id: &Uuid) -> Result<Url> {
        Ok(self
            .endpoints
            .skin
            .join(&format!("{}/skin", mojang_id::to_string(id)))?)
    }
}

#[async_trait::async_trait]
impl ProfileResolver for MojangResolver {
    #[instrument(skip(self))]
    async fn find_profile(&self, name: &str) -> Result<Option<Profile>> {
        if let Some(profile) = self.cache.get_by_name(name).await {
            debug!("Profile cache hit");
            return Ok(Some(profile));
        }

        if !is_valid_name(name) {
            debug!("Skipping lookup of invalid name");
            return Ok(None);
        }

        let transport = self.transports.select()?;
        let endpoint = self.name_router.current_endpoint();

        match self.lookup_name(transport, endpoint, name).await {
            Err(ResolveError::Interrupted) => {
                debug!("Name lookup interrupted, reporting not found");
                Ok(None)
            }
            result => result,
        }
    }

    #[instrument(skip(self))]
    async fn find_profile_at(&self, name: &str, at: DateTime<Utc>) -> Result<Option<Profile>> {
        if let Some(profile) = self.cache.get_by_name(name).await {
            return Ok(Some(profile));
        }

        if !is_valid_name(name) {
            return Ok(None);
        }

        debug!(%at, "Point-in-time lookup requested");
        Err(ResolveError::Unsupported("point-in-time profile lookup"))
    }

    async fn find_profiles(&self, _names: &[&str]) -> Result<Vec<Profile>> {
        Err(ResolveError::Unsupported("bulk profile lookup"))
    }

    async fn find_names(&self, _id: &Uuid) -> Result<Vec<NameChange>> {
        Err(ResolveError::Unsupported("name history lookup"))
    }

    #[instrument(skip(self))]
    async fn download_skin(&self, id: &Uuid) -> Result<Option<SkinProperty>> {
        if let Some(property) = self.cache.get_skin(id).await {
            debug!("Skin cache hit");
            return Ok(Some(property));
        }

        let mut url = self
            .endpoints
            .session
            .join(&format!("profile/{}", mojang_id::to_string(id)))?;
        url.query_pairs_mut().append_pair("unsigned", "false");

        debug!(%url, "Downloading skin");
        let (status, body) = self
            .fetch(self.transports.direct().client.get(url))
            .await?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Skin download rate limited");
                Err(ResolveError::QuotaExhausted)
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                if body.trim().is_empty() {
                    return Ok(None);
                }

                let textures: TexturesResponse = serde_json::from_str(&body)?;
                let property = textures.properties.into_iter().next().ok_or_else(|| {
                    ResolveError::InvalidResponse("Missing textures property".to_string())
                })?;

                self.cache.add_skin(id, &property).await;
                Ok(Some(property))
            }
            status => Err(http_error(status, &body)),
        }
    }
}

#[async_trait::async_trait]
impl AuthResolver for MojangResolver {
    #[instrument(skip(self, server_hash))]
    async fn has_joined(
        &self,
        username: &str,
        server_hash: &str,
        host_ip: Option<IpAddr>,
    ) -> Result<Option<Verification>> {
        let mut url = self.endpoints.session.join("hasJoined")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("username", username)
                .append_pair("serverId", server_hash);

            // The provider's IPv6 check rejects legitimate players, so only
            // IPv4 addresses are forwarded.
            if let Some(IpAddr::V4(ip)) = host_ip {
                query.append_pair("ip", &ip.to_string());
            }
        }

        debug!("Verifying session");
        let (status, body) = self
            .fetch(self.transports.direct().client.get(url))
            .await?;

        match status {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                if body.trim().is_empty() {
                    return Ok(None);
                }
                Ok(Some(serde_json::from_str(&body)?))
            }
            status => Err(http_error(status, &body)),
        }
    }

    #[instrument(skip(self, account), fields(player = %account.profile.name))]
    async fn change_skin(
        &self,
        account: &MinecraftAccount,
        source: &Url,
        model: SkinModel,
    ) -> Result<()> {
        let url = self.skin_url(&account.profile.id)?;
        let payload = ChangeSkinRequest { model, url: source };

        debug!("Changing skin");
        let request = self
            .transports
            .direct()
            .client
            .post(url)
            .bearer_auth(account.access_token.as_str())
            .json(&payload);
        let (status, body) = self.fetch(request).await?;

        if status != StatusCode::OK {
            return Err(http_error(status, &body));
        }
        Ok(())
    }

    async fn change_skin_image(
        &self,
        _account: &MinecraftAccount,
        _png: &[u8],
        _model: SkinModel,
    ) -> Result<()> {
        Err(ResolveError::Unsupported("skin image upload"))
    }

    #[instrument(skip(self, account), fields(player = %account.profile.name))]
    async fn reset_skin(&self, account: &MinecraftAccount) -> Result<bool> {
        let url = self.skin_url(&account.profile.id)?;

        debug!("Resetting skin");
        let request = self
            .transports
            .direct()
            .client
            .delete(url)
            .bearer_auth(account.access_token.as_str());
        let (status, _) = self.fetch(request).await?;

        Ok(matches!(status, StatusCode::OK | StatusCode::NO_CONTENT))
    }
}

impl fmt::Debug for MojangResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MojangResolver")
            .field("transports", &self.transports)
            .field("name_router", &self.name_router)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

fn http_error(status: StatusCode, body: &str) -> ResolveError {
    ResolveError::Http {
        status,
        body_snippet: body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{any, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const NOTCH_ID: &str = "069a79f444e94726a5befca90e38aaf5";
    const PRIMARY: &str = "/users/profiles/minecraft/Notch";
    const BACKUP: &str = "/minecraft/profile/lookup/name/Notch";

    fn notch_id() -> Uuid {
        Uuid::parse_str(NOTCH_ID).unwrap()
    }

    fn notch_json() -> serde_json::Value {
        json!({ "id": "069a79f4-44e9-4726-a5be-fca90e38aaf5", "name": "Notch" })
    }

    fn resolver(server: &MockServer, capacity: u32, proxy: Option<&MockServer>) -> MojangResolver {
        let mut config = ResolverConfig::default()
            .with_endpoints(Endpoints::with_host(&server.uri()).unwrap());
        if let Some(proxy) = proxy {
            config = config.with_proxy(Url::parse(&proxy.uri()).unwrap());
        }

        let limiter = QuotaLimiter::new(capacity, Duration::from_secs(600));
        MojangResolver::with_limiter(config, limiter).unwrap()
    }

    fn account() -> MinecraftAccount {
        MinecraftAccount::new(Profile::new(notch_id(), "Notch"), "access-token", 3600)
    }

    #[tokio::test]
    async fn test_invalid_name_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        for name in ["with space", "x", "ThisNameIsWayTooLong", "../admin"] {
            assert_eq!(resolver.find_profile(name).await.unwrap(), None);
        }
        assert!(server.received_requests().await.unwrap().is_empty());
        assert_eq!(resolver.limiter().remaining(), 10);
    }

    #[tokio::test]
    async fn test_find_profile_caches_positive_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PRIMARY))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let profile = resolver.find_profile("Notch").await.unwrap().unwrap();
        assert_eq!(profile.id, notch_id());
        assert_eq!(profile.name, "Notch");
        assert_eq!(resolver.cache().get_by_name("Notch").await, Some(profile.clone()));

        // Served from cache, the mock expects a single request
        assert_eq!(resolver.find_profile("Notch").await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_no_content_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        assert_eq!(resolver.find_profile("Notch").await.unwrap(), None);
        assert!(resolver.cache().get_by_name("Notch").await.is_none());
        assert_eq!(resolver.find_profile("Notch").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_not_found_and_empty_body_are_empty() {
        let server = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/users/profiles/minecraft/Ghost"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        assert_eq!(resolver.find_profile("Notch").await.unwrap(), None);
        assert_eq!(resolver.find_profile("Ghost").await.unwrap(), None);
        assert!(resolver.cache().get_by_name("Ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_forbidden_switches_to_backup_permanently() {
        let server = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(BACKUP))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/minecraft/profile/lookup/name/jeb_"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let profile = resolver.find_profile("Notch").await.unwrap().unwrap();
        assert_eq!(profile.name, "Notch");
        assert!(resolver.name_router().is_deprecated());

        assert_eq!(resolver.find_profile("jeb_").await.unwrap(), None);
        assert!(
            resolver
                .name_router()
                .is_backup(resolver.name_router().current_endpoint())
        );
    }

    #[tokio::test]
    async fn test_forbidden_on_both_endpoints() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::EndpointExhausted));
        assert!(resolver.name_router().is_deprecated());
    }

    #[tokio::test]
    async fn test_exhausted_quota_without_proxy() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(0)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 0, None);

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::QuotaExhausted));
    }

    #[tokio::test]
    async fn test_exhausted_quota_uses_proxy() {
        let server = MockServer::start().await;
        let proxy = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(1)
            .mount(&proxy)
            .await;
        let resolver = resolver(&server, 0, Some(&proxy));

        let profile = resolver.find_profile("Notch").await.unwrap();
        assert_eq!(profile.map(|p| p.id), Some(notch_id()));
    }

    #[tokio::test]
    async fn test_rate_limited_direct_retries_via_proxy() {
        let server = MockServer::start().await;
        let proxy = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(1)
            .mount(&proxy)
            .await;
        let resolver = resolver(&server, 10, Some(&proxy));

        let profile = resolver.find_profile("Notch").await.unwrap().unwrap();
        assert_eq!(profile.name, "Notch");
    }

    #[tokio::test]
    async fn test_rate_limited_on_proxy_is_terminal() {
        let server = MockServer::start().await;
        let proxy = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&proxy)
            .await;
        let resolver = resolver(&server, 10, Some(&proxy));

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::QuotaExhausted));
    }

    #[tokio::test]
    async fn test_rate_limited_without_proxy() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::QuotaExhausted));
    }

    #[tokio::test]
    async fn test_forbidden_then_rate_limited_stays_direct() {
        let server = MockServer::start().await;
        let proxy = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(BACKUP))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(0)
            .mount(&proxy)
            .await;
        let resolver = resolver(&server, 10, Some(&proxy));

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::QuotaExhausted));
        assert!(resolver.name_router().is_deprecated());
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert!(proxy.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_then_forbidden_skips_backup() {
        let server = MockServer::start().await;
        let proxy = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(403).set_body_string("deprecated"))
            .expect(1)
            .mount(&proxy)
            .await;
        for mock_server in [&server, &proxy] {
            Mock::given(path(BACKUP))
                .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
                .expect(0)
                .mount(mock_server)
                .await;
        }
        let resolver = resolver(&server, 10, Some(&proxy));

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(
            matches!(err, ResolveError::Http { status, .. } if status == StatusCode::FORBIDDEN)
        );
        assert!(resolver.name_router().is_deprecated());
        assert!(
            resolver
                .name_router()
                .is_backup(resolver.name_router().current_endpoint())
        );
    }

    #[tokio::test]
    async fn test_endpoint_without_trailing_slash_keeps_last_segment() {
        let server = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(1)
            .mount(&server)
            .await;
        let endpoints = Endpoints {
            name_lookup: Url::parse(&format!("{}/users/profiles/minecraft", server.uri())).unwrap(),
            skin: Url::parse(&format!("{}/user/profile", server.uri())).unwrap(),
            ..Endpoints::with_host(&server.uri()).unwrap()
        };
        let config = ResolverConfig::default().with_endpoints(endpoints);
        let limiter = QuotaLimiter::new(10, Duration::from_secs(600));
        let resolver = MojangResolver::with_limiter(config, limiter).unwrap();

        let profile = resolver.find_profile("Notch").await.unwrap().unwrap();
        assert_eq!(profile.id, notch_id());
        assert_eq!(
            resolver.skin_url(&notch_id()).unwrap().path(),
            format!("/user/profile/{NOTCH_ID}/skin")
        );
    }

    #[tokio::test]
    async fn test_same_url_for_primary_and_backup() {
        let server = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;
        let endpoints = Endpoints::with_host(&server.uri()).unwrap();
        let endpoints = Endpoints {
            name_lookup_backup: endpoints.name_lookup.clone(),
            ..endpoints
        };
        let config = ResolverConfig::default().with_endpoints(endpoints);
        let limiter = QuotaLimiter::new(10, Duration::from_secs(600));
        let resolver = MojangResolver::with_limiter(config, limiter).unwrap();

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::EndpointExhausted));
        assert!(resolver.name_router().is_deprecated());
    }

    #[tokio::test]
    async fn test_unexpected_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        match resolver.find_profile("Notch").await.unwrap_err() {
            ResolveError::Http {
                status,
                body_snippet,
            } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body_snippet, "upstream broke");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_serde_error() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let err = resolver.find_profile("Notch").await.unwrap_err();
        assert!(matches!(err, ResolveError::Serde(_)));
        assert!(resolver.cache().get_by_name("Notch").await.is_none());
    }

    #[tokio::test]
    async fn test_interrupted_lookup_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(notch_json())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let resolver = Arc::new(resolver(&server, 10, None));

        let lookup = {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.find_profile("Notch").await })
        };
        let skin = {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.download_skin(&notch_id()).await })
        };

        tokio::time::sleep(Duration::from_millis(300)).await;
        resolver.interrupt();

        assert_eq!(lookup.await.unwrap().unwrap(), None);
        assert!(matches!(
            skin.await.unwrap(),
            Err(ResolveError::Interrupted)
        ));
        assert!(resolver.cache().get_by_name("Notch").await.is_none());
    }

    #[tokio::test]
    async fn test_download_skin_caches_first_property() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/session/minecraft/profile/{NOTCH_ID}")))
            .and(query_param("unsigned", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": NOTCH_ID,
                "name": "Notch",
                "properties": [
                    { "name": "textures", "value": "dGV4dHVyZXM=", "signature": "c2lnbmF0dXJl" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let property = resolver.download_skin(&notch_id()).await.unwrap().unwrap();
        assert_eq!(property, SkinProperty::new("dGV4dHVyZXM=", "c2lnbmF0dXJl"));

        let cached = resolver.download_skin(&notch_id()).await.unwrap();
        assert_eq!(cached, Some(property));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_download_skin_rate_limited_ignores_proxy() {
        let server = MockServer::start().await;
        let proxy = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&proxy)
            .await;
        let resolver = resolver(&server, 10, Some(&proxy));

        let err = resolver.download_skin(&notch_id()).await.unwrap_err();
        assert!(matches!(err, ResolveError::QuotaExhausted));
    }

    #[tokio::test]
    async fn test_download_skin_no_content() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        assert_eq!(resolver.download_skin(&notch_id()).await.unwrap(), None);
        assert_eq!(resolver.download_skin(&notch_id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_download_skin_without_properties() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": NOTCH_ID, "name": "Notch", "properties": [] })),
            )
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let err = resolver.download_skin(&notch_id()).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_has_joined_forwards_ipv4_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/minecraft/hasJoined"))
            .and(query_param("username", "Notch"))
            .and(query_param("serverId", "-4fc5d6a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .expect(3)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let hosts = [
            Some(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            Some(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            None,
        ];
        for host in hosts {
            let verification = resolver.has_joined("Notch", "-4fc5d6a1", host).await.unwrap();
            assert_eq!(verification.unwrap().id, notch_id());
        }

        let requests = server.received_requests().await.unwrap();
        let ip_params: Vec<Option<String>> = requests
            .iter()
            .map(|request| {
                request
                    .url
                    .query_pairs()
                    .find(|(key, _)| key == "ip")
                    .map(|(_, value)| value.into_owned())
            })
            .collect();
        assert_eq!(ip_params, vec![Some("127.0.0.1".to_string()), None, None]);
    }

    #[tokio::test]
    async fn test_has_joined_not_authenticated() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let verification = resolver.has_joined("Notch", "hash", None).await.unwrap();
        assert!(verification.is_none());
    }

    #[tokio::test]
    async fn test_change_skin_posts_model_and_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/user/profile/{NOTCH_ID}/skin")))
            .and(header("authorization", "Bearer access-token"))
            .and(body_json(json!({
                "model": "slim",
                "url": "https://example.com/skin.png"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let source = Url::parse("https://example.com/skin.png").unwrap();
        resolver
            .change_skin(&account(), &source, SkinModel::Slim)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_skin_requires_ok() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        let source = Url::parse("https://example.com/skin.png").unwrap();
        let err = resolver
            .change_skin(&account(), &source, SkinModel::Classic)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Http { status, .. } if status == StatusCode::NO_CONTENT));
    }

    #[tokio::test]
    async fn test_reset_skin() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/user/profile/{NOTCH_ID}/skin")))
            .and(header("authorization", "Bearer access-token"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);
        assert!(resolver.reset_skin(&account()).await.unwrap());

        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let resolver = self::resolver(&server, 10, None);
        assert!(!resolver.reset_skin(&account()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let resolver = resolver(&server, 10, None);

        assert!(matches!(
            resolver.find_profiles(&["Notch", "jeb_"]).await,
            Err(ResolveError::Unsupported(_))
        ));
        assert!(matches!(
            resolver.find_names(&notch_id()).await,
            Err(ResolveError::Unsupported(_))
        ));
        assert!(matches!(
            resolver.find_profile_at("Notch", Utc::now()).await,
            Err(ResolveError::Unsupported(_))
        ));
        assert!(matches!(
            resolver
                .change_skin_image(&account(), &[0x89, b'P', b'N', b'G'], SkinModel::Classic)
                .await,
            Err(ResolveError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_point_in_time_lookup_answers_from_cache() {
        let server = MockServer::start().await;
        let resolver = resolver(&server, 10, None);
        let profile = Profile::new(notch_id(), "Notch");
        resolver.cache().add(&profile).await;

        let found = resolver.find_profile_at("Notch", Utc::now()).await.unwrap();
        assert_eq!(found, Some(profile));
        assert_eq!(resolver.find_profile_at("bad name", Utc::now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolver_as_capability_objects() {
        let server = MockServer::start().await;
        Mock::given(path(PRIMARY))
            .respond_with(ResponseTemplate::new(200).set_body_json(notch_json()))
            .mount(&server)
            .await;
        let resolver = Arc::new(resolver(&server, 10, None));

        let profiles: Arc<dyn ProfileResolver> = resolver.clone();
        let _auth: Arc<dyn AuthResolver> = resolver;
        assert!(profiles.find_profile("Notch").await.unwrap().is_some());
    }
}

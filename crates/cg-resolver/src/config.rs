use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Result;

/// Mojang API endpoints
pub mod endpoints {
    pub const NAME_LOOKUP: &str = "https://api.mojang.com/users/profiles/minecraft/";
    pub const NAME_LOOKUP_BACKUP: &str =
        "https://api.minecraftservices.com/minecraft/profile/lookup/name/";
    pub const SESSION: &str = "https://sessionserver.mojang.com/session/minecraft/";
    pub const SKIN: &str = "https://api.mojang.com/user/profile/";
}

/// Published cap of direct name->UUID lookups per quota window
pub const PROVIDER_NAME_QUOTA: u32 = 600;

/// Length of the provider's quota window
pub const PROVIDER_QUOTA_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Base URLs of every provider endpoint family.
///
/// Path segments are joined onto each base, so bases are kept ending in `/`;
/// see [`Endpoints::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub name_lookup: Url,
    pub name_lookup_backup: Url,
    pub session: Url,
    pub skin: Url,
}

impl Endpoints {
    /// Point every endpoint family at one host, keeping the production paths.
    ///
    /// Used to redirect the resolver at a mirror or a mock server.
    pub fn with_host(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/');
        Ok(Self {
            name_lookup: Url::parse(&format!("{base}/users/profiles/minecraft/"))?,
            name_lookup_backup: Url::parse(&format!("{base}/minecraft/profile/lookup/name/"))?,
            session: Url::parse(&format!("{base}/session/minecraft/"))?,
            skin: Url::parse(&format!("{base}/user/profile/"))?,
        }
        .normalized())
    }

    /// Append the missing trailing `/` to every base.
    ///
    /// Without it `Url::join` replaces the last path segment, so
    /// `.../users/profiles/minecraft` joined with `Notch` would request
    /// `.../users/profiles/Notch`.
    pub fn normalized(self) -> Self {
        Self {
            name_lookup: with_trailing_slash(self.name_lookup),
            name_lookup_backup: with_trailing_slash(self.name_lookup_backup),
            session: with_trailing_slash(self.session),
            skin: with_trailing_slash(self.skin),
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            name_lookup: Url::parse(endpoints::NAME_LOOKUP).expect("valid name lookup URL"),
            name_lookup_backup: Url::parse(endpoints::NAME_LOOKUP_BACKUP)
                .expect("valid backup name lookup URL"),
            session: Url::parse(endpoints::SESSION).expect("valid session URL"),
            skin: Url::parse(endpoints::SKIN).expect("valid skin URL"),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTimeouts {
    #[serde(with = "duration_secs")]
    pub connect: Duration,
    #[serde(with = "duration_secs")]
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(10),
        }
    }
}

/// Configuration for MojangResolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Direct name->UUID lookups allowed per window before switching to the proxy
    pub max_name_requests: u32,

    /// Length of the quota window
    #[serde(with = "duration_secs")]
    pub quota_window: Duration,

    /// Proxy used once the direct quota is consumed
    pub proxy: Option<Url>,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,

    /// Provider base URLs
    pub endpoints: Endpoints,
}

impl ResolverConfig {
    /// Direct quota actually enforced, floored at the provider cap
    pub fn effective_max_name_requests(&self) -> u32 {
        self.max_name_requests.max(PROVIDER_NAME_QUOTA)
    }

    pub fn with_proxy(mut self, proxy: Url) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_name_requests: PROVIDER_NAME_QUOTA,
            quota_window: PROVIDER_QUOTA_WINDOW,
            proxy: None,
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("craftgate".to_string()),
            endpoints: Endpoints::default(),
        }
    }
}

/// Durations as whole seconds, the unit used in config files
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

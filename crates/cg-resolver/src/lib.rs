//! Minecraft identity resolution against the Mojang HTTP APIs
//!
//! This crate answers name to UUID lookups, downloads signed skin properties,
//! verifies server joins and mutates skins of an authenticated account, while
//! staying inside the provider's request quota.
//!
//! # Request Orchestration
//!
//! Every name lookup goes through the same steps:
//!
//! 1. Answer from the cache, or drop names that can never exist upstream
//! 2. Pick a transport: direct while the quota window has tokens, the proxy afterwards
//! 3. Pick the endpoint: primary until the provider answers 403 once, backup forever after
//! 4. Classify the response: retry once via proxy on 429, once on the backup on 403
//! 5. Cache positive results only; "not found" stays retryable
//!
//! # Example
//!
//! ```no_run
//! use cg_resolver::{MojangResolver, ProfileResolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = MojangResolver::new(ResolverConfig::default())?;
//!
//!     match resolver.find_profile("Notch").await? {
//!         Some(profile) => println!("{} is {}", profile.name, profile.id),
//!         None => println!("No such player"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Caching
//!
//! The resolver consults a [`ProfileCache`] before any network access. The
//! default [`MemoryCache`] keeps entries for the life of the process; names
//! can be rebound, so long running services should prefer
//! [`MemoryCache::with_expiry`]:
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cg_resolver::{MemoryCache, MojangResolver, ResolverConfig};
//!
//! # fn example() -> cg_resolver::Result<()> {
//! let cache = Arc::new(MemoryCache::with_expiry(Duration::from_secs(3600)));
//! let resolver = MojangResolver::new(ResolverConfig::default())?.with_cache(cache);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Important Notes
//!
//! - The direct quota is floored at the provider cap of 600 lookups per 10 minutes
//! - Configure a proxy to keep resolving names once the quota is spent
//! - Access tokens are never logged

pub mod cache;
pub mod codec;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod models;
pub mod name;
pub mod resolver;
pub mod router;
pub mod transport;

// Re-export main types
pub use cache::{MemoryCache, ProfileCache};
pub use codec::{decode_skin, encode_skin};
pub use config::{Endpoints, HttpTimeouts, ResolverConfig};
pub use errors::{ResolveError, Result};
pub use limiter::{Clock, ManualClock, QuotaLimiter, SystemClock};
pub use models::{
    MinecraftAccount, NameChange, Profile, Skin, SkinModel, SkinProperty, Verification,
};
pub use name::is_valid_name;
pub use resolver::{AuthResolver, MojangResolver, ProfileResolver};
pub use router::EndpointRouter;
pub use transport::{Transport, TransportKind, TransportSelector};

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;
use url::Url;

/// One-way switch from a primary to a backup endpoint.
///
/// Once [`EndpointRouter::mark_deprecated`] has been called the router stays on
/// the backup for the rest of its life, even if the backup fails as well.
#[derive(Debug)]
pub struct EndpointRouter {
    primary: Url,
    backup: Url,
    deprecated: AtomicBool,
}

impl EndpointRouter {
    pub fn new(primary: Url, backup: Url) -> Self {
        Self {
            primary,
            backup,
            deprecated: AtomicBool::new(false),
        }
    }

    pub fn current_endpoint(&self) -> &Url {
        if self.is_deprecated() {
            &self.backup
        } else {
            &self.primary
        }
    }

    /// Switch to the backup endpoint.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn mark_deprecated(&self) -> bool {
        let switched = self
            .deprecated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if switched {
            info!(
                "Endpoint {} is deprecated, switching to {} permanently",
                self.primary, self.backup
            );
        }
        switched
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated.load(Ordering::Acquire)
    }

    /// Whether `endpoint` was handed out as the backup.
    ///
    /// Always `false` before the switch, so a backup configured with the
    /// primary's URL still gets its one fallback attempt.
    pub fn is_backup(&self, endpoint: &Url) -> bool {
        self.is_deprecated() && endpoint == &self.backup
    }

    pub fn backup(&self) -> &Url {
        &self.backup
    }
}

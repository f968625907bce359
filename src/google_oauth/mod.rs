pub mod authorization;
pub mod endpoints;
pub mod refresh;

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use authorization::{AuthorizationFlow, AuthorizationStart};
pub use endpoints::GoogleOauthEndpoints;
pub use refresh::{TokenRefreshManager, ValidAccessToken};

/// Injectable wall clock; tests swap in a fixed instant.
pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub(crate) fn system_now() -> NowProvider {
    Arc::new(Utc::now)
}

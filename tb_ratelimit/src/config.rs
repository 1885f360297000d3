use serde::Deserialize;

use crate::limiter::LockPolicy;

/// Limiter settings as they appear in a config file
///
/// ```toml
/// rate_per_second = 5.0
/// burst = 10
/// lock_policy = "hold_across_sleep"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LimiterConfig {
    /// Tokens generated per second
    pub rate_per_second: f64,

    /// Bucket capacity
    pub burst: u32,

    #[serde(default)]
    pub lock_policy: LockPolicy,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self { rate_per_second: 5.0, burst: 10, lock_policy: LockPolicy::HoldAcrossSleep }
    }
}

use std::time::Duration;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_ACTIVATION_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    activation_ttl_seconds: u64,
    bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    /// Sessions last one hour, activation links one day, bcrypt at its
    /// default cost.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            activation_ttl_seconds: DEFAULT_ACTIVATION_TTL_SECONDS,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_activation_ttl_seconds(mut self, seconds: u64) -> Self {
        self.activation_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn activation_ttl(&self) -> Duration {
        Duration::from_secs(self.activation_ttl_seconds)
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
        assert_eq!(config.activation_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.bcrypt_cost(), bcrypt::DEFAULT_COST);
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new()
            .with_session_ttl_seconds(60)
            .with_activation_ttl_seconds(120)
            .with_bcrypt_cost(4);
        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert_eq!(config.activation_ttl(), Duration::from_secs(120));
        assert_eq!(config.bcrypt_cost(), 4);
    }
}

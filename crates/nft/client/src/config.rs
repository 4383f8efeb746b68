//! Call layer configuration.

use std::env;

/// Reconnects allowed per logical call unless configured otherwise.
pub const DEFAULT_MAX_RECONNECT_COUNT: u32 = 3;

/// Immutable settings shared by every call an `NftClient` makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallSettings {
    /// Reconnects allowed per logical call. Zero means one attempt, no reconnect.
    pub max_reconnect_count: u32,
}

impl CallSettings {
    pub const fn new(max_reconnect_count: u32) -> Self {
        Self {
            max_reconnect_count,
        }
    }

    /// Construct settings from process environment variables.
    ///
    /// Environment variables:
    /// - `NFT_MAX_RECONNECT_COUNT` - Reconnects per call (default: 3)
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(count) = read_env::<u32>("NFT_MAX_RECONNECT_COUNT") {
            settings.max_reconnect_count = count;
        }

        settings
    }

    /// Set the reconnect bound.
    pub fn with_max_reconnect_count(mut self, count: u32) -> Self {
        self.max_reconnect_count = count;
        self
    }
}

impl Default for CallSettings {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECONNECT_COUNT)
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_builder() {
        assert_eq!(
            CallSettings::default().max_reconnect_count,
            DEFAULT_MAX_RECONNECT_COUNT
        );
        assert_eq!(
            CallSettings::default()
                .with_max_reconnect_count(0)
                .max_reconnect_count,
            0
        );
    }

    #[test]
    fn test_read_env_ignores_garbage() {
        // SAFETY: the variable is unique to this test.
        unsafe { env::set_var("NFT_TEST_READ_ENV_GARBAGE", "many") };
        assert_eq!(read_env::<u32>("NFT_TEST_READ_ENV_GARBAGE"), None);

        unsafe { env::set_var("NFT_TEST_READ_ENV_GARBAGE", "7") };
        assert_eq!(read_env::<u32>("NFT_TEST_READ_ENV_GARBAGE"), Some(7));
    }
}

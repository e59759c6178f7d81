//! API key lookup for the remote synthesis endpoints.
//!
//! The environment variable takes precedence so headless deployments never
//! touch the OS keyring.

const SERVICE: &str = "announcer";
const API_KEY: &str = "remote_api_key";
const API_KEY_ENV: &str = "ANNOUNCER_API_KEY";

/// Resolve the API key, or `None` when neither source has one. Keyring
/// failures are logged and treated as "no key".
pub fn api_key() -> Option<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            return Some(key);
        }
    }
    match keyring_get(API_KEY) {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!(error = %e, "keyring unavailable, continuing without api key");
            None
        }
    }
}

/// Store the API key in the OS keyring.
pub fn set_api_key(value: &str) -> Result<(), keyring::Error> {
    keyring::Entry::new(SERVICE, API_KEY)?.set_password(value)
}

/// Remove the stored API key. Removing a missing key is not an error.
pub fn clear_api_key() -> Result<(), keyring::Error> {
    match keyring::Entry::new(SERVICE, API_KEY)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e),
    }
}

fn keyring_get(key: &str) -> Result<Option<String>, keyring::Error> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    match entry.get_password() {
        Ok(pw) => Ok(Some(pw)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e),
    }
}

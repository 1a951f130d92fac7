use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Application-level constants
pub const APP_NAME: &str = "Dosewise";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    "info,dosewise=debug".to_string()
}

/// Initialize tracing with the env filter (RUST_LOG wins over the default)
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .try_init()
        .ok();
}

/// Get the application data directory
/// ~/Dosewise/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Dosewise")
}

/// Get the cache directory for synthesized speech files
pub fn audio_cache_dir() -> PathBuf {
    app_data_dir().join("audio-cache")
}

/// Base URL of the reasoning service (OpenAI-compatible Responses API)
pub fn reasoning_base_url() -> String {
    std::env::var("DOSEWISE_REASONING_URL")
        .unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Base URL of the speech synthesis service
pub fn speech_base_url() -> String {
    std::env::var("DOSEWISE_SPEECH_URL")
        .unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// API key for both services. Empty string when unset — the HTTP clients
/// surface the resulting 401 like any other failed call.
pub fn api_key() -> String {
    std::env::var("OPENAI_API_KEY").unwrap_or_default()
}

/// Model used for per-cohort advisory calls (cheap, research-enabled)
pub fn fast_model() -> String {
    std::env::var("DOSEWISE_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

/// Model used for the final synthesis call (higher reasoning tier)
pub fn deep_model() -> String {
    std::env::var("DOSEWISE_DEEP_MODEL").unwrap_or_else(|_| "o4-mini".to_string())
}

/// Speech synthesis model
pub fn speech_model() -> String {
    std::env::var("DOSEWISE_SPEECH_MODEL").unwrap_or_else(|_| "tts-1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Dosewise"));
    }

    #[test]
    fn audio_cache_dir_under_app_data() {
        let cache = audio_cache_dir();
        let app = app_data_dir();
        assert!(cache.starts_with(app));
        assert!(cache.ends_with("audio-cache"));
    }

    #[test]
    fn app_name_is_dosewise() {
        assert_eq!(APP_NAME, "Dosewise");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }

    #[test]
    fn default_log_filter_includes_crate() {
        assert!(default_log_filter().contains("dosewise"));
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Palaver";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP API.
pub const DEFAULT_BIND: &str = "127.0.0.1:8484";

/// Get the application data directory (~/.palaver/)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(".palaver")
}

/// Path to the SQLite database file.
/// Overridable via PALAVER_DB for containerized deployments.
pub fn database_path() -> PathBuf {
    match std::env::var("PALAVER_DB") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("palaver.db"),
    }
}

/// Bind address for the HTTP server, from PALAVER_BIND.
/// Falls back to the default when unset or unparseable.
pub fn bind_addr() -> SocketAddr {
    std::env::var("PALAVER_BIND")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| DEFAULT_BIND.parse().expect("default bind address is valid"))
}

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    "info,palaver=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(".palaver"));
    }

    #[test]
    fn default_bind_parses() {
        let addr: SocketAddr = DEFAULT_BIND.parse().unwrap();
        assert_eq!(addr.port(), 8484);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}

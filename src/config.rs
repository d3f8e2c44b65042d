use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Colloquy";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for the local relay server. Override with COLLOQUY_PORT.
pub const DEFAULT_RELAY_PORT: u16 = 7850;

/// Get the application data directory
/// ~/.colloquy/ on all platforms (conversations database, credential file)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(".colloquy")
}

/// Path of the conversations database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("conversations.db")
}

/// Path of the credential file (API key, stored separately from chat data).
pub fn credential_path() -> PathBuf {
    app_data_dir().join("credential.json")
}

/// Address the relay server binds to. Loopback only — the relay carries the
/// user's API key in transit and must not be reachable from the network.
pub fn relay_bind_addr() -> SocketAddr {
    let port = std::env::var("COLLOQUY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_RELAY_PORT);
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,colloquy=debug"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(".colloquy"));
    }

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("conversations.db"));
    }

    #[test]
    fn credential_path_is_separate_from_database() {
        assert_ne!(credential_path(), database_path());
    }

    #[test]
    fn relay_binds_loopback() {
        let addr = relay_bind_addr();
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn app_name_is_colloquy() {
        assert_eq!(APP_NAME, "Colloquy");
    }
}

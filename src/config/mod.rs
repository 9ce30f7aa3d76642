use std::env;
use std::net::{IpAddr, Ipv4Addr};

pub struct Config {
    pub server: ServerConfig,
    pub admin: AdminConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed to reach the HTTP admin surface cross-origin
    pub allowed_origin: String,
}

#[derive(Clone)]
pub struct AdminConfig {
    email: Option<String>,
    password: Option<String>,
}

impl AdminConfig {
    pub fn new(email: Option<String>, password: Option<String>) -> Self {
        Self { email, password }
    }

    /// Plain equality check against the configured strings. Unset credentials
    /// never match, so a server started without them cannot issue codes.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        match (&self.email, &self.password) {
            (Some(e), Some(p)) => e == email && p == password,
            _ => false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let admin = AdminConfig {
            email: env::var("ADMIN_EMAIL").ok(),
            password: env::var("ADMIN_PASSWORD").ok(),
        };

        if admin.email.is_none() || admin.password.is_none() {
            tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, admin endpoints will reject all requests");
        }

        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .expect("Invalid SERVER_PORT"),
                allowed_origin: env::var("ALLOWED_ORIGIN")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            admin,
        }
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        // Try to parse as IP address first
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        // Handle common hostnames
        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_host(host: &str, port: u16) -> Config {
        Config {
            server: ServerConfig {
                host: host.to_string(),
                port,
                allowed_origin: "http://localhost:3000".to_string(),
            },
            admin: AdminConfig::new(None, None),
        }
    }

    #[test]
    fn test_parse_localhost() {
        let config = config_with_host("localhost", 5000);
        assert_eq!(config.bind_address(), ([127, 0, 0, 1], 5000));
    }

    #[test]
    fn test_parse_ipv4_address() {
        let config = config_with_host("192.168.1.1", 3000);
        assert_eq!(config.bind_address(), ([192, 168, 1, 1], 3000));
    }

    #[test]
    fn test_parse_all_interfaces() {
        let config = config_with_host("0.0.0.0", 5000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 5000));
    }

    #[test]
    fn test_parse_empty_host() {
        let config = config_with_host("", 5000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 5000));
    }

    #[test]
    fn test_parse_invalid_hostname_defaults_to_all() {
        let config = config_with_host("invalid-hostname", 9000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 9000));
    }

    #[test]
    fn test_unset_admin_credentials_never_match() {
        let admin = AdminConfig::new(None, None);
        assert!(!admin.matches("", ""));
        assert!(!admin.matches("admin@example.com", "secret"));
    }

    #[test]
    fn test_admin_credentials_exact_match() {
        let admin = AdminConfig::new(
            Some("admin@example.com".to_string()),
            Some("secret".to_string()),
        );
        assert!(admin.matches("admin@example.com", "secret"));
        assert!(!admin.matches("admin@example.com", "wrong"));
        assert!(!admin.matches("other@example.com", "secret"));
    }
}

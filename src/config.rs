use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub admin: AdminSeed,
    pub seed_demo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub email: String,
}

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/salonbook.db";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .and_then(|value| value.parse().ok())
            .unwrap_or(8080);
        let max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|value| value.parse().ok())
            .filter(|value| *value > 0)
            .unwrap_or(5);
        let seed_demo = lookup("SEED_DEMO")
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let admin = AdminSeed {
            username: lookup("ADMIN_USER").unwrap_or_else(|| "admin".to_string()),
            password: lookup("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            email: lookup("ADMIN_EMAIL").unwrap_or_else(|| "admin@salonbook.local".to_string()),
        };

        Self {
            database_url,
            host,
            port,
            max_connections,
            admin,
            seed_demo,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AdminSeed {
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.max_connections, 5);
        assert!(!config.seed_demo);
        assert!(config.admin.uses_default_password());
    }

    #[test]
    fn env_values_override_defaults() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "9090"),
            ("DB_MAX_CONNECTIONS", "0"),
            ("SEED_DEMO", "TRUE"),
            ("ADMIN_PASSWORD", "s3cret"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 9090);
        assert_eq!(config.max_connections, 5);
        assert!(config.seed_demo);
        assert!(!config.admin.uses_default_password());
    }
}

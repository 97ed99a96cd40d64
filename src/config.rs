use std::env;

use anyhow::{Context, anyhow};
use sqlx::postgres::PgConnectOptions;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
}

/// Where the datastore lives. `DATABASE_URL` wins; otherwise the
/// connection is assembled from the individual `DB_*` variables.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    Url {
        url: String,
        max_connections: u32,
    },
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
        max_connections: u32,
    },
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        match self {
            DatabaseConfig::Url { url, .. } => url
                .parse::<PgConnectOptions>()
                .context("DATABASE_URL is not a valid postgres connection string"),
            DatabaseConfig::Parts {
                host,
                port,
                user,
                password,
                name,
                ..
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(name)),
        }
    }

    pub fn max_connections(&self) -> u32 {
        match self {
            DatabaseConfig::Url {
                max_connections, ..
            }
            | DatabaseConfig::Parts {
                max_connections, ..
            } => *max_connections,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10_u32)?;

        let database = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => DatabaseConfig::Url {
                url,
                max_connections,
            },
            None => DatabaseConfig::Parts {
                host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&lookup, "DB_PORT", 5432_u16)?,
                user: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                name: lookup("DB_NAME").unwrap_or_else(|| "postgres".to_string()),
                max_connections,
            },
        };

        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "APP_PORT", 3000_u16)?;
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET is not set"))?;

        Ok(Self {
            database,
            host,
            port,
            jwt_secret,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn database_url_takes_precedence_over_parts() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://shop:secret@db:5432/shop"),
            ("DB_HOST", "ignored"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        match &config.database {
            DatabaseConfig::Url { url, .. } => {
                assert_eq!(url, "postgres://shop:secret@db:5432/shop")
            }
            other => panic!("expected url config, got {other:?}"),
        }
        assert!(config.database.connect_options().is_ok());
    }

    #[test]
    fn parts_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DB_USER", "shop"),
            ("DB_NAME", "shop_db"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        match &config.database {
            DatabaseConfig::Parts {
                host,
                port,
                user,
                password,
                name,
                max_connections,
            } => {
                assert_eq!(host, "localhost");
                assert_eq!(*port, 5432);
                assert_eq!(user, "shop");
                assert_eq!(password, "");
                assert_eq!(name, "shop_db");
                assert_eq!(*max_connections, 10);
            }
            other => panic!("expected parts config, got {other:?}"),
        }
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("DB_PORT", "not-a-port"),
            ("JWT_SECRET", "s3cret"),
        ]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("DB_PORT"), "unexpected error: {err}");
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("DB_NAME", "shop")]));
        assert!(result.is_err());
    }
}

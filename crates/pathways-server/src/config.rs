//! Server configuration from the environment.
//!
//! | var | default |
//! |-----|---------|
//! | `DATABASE_URL` | `postgresql://localhost:5432/pathways` |
//! | `DATABASE_POOL_SIZE` | `10` |
//! | `PATHWAYS_BIND_ADDR` | `0.0.0.0:3000` |
//! | `PATHWAYS_PREFIX` | `/pathways` |
//! | `PATHWAYS_TOPICS_POLICY` | `append` |
//! | `PATHWAYS_OFFER_GROUPS_POLICY` | `replace` |
//! | `PATHWAYS_DATAFIELD_JOIN_TABLE` | `pathways_datafields` |
//! | `PATHWAYS_DATAFIELD_JOIN_COLUMN` | `pathway_id` |

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use pathways_core::{JoinTable, LinkPolicy, ReconcilePolicy};
use pathways_postgres::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
    pub prefix: String,
    pub policy: ReconcilePolicy,
    pub topics_join: JoinTable,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults; set but
    /// invalid values are errors.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| DatabaseConfig::DEFAULT_URL.to_string());
        let pool_size = match get("DATABASE_POOL_SIZE") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("invalid DATABASE_POOL_SIZE '{raw}'"))?,
            None => 10,
        };

        let bind_addr = get("PATHWAYS_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("invalid PATHWAYS_BIND_ADDR '{bind_addr}'"))?;

        let prefix = get("PATHWAYS_PREFIX").unwrap_or_else(|| "/pathways".into());
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            bail!("invalid PATHWAYS_PREFIX '{prefix}': expected '/name' without trailing slash");
        }

        let defaults = ReconcilePolicy::default();
        let policy = ReconcilePolicy {
            data_fields: parse_policy(&get, "PATHWAYS_TOPICS_POLICY", defaults.data_fields)?,
            offer_groups: parse_policy(
                &get,
                "PATHWAYS_OFFER_GROUPS_POLICY",
                defaults.offer_groups,
            )?,
        };

        let topics_join = JoinTable::new(
            get("PATHWAYS_DATAFIELD_JOIN_TABLE").unwrap_or_else(|| "pathways_datafields".into()),
            get("PATHWAYS_DATAFIELD_JOIN_COLUMN").unwrap_or_else(|| "pathway_id".into()),
        )
        .context("invalid datafield join relation")?;

        Ok(Self {
            database: DatabaseConfig::new(database_url, pool_size),
            bind_addr,
            prefix,
            policy,
            topics_join,
        })
    }
}

fn parse_policy(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: LinkPolicy,
) -> Result<LinkPolicy> {
    match get(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.database.database_url, "postgresql://localhost:5432/pathways");
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.prefix, "/pathways");
        assert_eq!(cfg.policy.data_fields, LinkPolicy::Append);
        assert_eq!(cfg.policy.offer_groups, LinkPolicy::Replace);
        assert_eq!(cfg.topics_join, JoinTable::pathways_datafields());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("DATABASE_POOL_SIZE", "3"),
            ("PATHWAYS_BIND_ADDR", "127.0.0.1:8081"),
            ("PATHWAYS_PREFIX", "/api/pathways"),
            ("PATHWAYS_TOPICS_POLICY", "Replace"),
            ("PATHWAYS_DATAFIELD_JOIN_TABLE", "programs_topics"),
            ("PATHWAYS_DATAFIELD_JOIN_COLUMN", "program_id"),
        ])
        .unwrap();
        assert_eq!(cfg.database.max_connections, 3);
        assert_eq!(cfg.bind_addr.port(), 8081);
        assert_eq!(cfg.prefix, "/api/pathways");
        assert_eq!(cfg.policy.data_fields, LinkPolicy::Replace);
        assert_eq!(cfg.topics_join.table(), "programs_topics");
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(config(&[("PATHWAYS_TOPICS_POLICY", "merge")]).is_err());
        assert!(config(&[("DATABASE_POOL_SIZE", "ten")]).is_err());
        assert!(config(&[("PATHWAYS_PREFIX", "pathways")]).is_err());
        assert!(config(&[("PATHWAYS_PREFIX", "/")]).is_err());
        assert!(config(&[("PATHWAYS_DATAFIELD_JOIN_TABLE", "x; drop")]).is_err());
    }
}

//! Storage target descriptors and connection-string parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A parsed connection target for a grid storage backend.
///
/// Targets use the multi-host connection string form
/// `scheme://host1:port1,host2:port2/database?option=value`. The option map
/// participates in cache identity together with the host set and database,
/// see [`CacheKey`](crate::CacheKey).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageTarget {
    /// Connection scheme (e.g. `mongodb`, `grid`)
    pub scheme: String,
    /// Backend addresses as `host` or `host:port`
    pub hosts: Vec<String>,
    /// Database name
    pub database: String,
    /// Username from the connection string, if any
    pub username: Option<String>,
    /// Password from the connection string, if any
    pub password: Option<String>,
    /// Options mapping; scalar or nested-object values
    pub options: Map<String, Value>,
}

impl StorageTarget {
    /// Create a target for a single host with the default `grid` scheme.
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            scheme: "grid".to_string(),
            hosts: vec![host.into()],
            database: database.into(),
            username: None,
            password: None,
            options: Map::new(),
        }
    }

    /// Replace the host list.
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    /// Set a single option value.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Merge `options` into this target, overriding existing keys.
    ///
    /// Used by the engine to fold caller-supplied transport options into the
    /// descriptor so they both reach the driver and participate in cache
    /// identity.
    pub fn merge_options(&mut self, options: &Map<String, Value>) {
        for (key, value) in options {
            self.options.insert(key.clone(), value.clone());
        }
    }

    /// Parse a multi-host connection string.
    ///
    /// Accepted form: `scheme://[user[:pass]@]host1[:port1][,host2]/database[?options]`.
    /// Option values are typed on a best-effort basis: `true`/`false` become
    /// booleans, numeric literals become numbers, everything else stays a
    /// string. A bare key with no `=` is treated as a `true` flag.
    pub fn parse(input: &str) -> Result<Self> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| Error::invalid_target(input, "missing '://' scheme separator"))?;
        if scheme.is_empty() {
            return Err(Error::invalid_target(input, "empty scheme"));
        }

        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| Error::invalid_target(input, "missing database name"))?;

        let (credentials, host_list) = match authority.rsplit_once('@') {
            Some((credentials, hosts)) => (Some(credentials), hosts),
            None => (None, authority),
        };

        let (username, password) = match credentials {
            Some(credentials) => match credentials.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(credentials.to_string()), None),
            },
            None => (None, None),
        };

        let hosts: Vec<String> = host_list
            .split(',')
            .map(|host| host.trim().to_string())
            .collect();
        if hosts.iter().any(|host| host.is_empty()) {
            return Err(Error::invalid_target(input, "empty host in address list"));
        }

        let (database, query) = match path.split_once('?') {
            Some((database, query)) => (database, Some(query)),
            None => (path, None),
        };
        if database.is_empty() {
            return Err(Error::invalid_target(input, "missing database name"));
        }

        let mut options = Map::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|pair| !pair.is_empty()) {
                match pair.split_once('=') {
                    Some((key, value)) => {
                        options.insert(key.to_string(), parse_option_value(value));
                    }
                    None => {
                        options.insert(pair.to_string(), Value::Bool(true));
                    }
                }
            }
        }

        Ok(Self {
            scheme: scheme.to_string(),
            hosts,
            database: database.to_string(),
            username,
            password,
            options,
        })
    }
}

impl std::fmt::Display for StorageTarget {
    /// Renders without credentials so targets are safe to log.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}/{}",
            self.scheme,
            self.hosts.join(","),
            self.database
        )
    }
}

fn parse_option_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(int) = raw.parse::<i64>() {
                Value::Number(int.into())
            } else if let Some(float) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
            {
                Value::Number(float)
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

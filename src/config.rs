//! Configuration loading from TOML.
//!
//! Every key is optional:
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:3000"
//!
//! [context]
//! name = "app"
//!
//! [context.attributes]
//! region = "eu-west-1"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::request::Context;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub context: ContextConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: "0.0.0.0:3000".to_owned() }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        self.addr.parse().map_err(|source| Error::Addr { addr: self.addr.clone(), source })
    }
}

/// The application context every request sees.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { name: "app".to_owned(), attributes: BTreeMap::new() }
    }
}

impl ContextConfig {
    pub fn build(&self) -> Context {
        self.attributes.iter().fold(Context::new(&*self.name), |ctx, (k, v)| ctx.with_attribute(k, v))
    }
}

impl Config {
    pub fn from_toml(input: &str) -> Result<Self, Error> {
        Ok(toml::from_str(input)?)
    }

    /// Reads and parses a TOML file. The listen address is validated here.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        config.server.socket_addr()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.addr, "0.0.0.0:3000");
        assert_eq!(config.context.name, "app");
    }

    #[test]
    fn context_attributes_reach_the_context() {
        let config = Config::from_toml(
            r#"
            [context]
            name = "shop"

            [context.attributes]
            region = "eu"
            "#,
        )
        .unwrap();
        let ctx = config.context.build();
        assert_eq!(ctx.name(), "shop");
        assert_eq!(ctx.attribute("region"), Some("eu"));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(Config::from_toml("[server"), Err(Error::Config(_))));
    }

    #[test]
    fn bad_listen_address_is_reported() {
        let config = Config::from_toml("[server]\naddr = \"nowhere\"").unwrap();
        assert!(matches!(config.server.socket_addr(), Err(Error::Addr { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(Config::load("/definitely/not/here.toml"), Err(Error::Io(_))));
    }
}

//! Server configuration
//!
//! Environment-driven settings for the demo server. The core library never
//! reads the environment itself; everything funnels through here so tests
//! and embedders can construct configs directly.

use std::path::PathBuf;

use crate::error::RoutingResult;
use crate::tenant::{ConnectionDescriptor, RoutingConfig, TenantResolver};

/// Demo server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the server binds, e.g. `0.0.0.0:3000`
    pub bind_addr: String,

    /// Optional YAML routing file; when unset the local demo routes apply
    pub routing_file: Option<PathBuf>,

    /// Directory the embedded client assets are served from
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);

        Self {
            bind_addr: format!("0.0.0.0:{port}"),
            routing_file: std::env::var("QUERYDECK_TENANT_ROUTES")
                .ok()
                .map(PathBuf::from),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    /// Build the tenant resolver for this configuration.
    ///
    /// A configured routing file wins outright. Otherwise the local demo
    /// routes apply, with `DATABASE_URL` taking over the default route when
    /// set, which is how deployments point "everything else" at their real
    /// application database.
    pub fn build_resolver(&self) -> RoutingResult<TenantResolver> {
        if let Some(path) = &self.routing_file {
            return TenantResolver::from_yaml_file(path);
        }

        let mut config = RoutingConfig::local_demo();
        if let Ok(raw) = std::env::var("DATABASE_URL") {
            config.default = ConnectionDescriptor::from_url(&raw)?;
        }
        Ok(TenantResolver::from_config(config))
    }
}

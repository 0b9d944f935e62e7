use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

pub const ENV_PREFIX: &str = "ACCORDION_JSON_LD";
const DEFAULT_FILE: &str = "accordion-json-ld";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Deepest block nesting the walker descends into.
    pub max_depth: usize,
    /// Pretty-print the encoded schema (four-space indent).
    pub pretty: bool,
    pub context_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: crate::parser::extract::DEFAULT_MAX_DEPTH,
            pretty: true,
            context_url: crate::schema::SCHEMA_CONTEXT.to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `accordion-json-ld.toml` (or `path` when given), then
    /// `ACCORDION_JSON_LD_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("max_depth", defaults.max_depth as i64)?
            .set_default("pretty", defaults.pretty)?
            .set_default("context_url", defaults.context_url)?;

        builder = match path {
            Some(p) => builder.add_source(File::from(p).format(FileFormat::Toml).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_FILE).format(FileFormat::Toml).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        debug!(?settings, "settings loaded");
        Ok(settings)
    }
}

//! Configuration load results and documents.
//!
//! A profile load always settles into a [`ConfigResult`]: either a parsed
//! document, a list of diagnostics describing why the load failed, or an
//! interrupted marker when no profile was selected at all.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TillerError;

/// A single diagnostic produced while loading or validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigError {
    /// Fatal errors leave the result without a usable config.
    pub fatal: bool,
    pub message: String,
}

impl ConfigError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            fatal: true,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            fatal: false,
            message: message.into(),
        }
    }
}

impl From<TillerError> for ConfigError {
    fn from(err: TillerError) -> Self {
        Self::fatal(err.to_string())
    }
}

/// Outcome of a configuration load.
///
/// `interrupted = true` means no profile was selected at all, which is
/// distinct from a load that ran and failed (`config = None` with errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResult<T> {
    pub config: Option<T>,
    pub errors: Vec<ConfigError>,
    pub interrupted: bool,
}

impl<T> ConfigResult<T> {
    /// A successful load.
    pub fn ok(config: T) -> Self {
        Self {
            config: Some(config),
            errors: Vec::new(),
            interrupted: false,
        }
    }

    /// A load that ran and failed.
    pub fn failed(error: impl Into<ConfigError>) -> Self {
        Self {
            config: None,
            errors: vec![error.into()],
            interrupted: false,
        }
    }

    /// No profile was selected; nothing was loaded.
    pub fn interrupted() -> Self {
        Self {
            config: None,
            errors: Vec::new(),
            interrupted: true,
        }
    }

    /// Maps the config payload, keeping errors and the interrupted flag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ConfigResult<U> {
        ConfigResult {
            config: self.config.map(f),
            errors: self.errors,
            interrupted: self.interrupted,
        }
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.errors.iter().any(|e| e.fatal)
    }
}

/// A parsed assistant configuration document.
///
/// Schema validation of the document body is out of scope here; the body is
/// carried as raw JSON for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub name: Option<String>,
    pub version: Option<String>,
    pub body: serde_json::Value,
}

impl ConfigDocument {
    /// Parses a raw YAML document.
    ///
    /// `name` and `version` are lifted out of the body when present as
    /// top-level string fields.
    pub fn parse_yaml(raw: &str) -> Result<Self, TillerError> {
        let body: serde_json::Value = serde_yaml::from_str(raw)?;
        let name = body
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let version = body
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(Self {
            name,
            version,
            body,
        })
    }
}

/// An extra context provider threaded into profile loads by the host.
pub trait ContextProvider: Send + Sync {
    /// Display title, used when projecting the config for transport.
    fn title(&self) -> &str;
}

/// A fully loaded configuration, including live provider handles.
///
/// Not serializable; cross-process consumers receive the
/// [`SerializedConfig`] projection instead.
#[derive(Clone)]
pub struct LoadedConfig {
    pub document: ConfigDocument,
    pub context_providers: Vec<Arc<dyn ContextProvider>>,
}

impl LoadedConfig {
    pub fn new(
        document: ConfigDocument,
        context_providers: Vec<Arc<dyn ContextProvider>>,
    ) -> Self {
        Self {
            document,
            context_providers,
        }
    }

    /// Projects into a transport-safe shape: provider handles are reduced to
    /// their titles.
    pub fn serialized(&self) -> SerializedConfig {
        SerializedConfig {
            document: self.document.clone(),
            context_provider_titles: self
                .context_providers
                .iter()
                .map(|p| p.title().to_string())
                .collect(),
        }
    }
}

impl fmt::Debug for LoadedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedConfig")
            .field("document", &self.document)
            .field(
                "context_providers",
                &self
                    .context_providers
                    .iter()
                    .map(|p| p.title())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PartialEq for LoadedConfig {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
            && self
                .context_providers
                .iter()
                .map(|p| p.title())
                .eq(other.context_providers.iter().map(|p| p.title()))
    }
}

/// Transport-safe projection of a [`LoadedConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedConfig {
    pub document: ConfigDocument,
    pub context_provider_titles: Vec<String>,
}

/// A retained record of a degraded data source.
///
/// Adapter and per-organization failures are converted into diagnostics as
/// close to the source as possible instead of aborting a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Which source degraded (adapter name or organization id).
    pub source: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

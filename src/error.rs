use arcstr::ArcStr;
use thiserror::Error;

use crate::tech::Layer;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration for `{generator}`: {message}")]
    Config {
        generator: &'static str,
        message: String,
    },

    #[error("module `{module}` has no port named `{port}`")]
    PortNotFound { module: ArcStr, port: ArcStr },

    #[error("module name `{0}` is claimed by two structurally different modules")]
    DuplicateName(ArcStr),

    #[error("module `{module}` already has an instance named `{inst}`")]
    DuplicateInstance { module: ArcStr, inst: ArcStr },

    #[error("bad connection on instance `{inst}` of `{child}`: {message}")]
    Connection {
        inst: ArcStr,
        child: ArcStr,
        message: String,
    },

    #[error("port `{port}` of module `{module}` was declared as both {first} and {second}")]
    PortDirection {
        module: ArcStr,
        port: ArcStr,
        first: crate::schematic::Direction,
        second: crate::schematic::Direction,
    },

    #[error("port `{port}` of module `{module}` has no geometry")]
    MissingPinGeometry { module: ArcStr, port: ArcStr },

    #[error("unknown layer `{0}`")]
    UnknownLayer(String),

    #[error("technology `{tech}` is missing design rule `{rule}`")]
    MissingRule { tech: String, rule: String },

    #[error("no via stack connects {0} and {1}")]
    NoVia(Layer, Layer),

    #[error("cannot route: {0}")]
    Routing(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("error generating `{module}`: {source}")]
    Generator {
        module: ArcStr,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("error rendering template: {0}")]
    Template(#[from] tera::Error),

    #[error("error serializing JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("error writing GDS: {0}")]
    Gds(String),

    #[error("error writing LEF: {0}")]
    Lef(String),
}

impl Error {
    pub fn config(generator: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            generator,
            message: message.into(),
        }
    }

    /// Returns the innermost error, skipping generator context.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Generator { source, .. } => source.root_cause(),
            e => e,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

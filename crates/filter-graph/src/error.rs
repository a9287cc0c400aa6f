use avgraph_media_info::AvError;

/// Failures while turning a parsed description into a runnable graph. The
/// graph cannot be used after any of these.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("error creating filter '{filter}' as '{name}': {source}")]
    CreateFilter {
        filter: &'static str,
        name: String,
        source: AvError,
    },
    #[error("error linking filters {from}:{from_pad} -> {to}:{to_pad}: {source}")]
    Link {
        from: String,
        from_pad: u32,
        to: String,
        to_pad: u32,
        source: AvError,
    },
    #[error("error setting option '{key}' on {target}: {source}")]
    Option {
        target: String,
        key: String,
        source: AvError,
    },
    #[error("graph config error: {0}")]
    Validate(AvError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("error parsing filter graph '{description}': {source}")]
    Parse { description: String, source: AvError },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unexpected {what} index #{index} ({len} available)")]
    Index {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("graph not initialized: no frame has been pushed yet")]
    NotInitialized,
    #[error("graph has been released")]
    Disposed,
    #[error("graph is unusable after a failed configuration")]
    Unusable,
    #[error("failed to open encoder: {0}")]
    EncoderOpen(AvError),
    #[error("could not initialize output stream parameters: {0}")]
    StreamInit(AvError),
    #[error("invalid setting {key} = '{value}'")]
    InvalidSetting { key: &'static str, value: String },
    #[error(transparent)]
    Av(#[from] AvError),
}

impl GraphError {
    pub(crate) fn input_index(index: usize, len: usize) -> Self {
        Self::Index {
            what: "input",
            index,
            len,
        }
    }

    pub(crate) fn output_index(index: usize, len: usize) -> Self {
        Self::Index {
            what: "output",
            index,
            len,
        }
    }

    /// The native error code behind this failure, if there is one.
    pub fn av_error(&self) -> Option<AvError> {
        match self {
            Self::Parse { source, .. } => Some(*source),
            Self::Config(
                ConfigError::CreateFilter { source, .. }
                | ConfigError::Link { source, .. }
                | ConfigError::Option { source, .. },
            ) => Some(*source),
            Self::Config(ConfigError::Validate(err))
            | Self::EncoderOpen(err)
            | Self::StreamInit(err)
            | Self::Av(err) => Some(*err),
            _ => None,
        }
    }
}

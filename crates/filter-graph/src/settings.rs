use std::str::FromStr;

use avgraph_media_info::{AvError, Rational};
use avgraph_options::Dictionary;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::{GraphError, logger::GraphLogger};

pub const DEFAULT_SCALE_OPTIONS: &str = "flags=bicubic";

/// Per-graph configuration, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphSettings {
    /// Name attached to every log event of the graph.
    pub tag: String,
    /// Filter description. Empty means passthrough.
    pub description: String,
    /// Graph-wide `scale_sws_opts`.
    pub scale_options: String,
    /// Graph-wide `aresample_swr_opts`.
    pub resample_options: String,
    /// Encoder frame rate chosen by the caller, if any.
    pub frame_rate: Option<Rational>,
    /// Keep `frame_rate` even when the encoder lists other supported rates.
    pub force_frame_rate: bool,
    /// Extra options for opening the output encoder.
    pub encoder_options: Dictionary,
    /// `error`, `warn`, `info`, `debug`, `trace` or `off`.
    pub log_level: Option<String>,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            tag: "graph".to_string(),
            description: String::new(),
            scale_options: DEFAULT_SCALE_OPTIONS.to_string(),
            resample_options: String::new(),
            frame_rate: None,
            force_frame_rate: false,
            encoder_options: Dictionary::new(),
            log_level: None,
        }
    }
}

impl GraphSettings {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_scale_options(mut self, options: impl Into<String>) -> Self {
        self.scale_options = options.into();
        self
    }

    pub fn with_resample_options(mut self, options: impl Into<String>) -> Self {
        self.resample_options = options.into();
        self
    }

    pub fn with_frame_rate(mut self, rate: Rational) -> Self {
        self.frame_rate = Some(rate);
        self
    }

    pub fn with_forced_frame_rate(mut self, rate: Rational) -> Self {
        self.frame_rate = Some(rate);
        self.force_frame_rate = true;
        self
    }

    pub fn with_encoder_option(mut self, key: &str, value: &str) -> Result<Self, AvError> {
        self.encoder_options.set(key, value, Default::default())?;
        Ok(self)
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn level_filter(&self) -> Result<LevelFilter, GraphError> {
        match &self.log_level {
            None => Ok(LevelFilter::INFO),
            Some(level) => {
                LevelFilter::from_str(level).map_err(|_| GraphError::InvalidSetting {
                    key: "logLevel",
                    value: level.clone(),
                })
            }
        }
    }

    pub fn logger(&self) -> Result<GraphLogger, GraphError> {
        Ok(GraphLogger::new(&self.tag, self.level_filter()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avgraph_options::DictFlags;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_scale_bicubic() {
        let settings = GraphSettings::default();

        assert_eq!(settings.scale_options, "flags=bicubic");
        assert_eq!(settings.resample_options, "");
        assert_eq!(settings.level_filter().unwrap(), LevelFilter::INFO);
    }

    #[test]
    fn loads_partial_json() {
        let settings: GraphSettings = serde_json::from_str(
            r#"{
                "tag": "camera",
                "description": "select='eq(pict_type,I)'",
                "frameRate": { "num": 30000, "den": 1001 },
                "encoderOptions": [{ "key": "qscale", "value": "3" }],
                "logLevel": "debug"
            }"#,
        )
        .unwrap();

        assert_eq!(settings.tag, "camera");
        assert_eq!(settings.frame_rate, Some(Rational::new(30000, 1001)));
        assert!(!settings.force_frame_rate);
        assert_eq!(settings.scale_options, "flags=bicubic");
        assert_eq!(
            settings.encoder_options.get("qscale", DictFlags::empty()),
            Some("3")
        );
        assert_eq!(settings.level_filter().unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let settings = GraphSettings::new("null").with_log_level("chatty");

        assert_eq!(
            settings.level_filter(),
            Err(GraphError::InvalidSetting {
                key: "logLevel",
                value: "chatty".into()
            })
        );
    }
}

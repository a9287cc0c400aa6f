use avgraph_media_info::AvError;
use serde::{Deserialize, Serialize};

use crate::Dictionary;

/// A native object that accepts string-keyed options: a filter graph, a filter
/// node or a codec context.
pub trait Configurable {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), AvError>;

    fn set_option_int(&mut self, key: &str, value: i64) -> Result<(), AvError> {
        self.set_option(key, &value.to_string())
    }

    fn set_option_dict(&mut self, key: &str, value: &Dictionary) -> Result<(), AvError> {
        self.set_option(key, &value.to_option_string()?)
    }
}

impl Configurable for Dictionary {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), AvError> {
        self.set(key, value, Default::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Str(String),
    Dict(Dictionary),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<Dictionary> for OptionValue {
    fn from(value: Dictionary) -> Self {
        Self::Dict(value)
    }
}

/// A single `key = value` setting applied to a [`Configurable`] target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOption {
    pub key: String,
    pub val: OptionValue,
}

impl ConfigOption {
    pub fn new(key: impl Into<String>, val: impl Into<OptionValue>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }

    pub fn apply<T: Configurable + ?Sized>(&self, target: &mut T) -> Result<(), AvError> {
        match &self.val {
            OptionValue::Str(value) => target.set_option(&self.key, value),
            OptionValue::Int(value) => target.set_option_int(&self.key, *value),
            OptionValue::Dict(value) => target.set_option_dict(&self.key, value),
        }
    }
}

/// Applies options in order, stopping at the first failure and reporting the
/// offending option.
pub fn apply_all<'a, T: Configurable + ?Sized>(
    options: impl IntoIterator<Item = &'a ConfigOption>,
    target: &mut T,
) -> Result<(), (&'a ConfigOption, AvError)> {
    for option in options {
        option.apply(target).map_err(|err| (option, err))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DictFlags;

    struct Strict(Dictionary);

    impl Configurable for Strict {
        fn set_option(&mut self, key: &str, value: &str) -> Result<(), AvError> {
            if key.starts_with("bogus") {
                return Err(AvError::OPTION_NOT_FOUND);
            }
            self.0.set(key, value, DictFlags::empty())
        }
    }

    #[test]
    fn applies_each_value_kind() {
        let mut target = Dictionary::new();

        ConfigOption::new("threads", "auto").apply(&mut target).unwrap();
        ConfigOption::new("all_channel_counts", 1).apply(&mut target).unwrap();
        ConfigOption::new(
            "input_options",
            Dictionary::from_pairs([("rtsp_transport", "tcp"), ("stimeout", "10000000")]).unwrap(),
        )
        .apply(&mut target)
        .unwrap();

        assert_eq!(target.get("threads", DictFlags::empty()), Some("auto"));
        assert_eq!(target.get("all_channel_counts", DictFlags::empty()), Some("1"));
        assert_eq!(
            target.get("input_options", DictFlags::empty()),
            Some("rtsp_transport=tcp:stimeout=10000000")
        );
    }

    #[test]
    fn apply_all_reports_failing_option() {
        let options = [
            ConfigOption::new("threads", "auto"),
            ConfigOption::new("bogus_key", "1"),
            ConfigOption::new("never_applied", "1"),
        ];
        let mut target = Strict(Dictionary::new());

        let (failed, err) = apply_all(&options, &mut target).unwrap_err();

        assert_eq!(failed.key, "bogus_key");
        assert_eq!(err, AvError::OPTION_NOT_FOUND);
        assert_eq!(target.0.count(), 1);
    }

    #[test]
    fn untagged_values_deserialize() {
        let option: ConfigOption =
            serde_json::from_str(r#"{"key":"threads","val":4}"#).unwrap();
        assert_eq!(option.val, OptionValue::Int(4));

        let option: ConfigOption =
            serde_json::from_str(r#"{"key":"flags","val":"bicubic"}"#).unwrap();
        assert_eq!(option.val, OptionValue::Str("bicubic".into()));
    }
}

use serde::Deserialize;

use crate::error::OracleError;
use crate::prompb::Label;
use crate::Result;

/// Settings shared by the series generators.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Random seed values are drawn from `0..value_range`.
    pub value_range: u32,
    /// Name of the label attached to every generated exemplar.
    pub exemplar_label_name: String,
    pub exemplar_label_value: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            value_range: 1000,
            exemplar_label_name: "trace_id".to_string(),
            exemplar_label_value: "1234".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Load a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GeneratorConfig =
            serde_json::from_str(json).map_err(|e| OracleError::json("config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.value_range == 0 {
            return Err(OracleError::InvalidConfig(
                "value_range must be at least 1".to_string(),
            ));
        }
        if self.exemplar_label_name.is_empty() {
            return Err(OracleError::InvalidConfig(
                "exemplar_label_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Labels attached to every generated exemplar.
    pub fn exemplar_labels(&self) -> Vec<Label> {
        vec![Label::new(
            self.exemplar_label_name.as_str(),
            self.exemplar_label_value.as_str(),
        )]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();

        assert_eq!(1000, config.value_range);
        assert_eq!(vec![Label::new("trace_id", "1234")], config.exemplar_labels());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let json = indoc! {r#"
            {
              "value_range": 10
            }
        "#};

        let config = GeneratorConfig::from_json(json).expect("loading config");
        assert_eq!(10, config.value_range);
        assert_eq!("trace_id", config.exemplar_label_name);
    }

    #[test]
    fn test_from_json_rejects_bad_config() {
        assert!(matches!(
            GeneratorConfig::from_json(r#"{"value_range": 0}"#),
            Err(OracleError::InvalidConfig(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_json(r#"{"exemplar_label_name": ""}"#),
            Err(OracleError::InvalidConfig(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_json(r#"{"unknown": 1}"#),
            Err(OracleError::Json { what: "config", .. })
        ));
    }
}

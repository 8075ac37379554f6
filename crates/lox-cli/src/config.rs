use std::path::Path;

use serde::Deserialize;

use crate::CliError;

pub const CONFIG_FILE: &str = "lox.toml";

/// Contents of `lox.toml`. Every table and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoxToml {
    pub check: CheckConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    #[serde(default = "default_true")]
    pub report_ambiguity: bool,
    #[serde(default)]
    pub show_types: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            report_ambiguity: default_true(),
            show_types: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub color: ColorMode,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(ColorMode::Auto),
            "always" => Some(ColorMode::Always),
            "never" => Some(ColorMode::Never),
            _ => None,
        }
    }

    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            ColorMode::Auto => is_terminal,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn default_true() -> bool {
    true
}

pub fn parse_lox_toml(text: &str) -> Result<LoxToml, CliError> {
    toml::from_str(text).map_err(|err| CliError::Config(err.to_string()))
}

pub fn read_lox_toml(path: &Path) -> Result<LoxToml, CliError> {
    let text = std::fs::read_to_string(path)?;
    parse_lox_toml(&text)
        .map_err(|err| CliError::Config(format!("{}: {err}", path.display())))
}

/// Reads the explicit config path if one was given, else `lox.toml` in `dir` when present.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<LoxToml, CliError> {
    if let Some(path) = explicit {
        return read_lox_toml(path);
    }
    let default = dir.join(CONFIG_FILE);
    if default.is_file() {
        read_lox_toml(&default)
    } else {
        Ok(LoxToml::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_lox_toml("").expect("empty config parses");
        assert_eq!(config, LoxToml::default());
        assert!(config.check.report_ambiguity);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn reads_every_key() {
        let config = parse_lox_toml(
            r#"
            [check]
            report_ambiguity = false
            show_types = true

            [output]
            color = "never"
            format = "json"
            "#,
        )
        .expect("config parses");
        assert!(!config.check.report_ambiguity);
        assert!(config.check.show_types);
        assert_eq!(config.output.color, ColorMode::Never);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = parse_lox_toml("[check]\nshow_types = true\n").expect("config parses");
        assert!(config.check.report_ambiguity);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = parse_lox_toml("[check]\nstrict = true\n").unwrap_err();
        assert!(matches!(error, CliError::Config(ref message) if message.contains("strict")));
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(None, dir.path()).expect("defaults");
        assert_eq!(config, LoxToml::default());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("other.toml");
        assert!(matches!(
            load_config(Some(&missing), dir.path()),
            Err(CliError::Io(_))
        ));
    }
}

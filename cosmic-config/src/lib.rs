use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "cosmic_ls.toml";

const DEFAULT_MAX_PROBLEMS: usize = 1000;

const DEFAULT_TOML: &str = r#"# Most diagnostics published for a single document.
max_number_of_problems = 1000

# Keep parsing past syntax errors so completion and hover still work on broken
# code. When disabled only the first syntax error is reported.
recover_from_errors = true
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_number_of_problems: usize,
    pub recover_from_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_number_of_problems: DEFAULT_MAX_PROBLEMS,
            recover_from_errors: true,
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw_config: RawConfig) -> Self {
        Self {
            max_number_of_problems: raw_config
                .max_number_of_problems
                .unwrap_or(DEFAULT_MAX_PROBLEMS),
            recover_from_errors: raw_config.recover_from_errors.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    max_number_of_problems: Option<usize>,
    recover_from_errors: Option<bool>,
}

/// Settings pushed by the editor through `workspace/didChangeConfiguration`,
/// e.g. `{ "cosmic": { "maxNumberOfProblems": 100 } }`.
#[derive(Debug, Default, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub cosmic: Option<ClientOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    pub max_number_of_problems: Option<usize>,
    pub recover_from_errors: Option<bool>,
}

impl Config {
    /// Editor settings take precedence over the project file.
    pub fn apply(&mut self, settings: ClientSettings) {
        let Some(options) = settings.cosmic else { return };

        if let Some(max) = options.max_number_of_problems {
            self.max_number_of_problems = max;
        }
        if let Some(recover) = options.recover_from_errors {
            self.recover_from_errors = recover;
        }
    }
}

pub fn config_path<P: AsRef<Path>>(root_dir: P) -> PathBuf {
    root_dir.as_ref().join(CONFIG_FILE)
}

/// Contents written by `cosmic_ls init`.
pub fn default_toml() -> &'static str {
    DEFAULT_TOML
}

fn load_project_config<P: AsRef<Path>>(root_dir: P) -> Option<Config> {
    let config_path = config_path(root_dir);
    if !config_path.exists() {
        return None;
    };

    let config = std::fs::read_to_string(config_path).ok()?;

    convert_from_toml(&config)
}

fn convert_from_toml(config: &str) -> Option<Config> {
    let raw_config: RawConfig = toml::from_str(config).ok()?;
    Some(raw_config.into())
}

pub fn load_config<P: AsRef<Path>>(root_dir: Option<P>) -> Config {
    match root_dir {
        Some(root_dir) => load_project_config(root_dir).unwrap_or_default(),
        None => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_matches_defaults() {
        assert_eq!(convert_from_toml(default_toml()), Some(Config::default()));
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = convert_from_toml("recover_from_errors = false").unwrap();
        assert_eq!(config.max_number_of_problems, 1000);
        assert!(!config.recover_from_errors);
    }

    #[test]
    fn test_malformed_config_is_ignored() {
        assert!(convert_from_toml("max_number_of_problems = 'many'").is_none());
    }

    #[test]
    fn test_load_config_without_project() {
        assert_eq!(load_config(None::<&str>), Config::default());

        let missing = std::env::temp_dir().join("cosmic-ls-missing-project");
        assert_eq!(load_config(Some(missing)), Config::default());
    }

    #[test]
    fn test_load_config_from_project() {
        let root = std::env::temp_dir().join(format!("cosmic-ls-config-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(config_path(&root), "max_number_of_problems = 3").unwrap();

        let config = load_config(Some(&root));
        std::fs::remove_dir_all(&root).unwrap();

        assert_eq!(config.max_number_of_problems, 3);
        assert!(config.recover_from_errors);
    }

    #[test]
    fn test_client_settings() {
        let mut config = Config::default();
        config.apply(ClientSettings {
            cosmic: Some(ClientOptions {
                max_number_of_problems: Some(5),
                recover_from_errors: None,
            }),
        });
        assert_eq!(config.max_number_of_problems, 5);
        assert!(config.recover_from_errors);

        config.apply(ClientSettings::default());
        assert_eq!(config.max_number_of_problems, 5);
    }
}

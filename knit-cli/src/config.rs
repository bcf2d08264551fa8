//! `knit.toml`: how to start an interpreter for each kernel name.
//!
//! ```toml
//! [kernels.python3]
//! command = ["python3", "-q", "-u", "-i"]
//! done = "print('{marker}')"
//! ```
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::Error;

pub(crate) const CONFIG_FILE: &str = "knit.toml";

/// Placeholder in [`KernelConfig::done`] replaced by the completion marker.
pub(crate) const MARKER_PLACEHOLDER: &str = "{marker}";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct KernelConfig {
    /// Program and arguments of an interpreter reading code on stdin.
    pub(crate) command: Vec<String>,
    /// Code that prints the completion marker on a line of its own.
    pub(crate) done: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) kernels: BTreeMap<String, KernelConfig>,
}

impl Config {
    /// Built-in kernels extended by `path`, or by `knit.toml` in the working
    /// directory when no path is given and the file exists.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = Self::builtin();
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.is_file() {
                    return Ok(config);
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        let file = Self::parse(&text).map_err(|source| Error::Config {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), kernels = file.kernels.len(), "loaded configuration");
        config.kernels.extend(file.kernels);
        Ok(config)
    }

    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn builtin() -> Self {
        let bash = KernelConfig {
            command: vec![
                "bash".to_string(),
                "--noprofile".to_string(),
                "--norc".to_string(),
            ],
            done: format!("printf '%s\\n' '{MARKER_PLACEHOLDER}'"),
        };
        Self {
            kernels: BTreeMap::from([("bash".to_string(), bash)]),
        }
    }

    pub(crate) fn kernel(&self, name: &str) -> Option<&KernelConfig> {
        self.kernels.get(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builtin_bash() {
        let config = Config::builtin();
        let bash = config.kernel("bash").unwrap();
        assert_eq!(bash.command.first().map(String::as_str), Some("bash"));
        assert_eq!(bash.done, "printf '%s\\n' '{marker}'");
    }

    #[test]
    fn test_file_extends_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knit.toml");
        std::fs::write(
            &path,
            "[kernels.python3]\ncommand = [\"python3\", \"-i\"]\ndone = \"print('{marker}')\"\n",
        )
        .unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.kernel("bash").is_some());
        assert_eq!(
            config.kernel("python3"),
            Some(&KernelConfig {
                command: vec!["python3".to_string(), "-i".to_string()],
                done: "print('{marker}')".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knit.toml");
        std::fs::write(&path, "[kernels.r]\ncmd = [\"R\"]\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(Some(&path)), Err(Error::Read { .. })));
    }
}

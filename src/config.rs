use crate::error::{JiffleError, JiffleResult};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Options shared by every compilation unit created from one context.
///
/// ```toml
/// name_prefix = "ndvi"
/// implicit_sources = false
/// outside_value = nan
/// progress_rows = 16
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JiffleOptions {
    /// Default unit names are `{name_prefix}{n}`.
    pub name_prefix: String,
    /// Treat unassigned, undeclared identifiers as source images.
    pub implicit_sources: bool,
    /// Value of source reads outside the image. Unset makes such reads an error.
    pub outside_value: Option<f64>,
    /// Rows between progress reports of an indirect sweep.
    pub progress_rows: usize,
}

impl Default for JiffleOptions {
    fn default() -> Self {
        Self {
            name_prefix: "jiffle".to_string(),
            implicit_sources: false,
            outside_value: None,
            progress_rows: 1,
        }
    }
}

impl JiffleOptions {
    pub fn from_toml_str(text: &str) -> JiffleResult<Self> {
        let options: Self = toml::from_str(text)
            .map_err(|err| JiffleError::Config(format!("failed to parse options: {err}")))?;
        if options.progress_rows == 0 {
            return Err(JiffleError::Config(
                "progress_rows must be at least 1".to_string(),
            ));
        }
        Ok(options)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> JiffleResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| JiffleError::Config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

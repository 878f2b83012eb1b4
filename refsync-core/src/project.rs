//! Project file (`project.yaml`) reading.
//!
//! Only the `actions.<name>.run` commands are of interest; everything else in
//! the file is ignored. Actions without a `run` key, or with an empty body,
//! are skipped.

use std::path::Path;

use serde_yaml::Value;

use crate::error::{io_err, ConfigError};
use crate::types::ProjectAction;

/// Read the actions of a project file in file order.
///
/// Returns `ConfigError::ProjectFileNotFound` if absent and
/// `ConfigError::ProjectFileParse` (with path + line context) if malformed.
pub fn parse_project_file(path: &Path) -> Result<Vec<ProjectAction>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ProjectFileNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let document: Value =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ProjectFileParse {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(actions_of(&document))
}

fn actions_of(document: &Value) -> Vec<ProjectAction> {
    let Some(actions) = document.get("actions").and_then(Value::as_mapping) else {
        return Vec::new();
    };
    actions
        .iter()
        .filter_map(|(name, body)| {
            let name = name.as_str()?;
            let run = body.get("run")?.as_str()?;
            Some(ProjectAction {
                name: name.to_string(),
                run: run.to_string(),
            })
        })
        .collect()
}

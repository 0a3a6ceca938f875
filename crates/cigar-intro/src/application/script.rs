//! Scene script loading.
//!
//! Scripts are YAML documents with a top-level `scenes` list. The story
//! shipped with the site is compiled in.

use std::path::Path;

use cigar_core::error::DomainError;
use serde::Deserialize;

use crate::domain::scene::{Scene, SceneScript};

/// The bundled story intro.
pub const DEFAULT_SCRIPT_YAML: &str = include_str!("../../assets/intro.yaml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptDocument {
    scenes: Vec<Scene>,
}

/// Parses and validates a YAML scene script.
///
/// # Errors
///
/// Returns `DomainError::InvalidScript` if the document is malformed or fails
/// validation.
pub fn parse_script(yaml: &str) -> Result<SceneScript, DomainError> {
    let document: ScriptDocument = serde_yaml::from_str(yaml)
        .map_err(|e| DomainError::InvalidScript(format!("malformed script: {e}")))?;
    SceneScript::new(document.scenes)
}

/// Reads a YAML scene script from disk.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the file cannot be read and
/// `DomainError::InvalidScript` if its contents are invalid.
pub fn load_script(path: &Path) -> Result<SceneScript, DomainError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        DomainError::Infrastructure(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_script(&yaml)
}

/// The bundled six-scene story.
///
/// # Panics
///
/// Panics if the bundled script is invalid, which the test suite rules out.
#[must_use]
pub fn default_script() -> SceneScript {
    parse_script(DEFAULT_SCRIPT_YAML).expect("bundled intro script is valid")
}

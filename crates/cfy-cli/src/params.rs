//! Workflow parameter parsing.
//!
//! Each `-p` source is one of: a `key1=value1;key2=value2` string, an
//! inline JSON object, a path to a JSON file, or a directory of JSON files.
//! Later sources override earlier ones key by key.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CliError;

/// Parsed workflow parameters.
pub type Parameters = BTreeMap<String, Value>;

/// Merge all parameter sources, in order.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] for a source that is none of the
/// accepted forms, or that does not describe an object.
pub fn parse_parameters<S: AsRef<str>>(sources: &[S]) -> Result<Parameters, CliError> {
    let mut parameters = Parameters::new();
    for source in sources {
        let source = source.as_ref();
        debug!(source, "processing parameters source");
        parameters.extend(parse_source(source).map_err(|reason| invalid(source, &reason))?);
    }
    Ok(parameters)
}

fn parse_source(source: &str) -> Result<Parameters, String> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Ok(Parameters::new());
    }
    if trimmed.starts_with('{') {
        return parse_json_object(trimmed);
    }
    if let Some(pairs) = parse_key_values(trimmed) {
        return pairs;
    }

    let path = Path::new(trimmed);
    if path.is_dir() {
        return parse_directory(path);
    }
    if path.is_file() {
        return parse_file(path);
    }
    Err("not a key=value list, a JSON object, or an existing path".to_string())
}

/// `None` when the text does not look like a key=value list at all.
fn parse_key_values(text: &str) -> Option<Result<Parameters, String>> {
    let segments: Vec<&str> = text
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() || !segments.iter().all(|s| s.contains('=')) {
        return None;
    }

    let mut parameters = Parameters::new();
    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            return Some(Err(format!(
                "empty key in '{segment}', the expected format is key1=value1;key2=value2"
            )));
        }
        parameters.insert(key.to_string(), Value::String(value.trim().to_string()));
    }
    Some(Ok(parameters))
}

fn parse_json_object(text: &str) -> Result<Parameters, String> {
    if text.trim().is_empty() {
        return Ok(Parameters::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(into_parameters(map)),
        Ok(Value::Null) => Ok(Parameters::new()),
        Ok(_) => Err("it must represent a dictionary".to_string()),
        Err(e) => Err(format!("not valid JSON: {e}")),
    }
}

fn parse_file(path: &Path) -> Result<Parameters, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    parse_json_object(&content).map_err(|e| format!("{}: {e}", path.display()))
}

fn parse_directory(dir: &Path) -> Result<Parameters, String> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| format!("failed to list '{}': {e}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut parameters = Parameters::new();
    for file in files {
        parameters.extend(parse_file(&file)?);
    }
    Ok(parameters)
}

fn into_parameters(map: Map<String, Value>) -> Parameters {
    map.into_iter().collect()
}

fn invalid(source: &str, reason: &str) -> CliError {
    CliError::InvalidArgument(format!(
        "invalid parameters '{source}': {reason}. Valid values are a JSON object, \
         a path to a JSON file or directory, or key1=value1;key2=value2"
    ))
}

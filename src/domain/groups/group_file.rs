//! Export/import document: a flat JSON object of group name to member ids,
//! plus one reserved key carrying the format string.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const FORMAT_KEY: &str = "$format";
pub const FORMAT_VERSION: &str = "addon-groups/v1";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "extension-groups.json";

pub type GroupDefinitions = IndexMap<String, Vec<String>>;

#[derive(thiserror::Error, Debug)]
pub enum GroupFileError {
    #[error("group file is not valid JSON")]
    Json(#[source] serde_json::Error),
    #[error("group file is malformed: {0}")]
    Malformed(String),
    #[error("unsupported group file format `{0}`")]
    UnsupportedFormat(String),
}

/// Parses an exported document. The reserved format key is stripped; a
/// document without it is accepted.
pub fn parse_group_file(text: &str) -> Result<GroupDefinitions, GroupFileError> {
    let value: JsonValue = serde_json::from_str(text).map_err(GroupFileError::Json)?;
    let JsonValue::Object(mut obj) = value else {
        return Err(GroupFileError::Malformed(
            "top-level value must be an object".into(),
        ));
    };

    if let Some(format) = obj.shift_remove(FORMAT_KEY) {
        match format {
            JsonValue::String(s) if s == FORMAT_VERSION => {}
            JsonValue::String(s) => return Err(GroupFileError::UnsupportedFormat(s)),
            other => return Err(GroupFileError::UnsupportedFormat(other.to_string())),
        }
    }

    definitions_from_object(obj)
}

/// Reads the persisted map shape (no format key) from a store value.
pub fn definitions_from_value(value: JsonValue) -> Result<GroupDefinitions, GroupFileError> {
    match value {
        JsonValue::Object(obj) => definitions_from_object(obj),
        JsonValue::Null => Ok(GroupDefinitions::new()),
        _ => Err(GroupFileError::Malformed(
            "top-level value must be an object".into(),
        )),
    }
}

fn definitions_from_object(
    obj: JsonMap<String, JsonValue>,
) -> Result<GroupDefinitions, GroupFileError> {
    let mut out = GroupDefinitions::with_capacity(obj.len());
    for (name, ids) in obj {
        let JsonValue::Array(items) = ids else {
            return Err(GroupFileError::Malformed(format!(
                "group `{name}` must map to an array of ids"
            )));
        };
        let mut members = Vec::with_capacity(items.len());
        for item in items {
            match item {
                JsonValue::String(id) => members.push(id),
                other => {
                    return Err(GroupFileError::Malformed(format!(
                        "group `{name}` contains non-string id {other}"
                    )));
                }
            }
        }
        out.insert(name, members);
    }
    Ok(out)
}

pub fn definitions_to_value(defs: &GroupDefinitions) -> JsonValue {
    let mut obj = JsonMap::with_capacity(defs.len());
    for (name, ids) in defs {
        obj.insert(
            name.clone(),
            JsonValue::Array(ids.iter().cloned().map(JsonValue::String).collect()),
        );
    }
    JsonValue::Object(obj)
}

/// Renders an export document with the format key first.
pub fn render_group_file(defs: &GroupDefinitions) -> String {
    let mut obj = JsonMap::with_capacity(defs.len() + 1);
    obj.insert(
        FORMAT_KEY.to_string(),
        JsonValue::String(FORMAT_VERSION.to_string()),
    );
    if let JsonValue::Object(groups) = definitions_to_value(defs) {
        obj.extend(groups);
    }
    // A map of strings to string arrays always serializes.
    serde_json::to_string_pretty(&JsonValue::Object(obj)).unwrap_or_else(|_| "{}".into())
}

/// Keeps only the named entries, preserving document order.
pub fn retain_selected(defs: &mut GroupDefinitions, selected: &[String]) {
    defs.retain(|name, _| selected.iter().any(|s| s == name));
}

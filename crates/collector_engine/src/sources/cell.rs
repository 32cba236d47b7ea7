use serde_json::Value;

/// Separator for list-valued fields written into a single CSV cell.
pub const LIST_DELIMITER: &str = ", ";

/// Renders a JSON value as a CSV cell. Arrays are joined with
/// [`LIST_DELIMITER`]; null and empty arrays become `None`.
pub fn scalar_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => join_cells(items.iter().filter_map(scalar_cell)),
        Value::Object(_) => Some(value.to_string()),
    }
}

pub fn join_cells(parts: impl IntoIterator<Item = String>) -> Option<String> {
    let parts: Vec<String> = parts.into_iter().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(LIST_DELIMITER))
    }
}

pub(crate) fn field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(scalar_cell)
}

pub(crate) fn nested(obj: &Value, outer: &str, inner: &str) -> Option<String> {
    obj.get(outer).and_then(|o| o.get(inner)).and_then(scalar_cell)
}

/// `[{"description": "Action"}, ...]` -> `"Action, ..."`.
pub(crate) fn descriptions(obj: &Value, key: &str) -> Option<String> {
    let items = obj.get(key)?.as_array()?;
    join_cells(
        items
            .iter()
            .filter_map(|item| item.get("description"))
            .filter_map(scalar_cell),
    )
}

/// `{"Indie": 120, "RPG": 80}` -> `"Indie, RPG"`.
pub(crate) fn object_keys(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Object(map) => join_cells(map.keys().cloned()),
        other => scalar_cell(other),
    }
}

use serde_json::Value;

const INDENT: &str = "  ";

/// Render an arbitrary parsed JSON value as nested, indented `key: value`
/// lines. Composite members sit one level deeper than their container and
/// array elements are labeled by index. Pure: the same value always renders
/// to the same lines.
pub fn render_value(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    match value {
        Value::Object(members) => {
            for (key, member) in members {
                render_entry(key, member, 0, &mut lines);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                render_entry(&index.to_string(), item, 0, &mut lines);
            }
        }
        scalar => lines.push(scalar_text(scalar)),
    }
    lines
}

fn render_entry(key: &str, value: &Value, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    match value {
        Value::Object(members) => {
            lines.push(format!("{indent}{key}:"));
            for (sub_key, member) in members {
                render_entry(sub_key, member, depth + 1, lines);
            }
        }
        Value::Array(items) => {
            lines.push(format!("{indent}{key}:"));
            for (index, item) in items.iter().enumerate() {
                render_entry(&index.to_string(), item, depth + 1, lines);
            }
        }
        scalar => lines.push(format!("{indent}{key}: {}", scalar_text(scalar))),
    }
}

// Strings render bare, everything else in its JSON literal form.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

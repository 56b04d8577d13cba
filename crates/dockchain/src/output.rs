use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

use crate::cli;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    /// Structured format for `-o`, with `auto` falling back to `default`
    pub fn resolve(format: cli::OutputFormat, default: OutputFormat) -> Self {
        match format {
            cli::OutputFormat::Auto => default,
            cli::OutputFormat::Json => OutputFormat::Json,
            cli::OutputFormat::Yaml => OutputFormat::Yaml,
            cli::OutputFormat::Table => OutputFormat::Table,
        }
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    let json_value = serde_json::to_value(data)?;
    println!("{}", render(&json_value, format)?);
    Ok(())
}

fn render(value: &Value, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Table => render_table(value),
    })
}

fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();

            // Get headers from first object
            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }

            table.to_string()
        }
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) if arr.iter().all(Value::is_string) => arr
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

/// Human-readable byte size, e.g. `7.4 MB`
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut size = bytes.max(0) as f64;
    let mut unit = 0;
    while size >= 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size as i64, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// First 12 hex characters of an ID, without any `sha256:` prefix
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.char_indices().nth(12).map_or(id, |(end, _)| &id[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_auto_uses_default() {
        assert_eq!(
            OutputFormat::resolve(cli::OutputFormat::Auto, OutputFormat::Table),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::resolve(cli::OutputFormat::Yaml, OutputFormat::Table),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn test_table_from_objects() {
        let rendered = render(
            &json!([{"id": "abc", "tags": ["alpine:latest", "alpine:3"]}]),
            OutputFormat::Table,
        )
        .unwrap();
        assert!(rendered.contains("abc"));
        assert!(rendered.contains("alpine:latest, alpine:3"));
    }

    #[test]
    fn test_scalar_renders_plain() {
        assert_eq!(render(&json!("done"), OutputFormat::Table).unwrap(), "done");
    }

    #[test]
    fn test_yaml_output() {
        let rendered = render(&json!({"status_code": 0}), OutputFormat::Yaml).unwrap();
        assert!(rendered.contains("status_code: 0"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(7_400_000), "7.4 MB");
        assert_eq!(format_size(-1), "0 B");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("sha256:0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("контейнер-сборки"), "контейнер-сб");
    }
}

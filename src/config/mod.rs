use anyhow::{Context as _, Result, bail};
use std::fs;
use std::path::Path;

use crate::context::{Context, Contexts};

/// Separator between nesting levels in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// Load a single document (JSON, YAML or TOML, chosen by extension).
///
/// With `env_prefix`, variables named `<PREFIX>__KEY` are layered on top
/// as lowercase `key`; `__` inside the rest of the name nests one level.
pub fn load_context(path: &Path, env_prefix: Option<&str>) -> Result<Context> {
    let mut builder = ::config::Config::builder().add_source(::config::File::from(path));
    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            ::config::Environment::with_prefix(prefix)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR),
        );
    }

    let settings = builder
        .build()
        .with_context(|| format!("Config: Failed to load {}", path.display()))?;
    let map: serde_json::Map<String, serde_json::Value> = settings
        .try_deserialize()
        .with_context(|| format!("Config: {} is not a key-value document", path.display()))?;

    tracing::info!("Loaded {} keys from {}", map.len(), path.display());
    Ok(Context::from(map))
}

/// Load a collection of documents.
///
/// `.jsonl` files hold one JSON object per line, `.json` files an array and
/// `.yaml`/`.yml` files a sequence.
pub fn load_contexts(path: &Path) -> Result<Contexts> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Config: Failed to read {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let contexts: Vec<Context> = match ext.as_str() {
        "jsonl" | "ndjson" => text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("Config: {}:{}: invalid document", path.display(), idx + 1)
                })
            })
            .collect::<Result<_>>()?,
        "json" => serde_json::from_str(&text).with_context(|| {
            format!("Config: {} is not a JSON array of objects", path.display())
        })?,
        "yaml" | "yml" => serde_yaml::from_str(&text).with_context(|| {
            format!("Config: {} is not a YAML sequence of mappings", path.display())
        })?,
        other => bail!("Config: unsupported document collection format: {other:?}"),
    };

    tracing::info!("Loaded {} documents from {}", contexts.len(), path.display());
    Ok(Contexts::from(contexts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml_document() {
        let file = temp_file(".yaml", "title: hello\npage:\n  draft: true\n");
        let ctx = load_context(file.path(), None).unwrap();
        assert_eq!(ctx.get("title"), Some(&json!("hello")));
        assert_eq!(ctx.get("page.draft"), Some(&json!(true)));
    }

    #[test]
    fn loads_json_document() {
        let file = temp_file(".json", r#"{"count": 3, "tags": ["a", "b"]}"#);
        let ctx = load_context(file.path(), None).unwrap();
        assert_eq!(ctx.get("count"), Some(&json!(3)));
        assert_eq!(ctx.get("tags.0"), Some(&json!("a")));
    }

    #[test]
    fn loads_jsonl_collection() {
        let file = temp_file(".jsonl", "{\"a\": 1}\n\n{\"a\": 2}\n");
        let docs = load_contexts(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn loads_yaml_collection() {
        let file = temp_file(".yml", "- a: 1\n- a: 2\n- a: 3\n");
        let docs = load_contexts(file.path()).unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn rejects_bad_collection() {
        let file = temp_file(".jsonl", "{\"a\": 1}\nnot json\n");
        let err = load_contexts(file.path()).unwrap_err();
        assert!(err.to_string().contains(":2: invalid document"));

        let file = temp_file(".csv", "a,b\n");
        assert!(load_contexts(file.path()).is_err());
    }
}

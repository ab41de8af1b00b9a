use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::definition::ModuleDefinition;

/// Read one definition file in the data-only exchange format and check its
/// construction invariants.
pub fn load_definition(path: &Path) -> Result<ModuleDefinition> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read definition {}", path.display()))?;
    let definition: ModuleDefinition = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse definition {}", path.display()))?;
    definition
        .validate()
        .with_context(|| format!("invalid definition {}", path.display()))?;
    Ok(definition)
}

/// Load every `*.json` definition under `dir`, sorted by file name so the
/// result is stable across platforms.
pub fn load_definitions_dir(dir: &Path) -> Result<Vec<ModuleDefinition>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read definitions directory {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list definitions in {}", dir.display()))?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    paths.iter().map(|path| load_definition(path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_definition(dir: &Path, name: &str, value: serde_json::Value) {
        fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn minimal() -> serde_json::Value {
        json!({
            "family": "sites",
            "name": "site_info",
            "operations": { "get": ["get_site"] },
            "parameters": {
                "get_site": [
                    { "name": "site_id", "type": "string", "required": true }
                ]
            }
        })
    }

    #[test]
    fn loads_a_minimal_definition() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "site_info.json", minimal());
        let definition = load_definition(&dir.path().join("site_info.json")).unwrap();
        assert_eq!(definition.family, "sites");
        assert_eq!(definition.params_for("get_site").len(), 1);
        assert!(!definition.idempotent);
    }

    #[test]
    fn rejects_unknown_keys_in_the_exchange_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = minimal();
        value["extra"] = json!(true);
        write_definition(dir.path(), "bad.json", value);
        let err = load_definition(&dir.path().join("bad.json")).unwrap_err();
        assert!(err.to_string().contains("failed to parse definition"));
    }

    #[test]
    fn rejects_invalid_definitions_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = minimal();
        value["operations"]["delete"] = json!(["delete_site"]);
        write_definition(dir.path(), "bad.json", value);
        let err = load_definition(&dir.path().join("bad.json")).unwrap_err();
        assert!(err.to_string().contains("invalid definition"));
    }

    #[test]
    fn loads_a_directory_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut second = minimal();
        second["name"] = json!("site_info_b");
        write_definition(dir.path(), "b.json", second);
        write_definition(dir.path(), "a.json", minimal());
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let definitions = load_definitions_dir(dir.path()).unwrap();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].name, "site_info");
        assert_eq!(definitions[1].name, "site_info_b");
    }
}

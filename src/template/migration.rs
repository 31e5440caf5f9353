//! Template schema migration.
//!
//! Templates saved by older editors are upgraded to the current schema before
//! they are deserialized. Migrations are applied sequentially, so a template
//! can jump several versions in one load.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::error::{PhotocardError, Result};

/// Current schema version for template files.
pub const CURRENT_SCHEMA_VERSION: &str = "1.1.0";

/// Version assumed for documents without a `schema_version` field.
const LEGACY_SCHEMA_VERSION: &str = "1.0.0";

/// Corner radius given to legacy `"rounded"` masks without an explicit radius.
const LEGACY_ROUNDED_RADIUS: f64 = 16.0;

type MigrationFn = fn(Value) -> Result<Value>;

/// Maps (from_version, to_version) to the migration function.
fn get_migration_registry() -> HashMap<(String, String), MigrationFn> {
    let mut registry: HashMap<(String, String), MigrationFn> = HashMap::new();

    registry.insert(
        ("1.0.0".to_string(), "1.1.0".to_string()),
        migrate_1_0_0_to_1_1_0,
    );

    registry
}

/// All known schema versions in order.
fn get_version_order() -> Vec<&'static str> {
    vec!["1.0.0", "1.1.0"]
}

/// Migrate template JSON from its schema version to the current one.
///
/// # Errors
/// Returns `InvalidSchemaVersion` for versions this build does not know
/// (including newer ones) and `MigrationError` when a step fails.
pub fn migrate_template(mut data: Value) -> Result<Value> {
    if !data.is_object() {
        return Err(PhotocardError::InvalidTemplate {
            reason: "template must be a JSON object".to_string(),
        });
    }

    let current_version = data
        .get("schema_version")
        .and_then(|v| v.as_str())
        .unwrap_or(LEGACY_SCHEMA_VERSION)
        .to_string();

    let target_version = CURRENT_SCHEMA_VERSION;

    if current_version == target_version {
        return Ok(data);
    }

    if !get_version_order().contains(&current_version.as_str()) {
        return Err(PhotocardError::InvalidSchemaVersion {
            version: current_version,
        });
    }

    let path = find_migration_path(&current_version, target_version);
    if path.is_empty() {
        return Err(PhotocardError::MigrationError {
            from: current_version,
            to: target_version.to_string(),
            reason: "No migration path found".to_string(),
        });
    }

    let registry = get_migration_registry();

    for (from, to) in path {
        let migration_fn = registry.get(&(from.clone(), to.clone())).ok_or_else(|| {
            PhotocardError::MigrationError {
                from: from.clone(),
                to: to.clone(),
                reason: "Migration function not found in registry".to_string(),
            }
        })?;

        data = migration_fn(data).map_err(|e| PhotocardError::MigrationError {
            from: from.clone(),
            to: to.clone(),
            reason: e.to_string(),
        })?;

        if let Some(obj) = data.as_object_mut() {
            obj.insert("schema_version".to_string(), Value::String(to.clone()));
        }
        tracing::debug!(%from, %to, "migrated template schema");
    }

    Ok(data)
}

/// Sequence of registered migrations leading from `from` to `to`.
///
/// Empty when the versions are equal, unknown, or `to` is older than `from`.
pub fn find_migration_path(from: &str, to: &str) -> Vec<(String, String)> {
    let versions = get_version_order();
    let registry = get_migration_registry();

    let (Some(from_idx), Some(to_idx)) = (
        versions.iter().position(|&v| v == from),
        versions.iter().position(|&v| v == to),
    ) else {
        return Vec::new();
    };

    if from_idx >= to_idx {
        return Vec::new();
    }

    let mut path = Vec::new();
    let mut current_idx = from_idx;

    while current_idx < to_idx {
        let current = versions[current_idx].to_string();
        let next = ((current_idx + 1)..=to_idx).find(|&idx| {
            registry.contains_key(&(current.clone(), versions[idx].to_string()))
        });

        match next {
            Some(next_idx) => {
                path.push((current, versions[next_idx].to_string()));
                current_idx = next_idx;
            }
            None => return Vec::new(),
        }
    }

    path
}

/// 1.0.0 → 1.1.0
///
/// - `bg_color` / `bg_image` become a tagged `background` object
/// - the single `overlay` object becomes the `overlays` array
/// - string slot masks become tagged mask objects
fn migrate_1_0_0_to_1_1_0(mut data: Value) -> Result<Value> {
    let obj = data
        .as_object_mut()
        .ok_or_else(|| PhotocardError::InvalidTemplate {
            reason: "template must be a JSON object".to_string(),
        })?;

    if !obj.contains_key("background") {
        if let Some(src) = obj.remove("bg_image").filter(|v| !v.is_null()) {
            obj.insert("background".to_string(), json!({ "kind": "image", "src": src }));
        } else if let Some(color) = obj.remove("bg_color").filter(|v| !v.is_null()) {
            obj.insert(
                "background".to_string(),
                json!({ "kind": "color", "color": color }),
            );
        }
    }
    obj.remove("bg_image");
    obj.remove("bg_color");

    if let Some(overlay) = obj.remove("overlay") {
        let overlays = match overlay {
            Value::Null => Vec::new(),
            other => vec![other],
        };
        obj.insert("overlays".to_string(), Value::Array(overlays));
    }

    if let Some(Value::Array(slots)) = obj.get_mut("slots") {
        for slot in slots.iter_mut().filter_map(Value::as_object_mut) {
            let Some(Value::String(shape)) = slot.get("mask").cloned() else {
                continue;
            };
            let radius = slot
                .remove("mask_radius")
                .and_then(|v| v.as_f64())
                .unwrap_or(LEGACY_ROUNDED_RADIUS);
            slot.insert("mask".to_string(), legacy_mask(&shape, radius)?);
        }
    }

    Ok(data)
}

fn legacy_mask(shape: &str, radius: f64) -> Result<Value> {
    let mut mask = Map::new();
    match shape {
        "rect" | "square" => {
            mask.insert("shape".to_string(), json!("rect"));
        }
        "circle" | "ellipse" => {
            mask.insert("shape".to_string(), json!("ellipse"));
        }
        "rounded" => {
            mask.insert("shape".to_string(), json!("rounded_rect"));
            mask.insert("radius".to_string(), json!(radius));
        }
        other => {
            return Err(PhotocardError::InvalidTemplate {
                reason: format!("unknown legacy mask shape '{}'", other),
            })
        }
    }
    Ok(Value::Object(mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_migrate_current_version_unchanged() {
        let data = json!({
            "schema_version": CURRENT_SCHEMA_VERSION,
            "id": "plain"
        });

        let result = migrate_template(data.clone()).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_missing_version_is_legacy() {
        let data = json!({
            "id": "legacy",
            "bg_color": "#ffeedd",
            "overlay": { "id": "frame", "src": "frame.png",
                         "bounds": { "x": 0, "y": 0, "width": 10, "height": 10 } },
            "slots": [
                { "id": "a", "mask": "circle" },
                { "id": "b", "mask": "rounded", "mask_radius": 8.0 },
                { "id": "c" }
            ]
        });

        let result = migrate_template(data).unwrap();
        assert_eq!(result["schema_version"], CURRENT_SCHEMA_VERSION);
        assert_eq!(result["background"], json!({ "kind": "color", "color": "#ffeedd" }));
        assert!(result.get("bg_color").is_none());
        assert_eq!(result["overlays"][0]["id"], "frame");
        assert_eq!(result["slots"][0]["mask"], json!({ "shape": "ellipse" }));
        assert_eq!(
            result["slots"][1]["mask"],
            json!({ "shape": "rounded_rect", "radius": 8.0 })
        );
        assert!(result["slots"][2].get("mask").is_none());
    }

    #[test]
    fn test_null_overlay_becomes_empty_list() {
        let data = json!({ "schema_version": "1.0.0", "overlay": null });
        let result = migrate_template(data).unwrap();
        assert_eq!(result["overlays"], json!([]));
    }

    #[test]
    fn test_unknown_mask_fails_migration() {
        let data = json!({ "schema_version": "1.0.0", "slots": [{ "id": "a", "mask": "star" }] });
        let err = migrate_template(data).unwrap_err();
        assert_eq!(err.error_code(), "MIGRATION_ERROR");
    }

    #[test]
    fn test_find_migration_path() {
        assert!(find_migration_path("1.1.0", "1.1.0").is_empty());
        assert!(find_migration_path("1.1.0", "1.0.0").is_empty());
        assert!(find_migration_path("0.9.0", "1.1.0").is_empty());
        assert_eq!(
            find_migration_path("1.0.0", "1.1.0"),
            vec![("1.0.0".to_string(), "1.1.0".to_string())]
        );
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = migrate_template(json!({ "schema_version": "2.0.0" }));
        match result {
            Err(PhotocardError::InvalidSchemaVersion { version }) => assert_eq!(version, "2.0.0"),
            other => panic!("Expected InvalidSchemaVersion error, got {:?}", other),
        }
    }
}

//! Edit operations
//!
//! A serializable form of the store's setters, so a sequence of edits can be
//! replayed from a JSON script.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::assets::inspect_image;
use crate::error::Result;
use crate::state::snapshot::{ColorData, Transform};
use crate::state::store::EditorStore;

/// One edit, tagged by `op` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    SetText { field: String, text: String },
    SetColor { layer: String, color: ColorData },
    /// Image path, read and validated when the op is applied.
    SetImage { slot: String, path: PathBuf },
    ClearImage { slot: String },
    SetTransform { layer: String, transform: Transform },
    /// Move by a delta in canvas pixels.
    Nudge { layer: String, dx: f64, dy: f64 },
    /// Multiply the current scale.
    Scale { layer: String, factor: f64 },
    /// Rotate clockwise by a number of degrees.
    Rotate { layer: String, degrees: f64 },
    ResetLayer { layer: String },
    Undo,
    Redo,
}

/// What applying an op did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    /// A new snapshot was recorded.
    Recorded,
    /// The op left the state as it was.
    Unchanged,
    Undone(String),
    Redone(String),
}

impl EditOp {
    /// Apply this op to the store.
    pub fn apply(&self, store: &mut EditorStore) -> Result<OpOutcome> {
        let recorded = match self {
            EditOp::SetText { field, text } => store.set_field_text(field, text.as_str())?,
            EditOp::SetColor { layer, color } => store.set_color(layer, *color)?,
            EditOp::SetImage { slot, path } => {
                let image = inspect_image(path, store.config())?;
                store.set_image(slot, image)?
            }
            EditOp::ClearImage { slot } => store.clear_image(slot)?,
            EditOp::SetTransform { layer, transform } => store.set_transform(layer, *transform)?,
            EditOp::Nudge { layer, dx, dy } => store.update_transform(layer, |t| {
                t.x += dx;
                t.y += dy;
            })?,
            EditOp::Scale { layer, factor } => {
                store.update_transform(layer, |t| t.scale *= factor)?
            }
            EditOp::Rotate { layer, degrees } => {
                store.update_transform(layer, |t| t.rotation += degrees)?
            }
            EditOp::ResetLayer { layer } => store.reset_layer(layer)?,
            EditOp::Undo => return Ok(OpOutcome::Undone(store.undo()?)),
            EditOp::Redo => return Ok(OpOutcome::Redone(store.redo()?)),
        };

        Ok(if recorded {
            OpOutcome::Recorded
        } else {
            OpOutcome::Unchanged
        })
    }
}

/// Apply ops in order, stopping at the first failure.
///
/// Ops applied before the failure stay applied.
pub fn apply_ops(store: &mut EditorStore, ops: &[EditOp]) -> Result<Vec<OpOutcome>> {
    let mut outcomes = Vec::with_capacity(ops.len());
    for (index, op) in ops.iter().enumerate() {
        match op.apply(store) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::warn!(index, ?op, error = %e, "edit op failed");
                return Err(e);
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::template::model::{Rect, Slot, SlotMask, TemplateConfig};
    use pretty_assertions::assert_eq;

    fn store() -> EditorStore {
        let mut template = TemplateConfig::new("t", "T", 100, 100);
        template.slots.push(Slot {
            id: "photo".to_string(),
            label: String::new(),
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
            mask: SlotMask::Ellipse,
        });
        EditorStore::with_template(template, EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_ops_from_json() {
        let ops: Vec<EditOp> = serde_json::from_str(
            r##"[
                { "op": "nudge", "layer": "photo", "dx": 4, "dy": -2 },
                { "op": "set_color", "layer": "background", "color": "#102030" },
                { "op": "undo" }
            ]"##,
        )
        .unwrap();

        assert_eq!(
            ops[1],
            EditOp::SetColor {
                layer: "background".to_string(),
                color: ColorData::rgb(0x10, 0x20, 0x30)
            }
        );

        let mut store = store();
        let outcomes = apply_ops(&mut store, &ops).unwrap();
        assert_eq!(outcomes[0], OpOutcome::Recorded);
        assert_eq!(outcomes[2], OpOutcome::Undone("Change color background".to_string()));
        assert_eq!(store.state().transform("photo").x, 4.0);
        assert_eq!(store.state().transform("photo").y, -2.0);
    }

    #[test]
    fn test_scale_and_rotate_compose() {
        let mut store = store();
        let ops = vec![
            EditOp::Scale {
                layer: "photo".to_string(),
                factor: 2.0,
            },
            EditOp::Scale {
                layer: "photo".to_string(),
                factor: 1.5,
            },
            EditOp::Rotate {
                layer: "photo".to_string(),
                degrees: -45.0,
            },
        ];
        apply_ops(&mut store, &ops).unwrap();
        let t = store.state().transform("photo");
        approx::assert_relative_eq!(t.scale, 3.0);
        approx::assert_relative_eq!(t.rotation, 315.0);
    }

    #[test]
    fn test_failure_stops_script() {
        let mut store = store();
        let ops = vec![
            EditOp::Nudge {
                layer: "photo".to_string(),
                dx: 1.0,
                dy: 0.0,
            },
            EditOp::ClearImage {
                slot: "missing".to_string(),
            },
            EditOp::Nudge {
                layer: "photo".to_string(),
                dx: 1.0,
                dy: 0.0,
            },
        ];
        assert!(apply_ops(&mut store, &ops).is_err());
        assert_eq!(store.state().transform("photo").x, 1.0);
    }

    #[test]
    fn test_clear_empty_slot_is_unchanged() {
        let mut store = store();
        let outcome = EditOp::ClearImage {
            slot: "photo".to_string(),
        }
        .apply(&mut store)
        .unwrap();
        assert_eq!(outcome, OpOutcome::Unchanged);
    }
}

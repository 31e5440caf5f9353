//! Editor Store
//!
//! The single in-memory store of an editing session: the loaded template,
//! the editable state, and its history. Every setter validates its target
//! and value before touching anything, applies the change, then records a
//! snapshot. A rejected edit leaves both state and history untouched.

use crate::config::EditorConfig;
use crate::error::{PhotocardError, Result};
use crate::psd::{import_psd, PsdImport};
use crate::state::history::History;
use crate::state::snapshot::{ColorData, EditableState, ImageData, Transform};
use crate::template::model::{Background, LayerKind, TemplateConfig};

/// In-memory editor state for one card.
#[derive(Debug, Clone)]
pub struct EditorStore {
    config: EditorConfig,
    template: Option<TemplateConfig>,
    state: EditableState,
    history: History,
    /// Layer selected in the editor; not part of history.
    selected: Option<String>,
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorStore {
    /// Create a store with no template loaded.
    pub fn new(config: EditorConfig) -> Self {
        let history = History::new(config.max_history);
        Self {
            config,
            template: None,
            state: EditableState::default(),
            history,
            selected: None,
        }
    }

    /// Create a store and load `template` into it.
    pub fn with_template(template: TemplateConfig, config: EditorConfig) -> Result<Self> {
        let mut store = Self::new(config);
        store.load_template(template)?;
        Ok(store)
    }

    /// Replace the template wholesale, resetting state and history.
    ///
    /// An invalid template is rejected and the current session is kept.
    pub fn load_template(&mut self, template: TemplateConfig) -> Result<()> {
        template.validate()?;

        let state = EditableState::from_template(&template);
        tracing::debug!(template = %template.id, "loading template");

        self.history.reset(state.clone());
        self.state = state;
        self.template = Some(template);
        self.selected = None;
        Ok(())
    }

    /// Import a PSD and load the mapped template.
    ///
    /// Nothing in the store changes unless the whole import succeeds.
    pub fn load_psd(&mut self, bytes: &[u8]) -> Result<PsdImport> {
        let import = import_psd(bytes, &self.config)?;
        self.load_template(import.template.clone())?;
        Ok(import)
    }

    /// Make a previously saved state the root of a fresh history.
    pub fn restore(&mut self, state: EditableState) -> Result<()> {
        self.check_state(&state)?;
        self.history.reset(state.clone());
        self.state = state;
        self.selected = None;
        Ok(())
    }

    pub fn template(&self) -> Result<&TemplateConfig> {
        self.template.as_ref().ok_or(PhotocardError::NoTemplateLoaded)
    }

    pub fn state(&self) -> &EditableState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selected_layer(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a layer (or clear the selection with `None`).
    pub fn select_layer(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            self.layer_kind(id)?;
        }
        self.selected = id.map(str::to_string);
        Ok(())
    }

    /// Set the text of a text field.
    pub fn set_field_text(&mut self, id: &str, text: impl Into<String>) -> Result<bool> {
        let text = text.into();
        self.check_text(id, &text)?;

        self.state.form_data.insert(id.to_string(), text);
        Ok(self.commit(format!("Edit text {}", id)))
    }

    /// Set the color of any layer.
    pub fn set_color(&mut self, id: &str, color: ColorData) -> Result<bool> {
        self.layer_kind(id)?;
        self.state.colors.insert(id.to_string(), color);
        Ok(self.commit(format!("Change color {}", id)))
    }

    /// Place an image into a slot. The slot's transform starts over.
    pub fn set_image(&mut self, slot_id: &str, image: ImageData) -> Result<bool> {
        self.check_image(slot_id, &image)?;

        self.state.images.insert(slot_id.to_string(), image);
        self.state.transforms.remove(slot_id);
        Ok(self.commit(format!("Place image {}", slot_id)))
    }

    /// Remove the image from a slot.
    pub fn clear_image(&mut self, slot_id: &str) -> Result<bool> {
        self.expect_kind(slot_id, &[LayerKind::Slot])?;
        self.state.images.remove(slot_id);
        self.state.transforms.remove(slot_id);
        Ok(self.commit(format!("Remove image {}", slot_id)))
    }

    /// Replace the transform of a movable layer.
    pub fn set_transform(&mut self, id: &str, transform: Transform) -> Result<bool> {
        let transform = transform.normalized();
        self.check_transform(id, &transform)?;

        if transform.is_identity() {
            self.state.transforms.remove(id);
        } else {
            self.state.transforms.insert(id.to_string(), transform);
        }
        Ok(self.commit(format!("Transform {}", id)))
    }

    /// Modify the current transform of a movable layer in place.
    pub fn update_transform(
        &mut self,
        id: &str,
        update: impl FnOnce(&mut Transform),
    ) -> Result<bool> {
        self.expect_movable(id)?;
        let mut transform = self.state.transform(id);
        update(&mut transform);
        self.set_transform(id, transform)
    }

    /// Put a layer back to its template defaults.
    pub fn reset_layer(&mut self, id: &str) -> Result<bool> {
        let kind = self.layer_kind(id)?;
        let template = self.template()?;

        let color = match kind {
            LayerKind::Background => match &template.background {
                Background::Color { color } => Some(*color),
                Background::Image { .. } => None,
            },
            LayerKind::Field => template.field(id).map(|f| f.color),
            LayerKind::Slot | LayerKind::Overlay => None,
        };
        let text = template.field(id).map(|f| f.default_text.clone());

        match color {
            Some(color) => self.state.colors.insert(id.to_string(), color),
            None => self.state.colors.remove(id),
        };
        if let Some(text) = text {
            self.state.form_data.insert(id.to_string(), text);
        }
        self.state.images.remove(id);
        self.state.transforms.remove(id);

        Ok(self.commit(format!("Reset {}", id)))
    }

    /// Step back one edit. Returns the label of the edit undone.
    pub fn undo(&mut self) -> Result<String> {
        let label = self
            .history
            .current()
            .map(|snapshot| snapshot.label.clone())
            .unwrap_or_default();
        let snapshot = self.history.undo()?;
        self.state = snapshot.state.clone();
        tracing::debug!(%label, "undo");
        Ok(label)
    }

    /// Step forward one edit. Returns the label of the edit redone.
    pub fn redo(&mut self) -> Result<String> {
        let snapshot = self.history.redo()?;
        let label = snapshot.label.clone();
        self.state = snapshot.state.clone();
        tracing::debug!(%label, "redo");
        Ok(label)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Record the current state; false when nothing changed.
    fn commit(&mut self, label: String) -> bool {
        let pushed = self.history.push(label.as_str(), &self.state);
        if pushed {
            tracing::trace!(%label, entries = self.history.len(), "snapshot pushed");
        }
        pushed
    }

    fn layer_kind(&self, id: &str) -> Result<LayerKind> {
        self.template()?
            .layer_kind(id)
            .ok_or_else(|| PhotocardError::LayerNotFound { id: id.to_string() })
    }

    fn expect_kind(&self, id: &str, allowed: &[LayerKind]) -> Result<LayerKind> {
        let kind = self.layer_kind(id)?;
        if allowed.contains(&kind) {
            Ok(kind)
        } else {
            Err(PhotocardError::WrongLayerKind {
                id: id.to_string(),
                expected: allowed.first().map(LayerKind::as_str).unwrap_or("layer"),
                actual: kind.as_str(),
            })
        }
    }

    /// Slots, text fields, and unlocked overlays can be moved.
    fn expect_movable(&self, id: &str) -> Result<()> {
        let kind = self.expect_kind(id, &[LayerKind::Slot, LayerKind::Field, LayerKind::Overlay])?;
        if kind == LayerKind::Overlay {
            let locked = self
                .template()?
                .overlay(id)
                .map(|o| o.locked)
                .unwrap_or(false);
            if locked {
                return Err(PhotocardError::InvalidTransform {
                    id: id.to_string(),
                    reason: "overlay is locked".to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_text(&self, id: &str, text: &str) -> Result<()> {
        self.expect_kind(id, &[LayerKind::Field])?;
        let max_length = self.template()?.field(id).and_then(|f| f.max_length);
        if let Some(max) = max_length {
            let len = text.chars().count();
            if len > max {
                return Err(PhotocardError::TextTooLong {
                    id: id.to_string(),
                    len,
                    max,
                });
            }
        }
        Ok(())
    }

    fn check_image(&self, slot_id: &str, image: &ImageData) -> Result<()> {
        self.expect_kind(slot_id, &[LayerKind::Slot])?;
        if image.width == 0 || image.height == 0 {
            return Err(PhotocardError::InvalidImage {
                reason: format!("{} has no pixels", image.source.display()),
            });
        }
        Ok(())
    }

    fn check_transform(&self, id: &str, transform: &Transform) -> Result<()> {
        self.expect_movable(id)?;
        transform
            .check()
            .map_err(|reason| PhotocardError::InvalidTransform {
                id: id.to_string(),
                reason,
            })
    }

    /// Check a saved state against the loaded template. Anything a setter
    /// would refuse is refused here too.
    fn check_state(&self, state: &EditableState) -> Result<()> {
        let template = self.template()?;

        for id in state.referenced_ids() {
            if template.layer_kind(id).is_none() {
                return Err(PhotocardError::LayerNotFound { id: id.to_string() });
            }
        }
        for (id, text) in &state.form_data {
            self.check_text(id, text)?;
        }
        for (id, image) in &state.images {
            self.check_image(id, image)?;
        }
        for (id, transform) in &state.transforms {
            self.check_transform(id, transform)?;
        }
        Ok(())
    }
}

//! Workflow Tests
//!
//! End-to-end flows: template files on disk, works in a local store,
//! scripted edits, rendering, and PSD import failures.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use photocard::config::EditorConfig;
use photocard::render::{export_png, render_card};
use photocard::state::{apply_ops, ColorData, EditOp, EditorStore, LocalStore, OpOutcome, Work};
use photocard::template::{Background, Rect, Slot, SlotMask, TemplateConfig, TemplateLibrary};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// Helper to write a solid-color PNG
fn write_png(path: &Path, w: u32, h: u32, px: [u8; 4]) {
    RgbaImage::from_pixel(w, h, Rgba(px))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

fn circle_card() -> TemplateConfig {
    let mut template = TemplateConfig::new("circle", "Circle card", 40, 40);
    template.background = Background::Color {
        color: ColorData::rgb(0, 0, 255),
    };
    template.slots.push(Slot {
        id: "photo".to_string(),
        label: "Photo".to_string(),
        bounds: Rect::new(0.0, 0.0, 40.0, 40.0),
        mask: SlotMask::Ellipse,
    });
    template
}

// === Work Round Trip ===

#[test]
fn test_work_edit_and_render_flow() {
    let temp = tempdir().unwrap();
    let template_dir = temp.path().join("templates");
    fs::create_dir_all(&template_dir).unwrap();
    let template_path = template_dir.join("circle.json");
    circle_card().save(&template_path).unwrap();

    let photo = temp.path().join("me.png");
    write_png(&photo, 8, 8, [255, 0, 0, 255]);

    // Create and save a work
    let store = LocalStore::open(&temp.path().join("works")).unwrap();
    let template = TemplateConfig::load(&template_path).unwrap();
    let mut work = Work::new("For mum", template, &template_dir);
    work.save(&store).unwrap();

    // Edit it in a session
    let script = format!(
        r##"[
            {{ "op": "set_image", "slot": "photo", "path": {} }},
            {{ "op": "nudge", "layer": "photo", "dx": 100, "dy": 0 }},
            {{ "op": "undo" }},
            {{ "op": "set_color", "layer": "background", "color": "#00ff00" }}
        ]"##,
        serde_json::to_string(&photo).unwrap()
    );
    let ops: Vec<EditOp> = serde_json::from_str(&script).unwrap();

    let mut work = Work::load(&store, &work.id).unwrap();
    let mut editor = EditorStore::with_template(work.template.clone(), EditorConfig::default()).unwrap();
    editor.restore(work.state.clone()).unwrap();
    let outcomes = apply_ops(&mut editor, &ops).unwrap();
    assert_eq!(outcomes[2], OpOutcome::Undone("Transform photo".to_string()));

    work.state = editor.state().clone();
    work.save(&store).unwrap();

    // Render what was saved
    let saved = Work::load(&store, &work.id).unwrap();
    assert!(saved.state.images.contains_key("photo"));
    assert!(saved.state.transforms.is_empty());

    let (image, report) = render_card(&saved.template, &saved.state, &saved.asset_root).unwrap();
    assert_eq!(image.get_pixel(20, 20).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(0, 0).0, [0, 255, 0, 255]);
    assert!(report.empty_slots.is_empty());

    let out = temp.path().join("out/card.png");
    export_png(&image, &out).unwrap();
    assert!(out.exists());
}

#[test]
fn test_restore_rejects_state_for_other_template() {
    let mut editor = EditorStore::with_template(circle_card(), EditorConfig::default()).unwrap();
    let mut foreign = editor.state().clone();
    foreign
        .form_data
        .insert("not-a-field".to_string(), "hello".to_string());

    assert!(editor.restore(foreign).is_err());
    assert!(!editor.state().form_data.contains_key("not-a-field"));
}

// === Template Library ===

#[test]
fn test_library_migrates_and_skips() {
    let temp = tempdir().unwrap();
    circle_card().save(&temp.path().join("circle.json")).unwrap();
    fs::write(
        temp.path().join("legacy.json"),
        r##"{
            "schema_version": "1.0.0",
            "id": "legacy",
            "name": "Legacy",
            "canvas": { "width": 100, "height": 100 },
            "bg_color": "#ffeedd",
            "slots": [
                { "id": "pic", "bounds": { "x": 0, "y": 0, "width": 50, "height": 50 }, "mask": "circle" }
            ],
            "overlay": { "id": "frame", "src": "frame.png", "bounds": { "x": 0, "y": 0, "width": 100, "height": 100 } }
        }"##,
    )
    .unwrap();
    fs::write(temp.path().join("broken.json"), "{ not json").unwrap();

    let library = TemplateLibrary::scan(temp.path()).unwrap();
    assert_eq!(library.len(), 2);
    assert_eq!(library.skipped().len(), 1);

    let legacy = library.get("legacy").unwrap();
    assert_eq!(legacy.slots[0].mask, SlotMask::Ellipse);
    assert_eq!(legacy.overlays.len(), 1);
    assert_eq!(
        legacy.background,
        Background::Color {
            color: ColorData::rgb(0xff, 0xee, 0xdd)
        }
    );
}

// === PSD Import Failures ===

#[test]
fn test_corrupt_psd_leaves_store_untouched() {
    let mut editor = EditorStore::with_template(circle_card(), EditorConfig::default()).unwrap();
    editor.set_color("photo", ColorData::rgb(9, 9, 9)).unwrap();
    let state = editor.state().clone();
    let history_len = editor.history().len();

    let mut corrupt = b"8BPS".to_vec();
    corrupt.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 3]);
    corrupt.extend_from_slice(&[0xff; 40]);

    let err = editor.load_psd(&corrupt).unwrap_err();
    assert_eq!(err.error_code(), "PSD_PARSE_ERROR");
    assert_eq!(editor.template().unwrap().id, "circle");
    assert_eq!(editor.state(), &state);
    assert_eq!(editor.history().len(), history_len);
    assert!(editor.can_undo());
}

#[test]
fn test_oversized_psd_rejected_before_decoding() {
    let config = EditorConfig {
        max_psd_bytes: 1024,
        ..EditorConfig::default()
    };
    let mut editor = EditorStore::with_template(circle_card(), config).unwrap();
    let err = editor.load_psd(&vec![0u8; 4096]).unwrap_err();
    assert_eq!(err.error_code(), "PSD_TOO_LARGE");
    assert_eq!(editor.template().unwrap().id, "circle");
}

#[test]
fn test_import_psd_file_missing() {
    let err = photocard::psd::import_psd_file(
        &PathBuf::from("/definitely/not/here.psd"),
        &EditorConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    assert!(err.recovery_suggestion().is_some());
}

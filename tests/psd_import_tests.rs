//! PSD Import Tests
//!
//! Decoding and mapping of real documents under `tests/fixtures/`.

use approx::assert_relative_eq;
use photocard::config::EditorConfig;
use photocard::psd::{decode_psd, import_psd, import_psd_as, MappingTarget, PsdDocument, PsdHeader};
use photocard::render::render_card;
use photocard::state::{ColorData, EditorStore};
use photocard::template::{Background, Rect, SlotMask};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// Background, a "Card" group holding "Round photo" and "Title", a hidden
/// "Hidden sticker", and a half-opacity "Frame" border on top.
const CARD_PSD: &[u8] = include_bytes!("fixtures/card-5-layer-20x10.psd");

/// Photoshop file with full-canvas Red, Green and Blue layers, Blue on top.
const RGB_PSD: &[u8] = include_bytes!("fixtures/rle-3-layer-8x8.psd");

/// Photoshop file with 1x1 Green and Red layers, Red on top.
const TINY_PSD: &[u8] = include_bytes!("fixtures/two-layers-red-green-1x1.psd");

fn decode(bytes: &[u8]) -> PsdDocument {
    let header = PsdHeader::parse(bytes, &EditorConfig::default()).unwrap();
    decode_psd(bytes, &header).unwrap()
}

// === Decoding ===

#[test]
fn test_layers_are_listed_bottom_to_top() {
    let doc = decode(RGB_PSD);
    let names: Vec<&str> = doc.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Red Layer", "Green Layer", "Blue Layer"]);

    for (i, layer) in doc.layers.iter().enumerate() {
        assert_eq!(layer.z_index, i);
        assert!(layer.visible);
        assert_eq!(layer.bounds, Rect::new(0.0, 0.0, 8.0, 8.0));
    }
    let top = doc.layers[2].pixels.as_ref().unwrap();
    assert_eq!(top.dimensions(), (8, 8));
    assert_eq!(top.get_pixel(7, 7).0, [0, 0, 255, 255]);
}

#[test]
fn test_single_pixel_layers_keep_their_size() {
    let doc = decode(TINY_PSD);
    assert_eq!(doc.layers[0].name, "Green");
    assert_eq!(doc.layers[1].name, "Red");
    assert_eq!(doc.layers[1].bounds, Rect::new(0.0, 0.0, 1.0, 1.0));
    assert!(doc.layers.iter().all(|l| l.has_pixels()));
}

#[test]
fn test_card_layer_geometry_groups_and_visibility() {
    let doc = decode(CARD_PSD);
    assert_eq!((doc.width, doc.height), (20, 10));

    let names: Vec<&str> = doc.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Background", "Round photo", "Title", "Hidden sticker", "Frame"]
    );

    let bounds: Vec<Rect> = doc.layers.iter().map(|l| l.bounds).collect();
    assert_eq!(
        bounds,
        vec![
            Rect::new(0.0, 0.0, 20.0, 10.0),
            Rect::new(2.0, 2.0, 6.0, 6.0),
            Rect::new(10.0, 2.0, 8.0, 2.0),
            Rect::new(12.0, 6.0, 4.0, 3.0),
            Rect::new(0.0, 0.0, 20.0, 10.0),
        ]
    );

    let visible: Vec<bool> = doc.layers.iter().map(|l| l.visible).collect();
    assert_eq!(visible, vec![true, true, true, false, true]);

    assert!(doc.layers[0].group_path.is_empty());
    assert_eq!(doc.layers[1].group_path, vec!["Card"]);
    assert_eq!(doc.layers[2].group_path, vec!["Card"]);
    assert!(doc.layers[4].group_path.is_empty());

    assert_relative_eq!(doc.layers[4].opacity, 128.0 / 255.0);
    let frame = doc.layers[4].pixels.as_ref().unwrap();
    assert_eq!(frame.get_pixel(0, 0).0, [255, 215, 0, 255]);
    assert_eq!(frame.get_pixel(5, 5).0[3], 0);
}

// === Mapping ===

#[test]
fn test_card_maps_to_template() {
    let import = import_psd_as(CARD_PSD, "card", "Card", &EditorConfig::default()).unwrap();
    let t = &import.template;

    assert_eq!(
        t.background,
        Background::Color {
            color: ColorData::rgb(200, 220, 240)
        }
    );

    assert_eq!(t.slots.len(), 1);
    assert_eq!(t.slots[0].id, "round-photo");
    assert_eq!(t.slots[0].bounds, Rect::new(2.0, 2.0, 6.0, 6.0));
    assert_eq!(t.slots[0].mask, SlotMask::Ellipse);

    assert_eq!(t.fields.len(), 1);
    assert_eq!(t.fields[0].id, "title");
    assert_eq!(t.fields[0].default_text, "Title");
    assert_eq!(t.fields[0].bounds, Rect::new(10.0, 2.0, 8.0, 2.0));

    let overlays: Vec<&str> = t.overlays.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(overlays, vec!["frame"]);
    assert_relative_eq!(t.overlays[0].opacity, 128.0 / 255.0);

    assert_eq!(
        import.report.summary(),
        vec![
            "Background -> background [background]",
            "Round photo -> slot (ellipse) [round-photo]",
            "Title -> text field [title]",
            "Hidden sticker -> skipped: hidden",
            "Frame -> overlay [frame]",
        ]
    );
    assert_eq!(import.report.entries[1].group_path, vec!["Card"]);
}

#[test]
fn test_hidden_layer_imported_below_frame_when_configured() {
    let config = EditorConfig {
        import_hidden_layers: true,
        ..EditorConfig::default()
    };
    let import = import_psd(CARD_PSD, &config).unwrap();
    let overlays: Vec<&str> = import.template.overlays.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(overlays, vec!["hidden-sticker", "frame"]);
    assert_eq!(import.report.skipped().count(), 0);
}

#[test]
fn test_full_canvas_bottom_layer_becomes_background() {
    let import = import_psd(RGB_PSD, &EditorConfig::default()).unwrap();
    assert_eq!(
        import.template.background,
        Background::Color {
            color: ColorData::rgb(255, 0, 0)
        }
    );
    assert_eq!(import.report.entries[0].target, MappingTarget::Background);

    let overlays: Vec<&str> = import.template.overlays.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(overlays, vec!["green-layer", "blue-layer"]);
}

#[test]
fn test_imported_document_renders_top_layer_last() {
    let temp = tempdir().unwrap();
    let import = import_psd(RGB_PSD, &EditorConfig::default()).unwrap();
    import.write_assets(temp.path()).unwrap();

    let mut store = EditorStore::new(EditorConfig::default());
    store.load_template(import.template.clone()).unwrap();
    let (image, report) = render_card(&import.template, store.state(), temp.path()).unwrap();

    assert_eq!(image.dimensions(), (8, 8));
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(image.get_pixel(7, 7).0, [0, 0, 255, 255]);
    assert!(report.drawn.contains(&"blue-layer".to_string()));
}

#[test]
fn test_tiny_document_imports_both_layers() {
    let import = import_psd(TINY_PSD, &EditorConfig::default()).unwrap();
    assert_eq!(
        import.template.background,
        Background::Color {
            color: ColorData::rgb(0, 255, 0)
        }
    );
    assert_eq!(import.template.overlays[0].id, "red");
    assert_eq!(import.template.overlays[0].bounds, Rect::new(0.0, 0.0, 1.0, 1.0));
}

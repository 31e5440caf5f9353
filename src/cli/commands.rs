//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::config::EditorConfig;
use crate::error::{PhotocardError, Result};
use crate::psd::import_psd_file;
use crate::render::{export_png, render_card};
use crate::state::{apply_ops, EditOp, EditorStore, LocalStore, OpOutcome, Work};
use crate::template::{TemplateConfig, TemplateLibrary};

/// Import a PSD and write the template next to its assets.
pub fn import_psd(file: &Path, out: &Path, config: &EditorConfig) -> Result<()> {
    info!("Importing PSD: {}", file.display());

    let import = import_psd_file(file, config)?;
    let template_path = import.write_assets(out)?;

    println!(
        "Imported {}x{} document as template '{}'",
        import.header.width, import.header.height, import.template.id
    );
    println!("{:-<60}", "");
    for line in import.report.summary() {
        println!("  {}", line);
    }
    println!("{:-<60}", "");
    println!(
        "{} layers mapped, {} skipped",
        import.report.mapped_count(),
        import.report.skipped().count()
    );
    println!("Template written: {}", template_path.display());

    Ok(())
}

/// Load, migrate, and validate a template file.
pub fn validate(template: &Path) -> Result<()> {
    info!("Validating template: {}", template.display());

    let config = TemplateConfig::load(template)?;
    println!("Template '{}' ({}) is valid", config.id, config.name);
    println!("Schema version: {}", config.schema_version);
    println!("Canvas: {}x{}", config.canvas.width, config.canvas.height);
    for id in config.layer_ids() {
        if let Some(kind) = config.layer_kind(id) {
            println!("  {:<24} {}", id, kind);
        }
    }

    Ok(())
}

/// List the templates found under a directory.
pub fn list_templates(dir: &Path) -> Result<()> {
    info!("Scanning templates in: {}", dir.display());

    let library = TemplateLibrary::scan(dir)?;
    if library.is_empty() {
        println!("No templates found in {}", dir.display());
    }
    for template in library.list() {
        println!(
            "{:<24} {:<32} {}x{}",
            template.id, template.name, template.canvas.width, template.canvas.height
        );
    }
    for skipped in library.skipped() {
        warn!("Skipped {}: {}", skipped.path.display(), skipped.error);
    }

    Ok(())
}

/// Start a work from a template file and save it.
pub fn create_work(store: &Path, template: &Path, title: &str) -> Result<()> {
    info!("Creating work from template: {}", template.display());

    let config = TemplateConfig::load(template)?;
    let asset_root = template
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let asset_root = asset_root
        .canonicalize()
        .unwrap_or_else(|_| asset_root.to_path_buf());

    let local = LocalStore::open(store)?;
    let mut work = Work::new(title, config, &asset_root);
    work.save(&local)?;

    println!("Work created: {}", work.id);
    Ok(())
}

/// List saved works.
pub fn list_works(store: &Path) -> Result<()> {
    let local = LocalStore::open(store)?;
    let ids = Work::list(&local)?;

    if ids.is_empty() {
        println!("No saved works.");
        return Ok(());
    }

    for id in ids {
        match Work::load(&local, &id) {
            Ok(work) => println!(
                "{}  {:<32} {}  (modified {})",
                work.id, work.title, work.template.id, work.modified_at
            ),
            Err(e) => warn!("Could not load work {}: {}", id, e),
        }
    }
    Ok(())
}

/// Apply a script of edit operations to a work and save the result.
///
/// The whole script runs in one session, so `undo`/`redo` ops refer to
/// edits earlier in the same script. A failing op aborts the script and the
/// work is left unsaved.
pub fn edit(store: &Path, work_id: &str, ops_path: &Path, config: &EditorConfig) -> Result<()> {
    info!("Editing work {} with {}", work_id, ops_path.display());

    let content = fs::read_to_string(ops_path).map_err(|e| PhotocardError::FileReadError {
        path: ops_path.to_path_buf(),
        source: e,
    })?;
    let ops: Vec<EditOp> = serde_json::from_str(&content)?;

    let local = LocalStore::open(store)?;
    let mut work = Work::load(&local, work_id)?;

    let mut editor = EditorStore::with_template(work.template.clone(), config.clone())?;
    editor.restore(work.state.clone())?;

    let outcomes = apply_ops(&mut editor, &ops)?;
    for (op, outcome) in ops.iter().zip(&outcomes) {
        let line = match outcome {
            OpOutcome::Recorded => "recorded".to_string(),
            OpOutcome::Unchanged => "unchanged".to_string(),
            OpOutcome::Undone(label) => format!("undid '{}'", label),
            OpOutcome::Redone(label) => format!("redid '{}'", label),
        };
        println!("  {:<60} {}", format!("{:?}", op), line);
    }

    println!("\nHistory:");
    for entry in editor.history().summary() {
        let marker = if entry.current { ">>> " } else { "    " };
        println!("{}{:>3}: {}", marker, entry.index, entry.label);
    }

    work.state = editor.state().clone();
    work.save(&local)?;
    println!("\nWork saved: {}", work.id);

    Ok(())
}

/// Render a work to a PNG file.
pub fn render(store: &Path, work_id: &str, out: &Path) -> Result<()> {
    info!("Rendering work {} to {}", work_id, out.display());

    let local = LocalStore::open(store)?;
    let work = Work::load(&local, work_id)?;

    let (image, report) = render_card(&work.template, &work.state, &work.asset_root)?;
    export_png(&image, out)?;

    println!("Rendered {}x{} card: {}", report.width, report.height, out.display());
    if !report.empty_slots.is_empty() {
        println!("Empty slots: {}", report.empty_slots.join(", "));
    }
    for field in &report.text_fields {
        println!(
            "Text '{}' at ({:.0}, {:.0}) size {:.0} {}: {}",
            field.id, field.bounds.x, field.bounds.y, field.font_size, field.color, field.text
        );
    }

    Ok(())
}

/// Print a work's template and editable state.
pub fn print_state(store: &Path, work_id: &str) -> Result<()> {
    let local = LocalStore::open(store)?;
    let work = Work::load(&local, work_id)?;

    let json = serde_json::to_string_pretty(&work)?;
    println!("{}", json);

    println!("\n--- Work Info ---");
    println!("Title: {}", work.title);
    println!("Template: {} ({})", work.template.id, work.template.schema_version);
    println!("Asset root: {}", work.asset_root.display());
    println!("Images placed: {}", work.state.images.len());

    Ok(())
}

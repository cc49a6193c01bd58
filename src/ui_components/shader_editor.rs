//! GLSL editor widget for the playground's edit buffer.
//!
//! Uses `egui_code_editor` with a GLSL syntax when the `code_editor` feature is
//! on, and a plain `TextEdit` with the built-in highlighter otherwise.

use eframe::egui;

#[cfg(feature = "code_editor")]
use crate::utils::glsl_syntax;

/// Renders the GLSL editor over the edit buffer.
///
/// # Arguments
/// * `ui` - The egui UI context
/// * `code` - Mutable reference to the edit buffer
/// * `editor_id` - Unique identifier for this editor instance
/// * `font_size` - Font size for the editor
pub fn render_shader_editor(
    ui: &mut egui::Ui,
    code: &mut String,
    editor_id: &str,
    font_size: f32,
) {
    ui.set_min_height(ui.available_height());

    #[cfg(feature = "code_editor")]
    {
        egui_code_editor::CodeEditor::default()
            .id_source(editor_id)
            .with_fontsize(font_size)
            .with_theme(egui_code_editor::ColorTheme::GITHUB_DARK)
            .with_syntax(glsl_syntax::glsl())
            .with_numlines(true)
            .vscroll(true)
            .auto_shrink(false)
            .show(ui, code);
    }

    #[cfg(not(feature = "code_editor"))]
    {
        let mut layouter = |ui: &egui::Ui, buf: &dyn egui::TextBuffer, wrap_width: f32| {
            let mut job = crate::glsl_highlight::layout_job_from_str(buf.as_str(), font_size);
            job.wrap.max_width = wrap_width;
            ui.painter().layout_job(job)
        };

        ui.add(
            egui::TextEdit::multiline(code)
                .id(egui::Id::new(editor_id))
                .font(egui::TextStyle::Monospace)
                .code_editor()
                .desired_width(f32::INFINITY)
                .desired_rows(30)
                .layouter(&mut layouter),
        );
    }
}

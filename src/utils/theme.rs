// theme.rs - Dark theme for the palette playground
use eframe::egui::{
    self, Color32, Context, CornerRadius, FontFamily, FontId, Margin, Stroke, TextStyle, Visuals,
};

/// Behind the panes, visible where the image does not cover them.
pub const PANE_BACKGROUND: Color32 = Color32::from_rgb(8, 8, 10);

/// Editor side panel fill.
pub const EDITOR_BACKGROUND: Color32 = Color32::from_rgb(20, 20, 25);

const ACCENT: Color32 = Color32::from_rgb(90, 140, 230);

/// Dark visuals plus an editor monospace size that follows the settings slider.
pub fn apply_editor_theme(ctx: &Context, editor_font_size: f32) {
    let mut style = (*ctx.style()).clone();
    style.visuals = Visuals::dark();

    let base = Color32::from_rgb(20, 20, 24);
    style.visuals.window_fill = base;
    style.visuals.panel_fill = base;
    style.visuals.extreme_bg_color = Color32::from_rgb(12, 12, 14);
    style.visuals.code_bg_color = Color32::from_rgb(16, 16, 18);
    style.visuals.selection.bg_fill = ACCENT.gamma_multiply(0.6);
    style.visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    style.visuals.hyperlink_color = ACCENT;

    style.visuals.window_corner_radius = CornerRadius::same(8);
    for widget in [
        &mut style.visuals.widgets.inactive,
        &mut style.visuals.widgets.hovered,
        &mut style.visuals.widgets.active,
    ] {
        widget.corner_radius = CornerRadius::same(4);
    }

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(8);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);

    style.override_font_id = Some(FontId::new(14.0, FontFamily::Proportional));
    style
        .text_styles
        .insert(TextStyle::Monospace, FontId::monospace(editor_font_size));

    ctx.set_style(style);
}

use eframe::egui;

use crate::utils::palette::{PaletteConfig, Rgb};
use crate::utils::shader_constants::{MAX_FONT_SIZE, MIN_FONT_SIZE};

/// Palette and editor settings. Returns true when the palette was edited.
pub fn settings_overlay(
    ctx: &egui::Context,
    show_settings: &mut bool,
    palette: &mut PaletteConfig,
    channel_count: usize,
    editor_font_size: &mut f32,
) -> bool {
    if !*show_settings {
        return false;
    }

    let mut changed = false;

    egui::Window::new("Settings")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 50.0))
        .resizable(false)
        .collapsible(false)
        .default_width(260.0)
        .open(show_settings)
        .show(ctx, |ui| {
            ui.heading("Editor");
            ui.separator();

            ui.label("Font Size:");
            ui.add(egui::Slider::new(editor_font_size, MIN_FONT_SIZE..=MAX_FONT_SIZE).text("px"));

            ui.add_space(10.0);
            ui.heading("Channels");
            ui.separator();

            if channel_count == 0 {
                ui.label(egui::RichText::new("No image loaded").weak());
            }
            for channel in 0..channel_count {
                ui.horizontal(|ui| {
                    let mut visible = palette.visibility_mask(channel_count)[channel];
                    let mut color: Rgb = palette.color_for(channel);

                    let toggled = ui.checkbox(&mut visible, format!("Channel {}", channel)).changed();
                    let recolored = ui.color_edit_button_srgb(&mut color).changed();
                    if toggled || recolored {
                        palette.ensure_channel(channel);
                        palette.channels_visible[channel] = visible;
                        palette.colors[channel] = color;
                        changed = true;
                    }
                });
            }

            ui.add_space(10.0);
            ui.heading("Blending");
            ui.separator();

            changed |= ui
                .add(egui::Slider::new(&mut palette.opacity, 0.0..=1.0).text("Opacity"))
                .changed();

            ui.horizontal(|ui| {
                let mut enabled = palette.use_transparent_color;
                if ui.checkbox(&mut enabled, "Transparent colour").changed() {
                    palette.set_transparent_enabled(enabled);
                    changed = true;
                }
                let mut matte = palette.transparent_color.unwrap_or([0, 0, 0]);
                if ui.color_edit_button_srgb(&mut matte).changed() {
                    palette.transparent_color = Some(matte);
                    changed = true;
                }
            });
        });

    changed
}

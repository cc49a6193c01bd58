use eframe::egui;

use crate::utils::image_loader::ImageSource;
use crate::utils::shader_constants::MAX_CHANNELS;

/// Actions that can be triggered from the Image window
pub enum ImagePropertiesAction {
    Load(ImageSource),
    None,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// Render the Image window
pub fn render(
    ctx: &egui::Context,
    show_window: &mut bool,
    current: &ImageSource,
    remote_location: &mut String,
    loading: bool,
) -> ImagePropertiesAction {
    let mut action = ImagePropertiesAction::None;

    egui::Window::new("Image")
        .id(egui::Id::new("image_properties_window"))
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .resizable(false)
        .collapsible(false)
        .default_size([420.0, 320.0])
        .open(show_window)
        .show(ctx, |ui| {
            ui.set_min_width(400.0);
            ui.spacing_mut().item_spacing = egui::vec2(8.0, 8.0);

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Source:").strong().size(12.0));
                ui.label(
                    egui::RichText::new(current.describe())
                        .monospace()
                        .size(12.0)
                        .color(egui::Color32::from_rgb(140, 140, 150)),
                );
                if loading {
                    ui.spinner();
                }
            });

            ui.separator();

            let button_size = egui::vec2(ui.available_width(), 30.0);

            if ui
                .add_sized(button_size, egui::Button::new(egui::RichText::new("Open Image...").size(13.0)))
                .on_hover_text("Each colour component becomes a channel")
                .clicked()
            {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file()
                {
                    action = ImagePropertiesAction::Load(ImageSource::Composite {
                        location: path.to_string_lossy().to_string(),
                    });
                }
            }

            if ui
                .add_sized(
                    button_size,
                    egui::Button::new(egui::RichText::new("Open Channel Files...").size(13.0)),
                )
                .on_hover_text(format!("One grayscale file per channel, up to {}", MAX_CHANNELS))
                .clicked()
            {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_files()
                {
                    let locations = paths
                        .iter()
                        .map(|p| p.to_string_lossy().to_string())
                        .collect();
                    action = ImagePropertiesAction::Load(ImageSource::Channels { locations });
                }
            }

            if ui
                .add_sized(button_size, egui::Button::new(egui::RichText::new("Demo Image").size(13.0)))
                .clicked()
            {
                action = ImagePropertiesAction::Load(ImageSource::Demo);
            }

            ui.add_space(8.0);
            ui.label(egui::RichText::new("Remote image (http/https):").strong().size(12.0));
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(remote_location)
                        .hint_text("https://...")
                        .desired_width(300.0),
                );
                let url = remote_location.trim();
                if ui
                    .add_enabled(!url.is_empty(), egui::Button::new("Fetch"))
                    .clicked()
                {
                    action = ImagePropertiesAction::Load(ImageSource::Composite {
                        location: url.to_string(),
                    });
                }
            });
        });

    action
}

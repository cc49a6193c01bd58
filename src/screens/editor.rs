use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

use eframe::egui;

use crate::ui_components::image_properties::{self, ImagePropertiesAction};
use crate::ui_components::{settings_menu, shader_editor};
use crate::utils::image_loader::{spawn_image_load, ChannelImage, ImageSource};
use crate::utils::palette::PaletteConfig;
use crate::utils::pipeline::WgpuSurfaceFactory;
use crate::utils::shader_constants::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::utils::shader_program::ShaderProgram;
use crate::utils::session::compile_into;
use crate::utils::surface_manager::{CameraTransform, Pane, PaneStatus, RenderSurfaceManager};
use crate::utils::theme::{EDITOR_BACKGROUND, PANE_BACKGROUND};
use crate::utils::url_state::{
    default_shader_text, settle_location, LocationStore, SessionLocation,
};
use crate::utils::{
    apply_editor_theme, format_shader_error, ImageError, NotificationManager, ShaderError,
};

/// Scroll points per doubling of zoom.
const ZOOM_SCROLL_SCALE: f32 = 300.0;

/// Everything the window needs, resolved by `main` from CLI and config.
pub struct Launch {
    pub location: SessionLocation,
    pub store: Option<LocationStore>,
    pub image: ImageSource,
    pub palette: PaletteConfig,
    pub editor_font_size: f32,
}

type ImageLoad = Receiver<Result<ChannelImage, ImageError>>;

pub struct PlaygroundApp {
    // Edit buffer; never applied until Compile succeeds
    editor_text: String,

    // Applied state
    location: SessionLocation,
    store: Option<LocationStore>,
    manager: Option<RenderSurfaceManager<WgpuSurfaceFactory>>,

    // Image
    image_source: ImageSource,
    image_load: Option<ImageLoad>,
    initial_load: bool,
    remote_location: String,

    // UI state
    palette: PaletteConfig,
    editor_font_size: f32,
    show_settings: bool,
    show_image_window: bool,
    show_error_window: bool,
    error_message: String,

    notifications: NotificationManager,
}

impl PlaygroundApp {
    pub fn new(cc: &eframe::CreationContext<'_>, launch: Launch) -> Self {
        log::info!("Initializing PlaygroundApp at {}", launch.location);

        let mut location = launch.location;
        let (applied_text, was_reset) = settle_location(&mut location);
        let applied = ShaderProgram::split(&applied_text);

        let manager = match cc.wgpu_render_state.as_ref() {
            Some(render_state) => Some(RenderSurfaceManager::new(
                WgpuSurfaceFactory::new(render_state),
                applied,
                launch.palette.clone(),
            )),
            None => {
                log::error!("No wgpu render state; panes will stay empty");
                None
            }
        };

        let mut app = Self {
            editor_text: applied_text,
            location,
            store: launch.store,
            manager,
            image_source: launch.image.clone(),
            image_load: None,
            initial_load: true,
            remote_location: String::new(),
            palette: launch.palette,
            editor_font_size: launch.editor_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
            show_settings: false,
            show_image_window: false,
            show_error_window: false,
            error_message: String::new(),
            notifications: NotificationManager::new(),
        };

        if was_reset {
            app.persist_location();
        }
        app.start_image_load(launch.image);

        log::info!("PlaygroundApp initialization complete");
        app
    }

    fn start_image_load(&mut self, source: ImageSource) {
        log::info!("Loading image: {}", source.describe());
        self.image_source = source.clone();
        self.image_load = Some(spawn_image_load(source));
    }

    fn poll_image_load(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.image_load else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => {
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
                return;
            }
            Err(TryRecvError::Disconnected) => {
                log::error!("Image loader exited without a result");
                self.image_load = None;
                return;
            }
        };
        self.image_load = None;
        let initial = std::mem::replace(&mut self.initial_load, false);

        match result {
            Ok(image) => {
                let channels = image.channel_count();
                if let Some(manager) = &mut self.manager {
                    if let Err(err) = manager.set_image(Arc::new(image)) {
                        self.show_error(&err);
                        return;
                    }
                }
                if !initial {
                    self.notifications
                        .success(format!("Loaded {} ({} channels)", self.image_source.describe(), channels));
                }
            }
            Err(err) => {
                log::error!("Image load failed: {}", err);
                if !initial {
                    self.notifications.error(format!("Could not load image: {}", err));
                }
            }
        }
    }

    fn compile(&mut self) {
        log::info!("Compile requested ({} bytes)", self.editor_text.len());
        self.notifications.dismiss_all();

        let compiled = compile_into(&self.editor_text, &mut self.location, self.manager.as_mut());
        let program = match compiled {
            Ok(program) => program,
            Err(err) => {
                self.show_error(&err);
                return;
            }
        };
        match &self.manager {
            Some(manager) => log::info!(
                "Custom pane runs {} ({} compiled modules cached)",
                manager.applied_program().module_key(),
                manager.factory().cached_modules()
            ),
            None => log::info!("No panes yet, {} stored in location", program.module_key()),
        }

        self.persist_location();
        self.show_error_window = false;
        self.notifications.success("Shader compiled successfully!");
        log::info!("Shader compiled successfully");
    }

    fn reset_editor(&mut self) {
        log::info!("Resetting editor to the default shader");
        self.editor_text = default_shader_text();
    }

    fn copy_link(&mut self, ctx: &egui::Context) {
        let link = self.location.share_link(&self.editor_text);
        log::debug!("Copying share link ({} bytes)", link.len());
        ctx.copy_text(link);
        self.notifications.info("Link copied to clipboard");
    }

    fn persist_location(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.location) {
                log::warn!("Could not save location to {}: {}", store.path().display(), e);
            }
        }
    }

    fn show_error(&mut self, err: &ShaderError) {
        let formatted = format_shader_error(err);
        log::error!("Shader error: {}", formatted);
        self.error_message = formatted;
        self.show_error_window = true;
    }

    fn channel_count(&self) -> usize {
        self.manager
            .as_ref()
            .and_then(|m| m.image())
            .map(|image| image.channel_count())
            .unwrap_or(0)
    }
}

impl eframe::App for PlaygroundApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        apply_editor_theme(ctx, self.editor_font_size);

        self.handle_input(ctx);
        self.poll_image_load(ctx);

        egui::SidePanel::left("editor_panel")
            .resizable(true)
            .default_width(640.0)
            .frame(egui::Frame::default().inner_margin(0.0).fill(EDITOR_BACKGROUND))
            .show(ctx, |ui| {
                self.render_editor_panel(ui, ctx);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(PANE_BACKGROUND))
            .show(ctx, |ui| {
                self.render_panes(ui);
            });

        let channel_count = self.channel_count();
        if settings_menu::settings_overlay(
            ctx,
            &mut self.show_settings,
            &mut self.palette,
            channel_count,
            &mut self.editor_font_size,
        ) {
            if let Some(manager) = &mut self.manager {
                manager.set_palette(self.palette.clone());
            }
        }

        let loading = self.image_load.is_some();
        if self.show_image_window {
            match image_properties::render(
                ctx,
                &mut self.show_image_window,
                &self.image_source,
                &mut self.remote_location,
                loading,
            ) {
                ImagePropertiesAction::Load(source) => self.start_image_load(source),
                ImagePropertiesAction::None => {}
            }
        }

        if self.notifications.has_notifications() {
            self.notifications.render(ctx);
        }

        if self.show_error_window {
            self.render_error_window(ctx);
        }
    }
}

impl PlaygroundApp {
    fn render_editor_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.spacing_mut().item_spacing = egui::vec2(0.0, 0.0);

        ui.vertical(|ui| {
            // Top bar: image + settings
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing = egui::vec2(4.0, 0.0);
                ui.add_space(6.0);
                ui.label(egui::RichText::new("Shader").size(15.0).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_space(6.0);
                    if ui.button("⚙").on_hover_text("Palette & editor settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if ui.button("Open image…").clicked() {
                        self.show_image_window = true;
                    }
                });
            });

            ui.separator();

            let button_height = 40.0;
            let reserved = button_height + 1.0;
            let available_height = ui.available_height();

            ui.allocate_ui_with_layout(
                egui::vec2(ui.available_width(), available_height - reserved),
                egui::Layout::top_down(egui::Align::LEFT),
                |ui| {
                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            shader_editor::render_shader_editor(
                                ui,
                                &mut self.editor_text,
                                "glsl_editor",
                                self.editor_font_size,
                            );
                        });
                },
            );

            ui.separator();

            let available_rect = ui.available_rect_before_wrap();
            let spacing = 4.0;

            let (compile_clicked, reset_clicked, copy_clicked) = ui
                .allocate_ui_with_layout(
                    egui::vec2(available_rect.width(), button_height),
                    egui::Layout::left_to_right(egui::Align::Center),
                    |ui| {
                        ui.spacing_mut().item_spacing = egui::vec2(spacing, 0.0);
                        ui.spacing_mut().button_padding = egui::vec2(0.0, 6.0);

                        let button_w = (available_rect.width() - 2.0 * spacing) / 3.0;
                        let button = |label: &str| {
                            egui::Button::new(egui::RichText::new(label).size(15.0).strong())
                        };

                        let compile = ui
                            .add_sized([button_w, button_height], button("Compile"))
                            .on_hover_text("Validate and apply (Ctrl+Enter)")
                            .clicked();
                        let reset = ui
                            .add_sized([button_w, button_height], button("Reset"))
                            .on_hover_text("Replace the editor text with the default shader")
                            .clicked();
                        let copy = ui
                            .add_sized([button_w, button_height], button("Copy link"))
                            .on_hover_text("Copy a link to the text in the editor")
                            .clicked();

                        (compile, reset, copy)
                    },
                )
                .inner;

            if compile_clicked {
                self.compile();
            }
            if reset_clicked {
                self.reset_editor();
            }
            if copy_clicked {
                self.copy_link(ctx);
            }
        });
    }

    fn render_panes(&mut self, ui: &mut egui::Ui) {
        let loading = self.image_load.is_some();
        let Some(manager) = &mut self.manager else {
            ui.centered_and_justified(|ui| {
                ui.label("GPU rendering unavailable");
            });
            return;
        };

        let spacing = 6.0;
        let full = ui.available_rect_before_wrap();
        let pane_w = (full.width() - spacing) / 2.0;

        for (index, pane) in Pane::ALL.into_iter().enumerate() {
            let min = egui::pos2(full.left() + index as f32 * (pane_w + spacing), full.top());
            let outer = egui::Rect::from_min_size(min, egui::vec2(pane_w, full.height()));
            let header = egui::Rect::from_min_size(outer.min, egui::vec2(pane_w, 24.0));
            let body = egui::Rect::from_min_max(egui::pos2(outer.left(), header.bottom()), outer.max);

            ui.painter().text(
                header.left_center() + egui::vec2(6.0, 0.0),
                egui::Align2::LEFT_CENTER,
                pane.label(),
                egui::FontId::proportional(14.0),
                egui::Color32::from_gray(200),
            );

            let mut response = ui.interact(body, ui.id().with(pane), egui::Sense::click_and_drag());
            if let Some(surface) = manager.surface(pane) {
                response = response.on_hover_text(format!(
                    "{}\nDrag to pan, scroll to zoom, double-click to reset",
                    surface.label()
                ));
            }
            let target = manager
                .surface(pane)
                .map_or(body, |surface| fit_rect(body, surface.image_size()));
            let mut camera = manager.camera();
            if response.dragged() {
                camera = camera.pan_by(drag_fraction(response.drag_delta(), target));
            }
            if response.hovered() {
                let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                if scroll != 0.0 {
                    camera = camera.zoom_by(2f32.powf(scroll / ZOOM_SCROLL_SCALE));
                }
            }
            if response.double_clicked() {
                camera = CameraTransform::default();
            }
            manager.update_camera(pane, camera);

            match manager.surface(pane) {
                Some(surface) => {
                    ui.painter()
                        .add(egui_wgpu::Callback::new_paint_callback(target, surface.callback()));
                }
                None => {
                    let message = match manager.status(pane) {
                        _ if loading => "Loading image…",
                        PaneStatus::Destroyed => "Closed",
                        _ => "No image",
                    };
                    ui.painter().text(
                        body.center(),
                        egui::Align2::CENTER_CENTER,
                        message,
                        egui::FontId::proportional(14.0),
                        egui::Color32::from_gray(140),
                    );
                }
            }
        }
    }

    fn render_error_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("Shader Error")
            .collapsible(false)
            .resizable(true)
            .default_width(600.0)
            .default_height(450.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(550.0);

                egui::ScrollArea::vertical().max_height(380.0).show(ui, |ui| {
                    ui.add_space(8.0);
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(&self.error_message)
                                .color(egui::Color32::from_rgb(255, 120, 120))
                                .size(13.0)
                                .family(egui::FontFamily::Monospace),
                        )
                        .selectable(true),
                    );
                    ui.add_space(10.0);
                });

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(5.0);

                ui.horizontal(|ui| {
                    ui.add_space(ui.available_width() - 70.0);
                    if ui.button("  Close  ").clicked() {
                        self.show_error_window = false;
                    }
                });
            });
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let (compile, bigger, smaller) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::Enter),
                i.modifiers.command && i.key_pressed(egui::Key::Plus),
                i.modifiers.command && i.key_pressed(egui::Key::Minus),
            )
        });
        if bigger {
            self.editor_font_size = (self.editor_font_size + 2.0).min(MAX_FONT_SIZE);
        }
        if smaller {
            self.editor_font_size = (self.editor_font_size - 2.0).max(MIN_FONT_SIZE);
        }
        if compile {
            self.compile();
        }
    }
}

/// Largest rect with the image's aspect ratio, centred in `area`.
fn fit_rect(area: egui::Rect, image_size: [u32; 2]) -> egui::Rect {
    let [w, h] = image_size;
    if w == 0 || h == 0 || area.width() <= 0.0 || area.height() <= 0.0 {
        return area;
    }
    let aspect = w as f32 / h as f32;
    let size = if area.width() / area.height() > aspect {
        egui::vec2(area.height() * aspect, area.height())
    } else {
        egui::vec2(area.width(), area.width() / aspect)
    };
    egui::Rect::from_center_size(area.center(), size)
}

/// Drag delta as a fraction of the drawn image, so the image follows the pointer.
fn drag_fraction(delta: egui::Vec2, target: egui::Rect) -> [f32; 2] {
    if target.width() <= 0.0 || target.height() <= 0.0 {
        return [0.0, 0.0];
    }
    [delta.x / target.width(), delta.y / target.height()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_is_relative_to_fitted_image() {
        let body = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(400.0, 200.0));
        let target = fit_rect(body, [100, 100]);
        // letterboxed to 200x200: a 100pt drag moves half the image, not a quarter
        assert_eq!(drag_fraction(egui::vec2(100.0, 50.0), target), [0.5, 0.25]);
    }

    #[test]
    fn test_drag_over_empty_target_is_ignored() {
        let empty = egui::Rect::from_min_size(egui::pos2(5.0, 5.0), egui::vec2(0.0, 0.0));
        assert_eq!(drag_fraction(egui::vec2(10.0, 10.0), empty), [0.0, 0.0]);
    }

    #[test]
    fn test_fit_rect_letterboxes_wide_area() {
        let area = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(400.0, 200.0));
        let fitted = fit_rect(area, [100, 100]);
        assert_eq!(fitted.size(), egui::vec2(200.0, 200.0));
        assert_eq!(fitted.center(), area.center());
    }

    #[test]
    fn test_fit_rect_ignores_empty_image() {
        let area = egui::Rect::from_min_size(egui::pos2(10.0, 10.0), egui::vec2(300.0, 100.0));
        assert_eq!(fit_rect(area, [0, 0]), area);
    }
}

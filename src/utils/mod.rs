pub mod config;
pub mod errors;
pub mod glsl_syntax;
pub mod image_loader;
pub mod notification;
pub mod palette;
pub mod panic_handler;
pub mod pipeline;
pub mod session;
pub mod shader_constants;
pub mod shader_program;
pub mod shader_validator;
pub mod surface_manager;
pub mod theme;
pub mod url_state;

pub use errors::{format_shader_error, ImageError, ShaderError};
pub use notification::NotificationManager;
pub use theme::apply_editor_theme;

pub mod image_properties;
pub mod settings_menu;
pub mod shader_editor;

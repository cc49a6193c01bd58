//! Two-part shader program: template helpers plus the injected snippet.
//!
//! The editor shows both parts as one buffer separated by
//! [`INJECTION_MARKER`]; everything else in the crate works with the
//! explicit [`ShaderProgram`] fields.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::utils::shader_constants::DEFAULT_INJECTION;

/// Literal line separating the template from the injected snippet.
pub const INJECTION_MARKER: &str = "// Injection point:";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderProgram {
    /// Declarations and helper functions (must define `mutate_color`).
    pub template: String,
    /// Statements spliced into the fragment `main` at the hook point.
    pub injection: String,
}

impl ShaderProgram {
    pub fn new(template: impl Into<String>, injection: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            injection: injection.into(),
        }
    }

    /// Split an editor buffer at the first marker. Never fails.
    pub fn split(text: &str) -> Self {
        match text.find(INJECTION_MARKER) {
            Some(idx) => Self {
                template: text[..idx].trim().to_string(),
                injection: text[idx + INJECTION_MARKER.len()..].trim().to_string(),
            },
            None => Self {
                template: text.trim().to_string(),
                injection: DEFAULT_INJECTION.trim().to_string(),
            },
        }
    }

    /// Single-buffer view for the editor widget.
    pub fn join(&self) -> String {
        format!("{}\n\n{}\n{}\n", self.template, INJECTION_MARKER, self.injection)
    }

    /// Content hash of both parts, used to label and cache compiled modules.
    pub fn module_key(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("palette_shader_{:016x}", hasher.finish())
    }
}

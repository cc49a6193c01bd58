//! Compile flow shared by the Compile button and Ctrl+Enter.
//!
//! Nothing is committed until the program validated and the custom pane
//! accepted it: on any error the location and the applied program are left
//! as they were.

use crate::utils::shader_program::ShaderProgram;
use crate::utils::shader_validator::validate_program;
use crate::utils::surface_manager::{RenderSurfaceManager, SurfaceFactory};
use crate::utils::url_state::{encode_shader, settle_location, SessionLocation};
use crate::utils::ShaderError;

/// Validate `text`, write its token into `location` and rebind the custom
/// pane. Returns the program now applied.
///
/// Without a manager (no GPU yet) only the location is updated; the manager
/// picks the program up from the location when it is created.
pub fn compile_into<F: SurfaceFactory>(
    text: &str,
    location: &mut SessionLocation,
    manager: Option<&mut RenderSurfaceManager<F>>,
) -> Result<ShaderProgram, ShaderError> {
    validate_program(&ShaderProgram::split(text))?;

    let mut next = location.clone();
    next.set_token(&encode_shader(text));
    let (applied_text, _) = settle_location(&mut next);
    let program = ShaderProgram::split(&applied_text);

    if let Some(manager) = manager {
        manager.apply_program(program.clone())?;
    }

    *location = next;
    Ok(program)
}

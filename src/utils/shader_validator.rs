//! GLSL Shader Validation
//!
//! Validates a program before it is applied so a broken edit never reaches
//! the pipeline. The program is composed with the host prelude and `main`
//! wrapper, then parsed as a fragment stage by naga's GLSL frontend.

use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{AddressSpace, Module, ShaderStage};

use crate::utils::shader_constants::{compose_fragment, USER_UNIFORM_GROUP};
use crate::utils::shader_program::ShaderProgram;
use crate::utils::ShaderError;

/// Parse and validate the composed fragment stage of `program`.
pub fn validate_program(program: &ShaderProgram) -> Result<(), ShaderError> {
    let src = compose_fragment(program);
    parse_and_validate(program, &src).map(|_| ())
}

/// Translated fragment stage plus what the pipeline must bind for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFragment {
    pub wgsl: String,
    /// Size of the template's own uniform block, 0 when it declares none.
    pub user_uniform_bytes: u64,
}

/// Validate and translate to WGSL for the wgpu backend.
pub fn compile_program(program: &ShaderProgram) -> Result<CompiledFragment, ShaderError> {
    let src = compose_fragment(program);
    let (module, info) = parse_and_validate(program, &src)?;
    let wgsl = naga::back::wgsl::write_string(&module, &info, naga::back::wgsl::WriterFlags::empty())
        .map_err(|e| {
            log::error!("WGSL generation failed: {}", e);
            ShaderError::Translation(e.to_string())
        })?;
    Ok(CompiledFragment {
        wgsl,
        user_uniform_bytes: user_uniform_bytes(&module),
    })
}

fn user_uniform_bytes(module: &Module) -> u64 {
    module
        .global_variables
        .iter()
        .filter(|(_, var)| {
            var.space == AddressSpace::Uniform
                && var.binding.as_ref().is_some_and(|b| b.group == USER_UNIFORM_GROUP)
        })
        .map(|(_, var)| module.types[var.ty].inner.size(module.to_ctx()) as u64)
        .max()
        .unwrap_or(0)
}

fn parse_and_validate(
    program: &ShaderProgram,
    src: &str,
) -> Result<(Module, ModuleInfo), ShaderError> {
    if program.template.trim().is_empty() {
        return Err(ShaderError::Empty);
    }

    log::debug!("Validating GLSL with naga parser ({} bytes)", src.len());
    let mut frontend = Frontend::default();
    let options = Options::from(ShaderStage::Fragment);
    let module = match frontend.parse(&options, src) {
        Ok(module) => {
            log::debug!("Naga parse successful");
            module
        }
        Err(parse_errors) => {
            let error_msg = parse_errors.emit_to_string(src);
            log::error!("Shader parse failed: {}", error_msg);
            return Err(ShaderError::Parse(error_msg));
        }
    };

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    match validator.validate(&module) {
        Ok(info) => {
            log::debug!("Naga validation passed");
            Ok((module, info))
        }
        Err(validation_error) => {
            let error_msg = validation_error.emit_to_string(src);
            log::error!("Shader validation failed: {}", error_msg);
            Err(ShaderError::Validation(error_msg))
        }
    }
}

//! Panic Handling and Recovery
//!
//! wgpu reports validation failures by panicking. Surface creation runs
//! inside `catch_panic_mut` so a bad pipeline turns into a `ShaderError`
//! instead of taking the whole playground down.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::utils::errors::panic_to_string;
use crate::utils::ShaderError;

/// Catch panics from a mutable closure
///
/// Uses `AssertUnwindSafe`; only wrap code that leaves no half-written
/// state behind when it unwinds (GPU object construction does not).
pub fn catch_panic_mut<F, T>(f: F) -> Result<T, ShaderError>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Ok(result),
        Err(panic_info) => {
            let message = panic_to_string(panic_info);
            log::error!("Caught panic: {}", message);
            Err(ShaderError::Gpu(format_panic_message(&message)))
        }
    }
}

/// Extracts the most relevant part of a panic message for display.
pub fn format_panic_message(panic_msg: &str) -> String {
    // wgpu errors carry a "wgpu error:" prefix somewhere in the message
    if let Some(start) = panic_msg.find("wgpu error:") {
        return panic_msg[start..].to_string();
    }
    panic_msg.to_string()
}

use std::any::Any;

use thiserror::Error;

/// Errors produced while checking or building a palette shader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    #[error("Shader template is empty")]
    Empty,
    /// Parser diagnostic, kept verbatim for the error window.
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Validation(String),
    #[error("WGSL generation failed: {0}")]
    Translation(String),
    #[error("GPU error: {0}")]
    Gpu(String),
}

/// A URL fragment that does not hold usable shader text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateDecodeError {
    #[error("no shader state in location")]
    Empty,
    #[error("location token is not base64url: {0}")]
    Base64(String),
    #[error("location token is not UTF-8 text")]
    Utf8,
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid location url: {0}")]
    Parse(#[from] url::ParseError),
    #[error("location store i/o: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to fetch image {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
    #[error("failed to decode image {location}: {source}")]
    Decode {
        location: String,
        source: image::ImageError,
    },
    #[error("image has no channels")]
    NoChannels,
    #[error("channel {index} is {actual:?} but the first channel is {expected:?}")]
    SizeMismatch {
        index: usize,
        expected: [u32; 2],
        actual: [u32; 2],
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Title and body text for the shader error window.
pub fn format_shader_error(err: &ShaderError) -> String {
    match err {
        ShaderError::Empty => "Shader template is empty.\n\nAdd the template helpers above the injection marker.".to_string(),
        ShaderError::Parse(msg) => format!("GLSL Parse Error\n\n{}", msg),
        ShaderError::Validation(msg) => format!("GLSL Validation Error\n\n{}", msg),
        ShaderError::Translation(msg) => format!("Shader Translation Error\n\n{}", msg),
        ShaderError::Gpu(msg) => format!("GPU Error\n\n{}", msg),
    }
}

pub fn panic_to_string(e: Box<dyn Any + Send>) -> String {
    let any = &*e;
    if let Some(s) = any.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = any.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic occurred while building a render surface".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_is_verbatim() {
        let err = ShaderError::Parse("error: expected ';'".to_string());
        assert_eq!(err.to_string(), "error: expected ';'");
        assert!(format_shader_error(&err).ends_with("error: expected ';'"));
    }

    #[test]
    fn test_panic_to_string() {
        let msg = panic_to_string(Box::new("boom"));
        assert_eq!(msg, "boom");
        let msg = panic_to_string(Box::new(String::from("owned")));
        assert_eq!(msg, "owned");
        let msg = panic_to_string(Box::new(7u32));
        assert!(msg.contains("Unknown panic"));
    }
}

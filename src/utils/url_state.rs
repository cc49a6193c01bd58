//! Shareable shader state: base64url tokens in the location fragment.
//!
//! The location is the only persisted state. It is rewritten by Compile and
//! by the first-visit reset, never by typing.

use std::fs;
use std::path::{Path, PathBuf};

use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use url::Url;

use crate::utils::config::APP_DIR;
use crate::utils::errors::{LocationError, StateDecodeError};
use crate::utils::shader_constants::build_default_program;

/// RFC 4648 §5 alphabet, padded on encode, padding optional on decode.
const FRAGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn encode_shader(text: &str) -> String {
    FRAGMENT_ENGINE.encode(text.as_bytes())
}

pub fn decode_shader(token: &str) -> Result<String, StateDecodeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(StateDecodeError::Empty);
    }
    let bytes = FRAGMENT_ENGINE
        .decode(token.as_bytes())
        .map_err(|e| StateDecodeError::Base64(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| StateDecodeError::Utf8)
}

/// The editor text a first visit starts from.
pub fn default_shader_text() -> String {
    build_default_program().join()
}

/// Current "page address": a URL whose fragment carries the applied shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLocation {
    url: Url,
}

impl SessionLocation {
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        Ok(Self {
            url: Url::parse(input.trim())?,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.url.fragment().filter(|f| !f.is_empty())
    }

    pub fn set_token(&mut self, token: &str) {
        self.url.set_fragment(Some(token));
    }

    pub fn clear_token(&mut self) {
        self.url.set_fragment(None);
    }

    /// Fully-qualified link carrying `text`, independent of the applied state.
    pub fn share_link(&self, text: &str) -> String {
        let mut url = self.url.clone();
        url.set_fragment(Some(&encode_shader(text)));
        url.into()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for SessionLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    /// The fragment held usable shader text.
    FromLocation(String),
    /// The fragment was missing or unusable and now holds the default.
    Reset(StateDecodeError),
}

/// Read the applied shader text from the location, rewriting the fragment
/// to the encoded default when it is missing or invalid.
pub fn restore_applied_text(location: &mut SessionLocation) -> Restored {
    let decoded = location
        .token()
        .ok_or(StateDecodeError::Empty)
        .and_then(decode_shader)
        .and_then(|text| {
            if text.trim().is_empty() {
                Err(StateDecodeError::Empty)
            } else {
                Ok(text)
            }
        });
    match decoded {
        Ok(text) => Restored::FromLocation(text),
        Err(reason) => {
            log::info!("No usable shader in location ({}), resetting to default", reason);
            location.set_token(&encode_shader(&default_shader_text()));
            Restored::Reset(reason)
        }
    }
}

/// Restore, resetting at most once. Returns the text and whether a reset
/// happened (the caller persists the rewritten location in that case).
pub fn settle_location(location: &mut SessionLocation) -> (String, bool) {
    match restore_applied_text(location) {
        Restored::FromLocation(text) => (text, false),
        Restored::Reset(_) => match restore_applied_text(location) {
            Restored::FromLocation(text) => (text, true),
            Restored::Reset(_) => (default_shader_text(), true),
        },
    }
}

/// Where a session starts: an explicit link wins, then the stored location,
/// then `base_url` with no fragment. `reset` drops whatever fragment was found.
pub fn resolve_start_location(
    explicit: Option<&str>,
    store: Option<&LocationStore>,
    base_url: &str,
    reset: bool,
) -> Result<SessionLocation, LocationError> {
    let stored = match store.map(LocationStore::load) {
        Some(Ok(found)) => found,
        Some(Err(e)) => {
            log::warn!("Ignoring unreadable stored location: {}", e);
            None
        }
        None => None,
    };
    let mut location = match (explicit, stored) {
        (Some(link), _) => SessionLocation::parse(link)?,
        (None, Some(found)) => found,
        (None, None) => SessionLocation::parse(base_url)?,
    };
    if reset {
        log::info!("Discarding stored shader state");
        location.clear_token();
    }
    Ok(location)
}

/// Keeps the location across restarts, standing in for the address bar.
pub struct LocationStore {
    path: PathBuf,
}

impl LocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/glsl-palette-playground/location`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_DIR).join("location"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` on a first visit.
    pub fn load(&self) -> Result<Option<SessionLocation>, LocationError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        SessionLocation::parse(&raw).map(Some)
    }

    pub fn save(&self, location: &SessionLocation) -> Result<(), LocationError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, location.as_str())?;
        log::debug!("Saved location to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "glsl-playground://session/view?image=demo";

    #[test]
    fn test_round_trip_unicode_text() {
        let samples = [
            "a",
            "void main() {}\n// Injection point:\nrgba = vec4(1.0);",
            "ünïcødé → 顕微鏡 🔬",
            "??>>>",
            "   leading and trailing   ",
        ];
        for text in samples {
            assert_eq!(decode_shader(&encode_shader(text)).as_deref(), Ok(text));
        }
    }

    #[test]
    fn test_token_is_fragment_safe() {
        // bytes chosen so standard base64 would emit '+' and '/'
        let token = encode_shader("\u{3ff}\u{3ff}??>>~~~>");
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));
    }

    #[test]
    fn test_decode_rejects_invalid() {
        assert_eq!(decode_shader(""), Err(StateDecodeError::Empty));
        assert!(matches!(decode_shader("not base64!"), Err(StateDecodeError::Base64(_))));
        assert!(matches!(decode_shader("a+b/"), Err(StateDecodeError::Base64(_))));
        // 0xff 0xfe is valid base64url but not UTF-8
        assert_eq!(decode_shader("__4"), Err(StateDecodeError::Utf8));
    }

    #[test]
    fn test_decode_accepts_unpadded() {
        let padded = encode_shader("ab");
        assert!(padded.ends_with('='));
        let unpadded = padded.trim_end_matches('=');
        assert_eq!(decode_shader(unpadded).as_deref(), Ok("ab"));
    }

    #[test]
    fn test_empty_fragment_settles_after_one_reset() {
        let mut location = SessionLocation::parse(BASE).unwrap();
        assert_eq!(location.token(), None);
        let (text, reset) = settle_location(&mut location);
        assert!(reset);
        assert_eq!(text, default_shader_text());
        assert_eq!(location.token(), Some(encode_shader(&default_shader_text()).as_str()));

        // the next visit keeps the state it settled on
        let (again, reset_again) = settle_location(&mut location);
        assert!(!reset_again);
        assert_eq!(again, text);
    }

    #[test]
    fn test_invalid_fragment_is_replaced() {
        let mut location = SessionLocation::parse(&format!("{}#%%%", BASE)).unwrap();
        match restore_applied_text(&mut location) {
            Restored::Reset(_) => {}
            other => panic!("expected reset, got {:?}", other),
        }
        assert!(matches!(restore_applied_text(&mut location), Restored::FromLocation(_)));
    }

    #[test]
    fn test_share_link_keeps_query_and_replaces_fragment() {
        let mut location = SessionLocation::parse(BASE).unwrap();
        location.set_token(&encode_shader("applied"));
        let link = location.share_link("edited");
        assert!(link.starts_with("glsl-playground://session/view?image=demo#"));
        let shared = SessionLocation::parse(&link).unwrap();
        assert_eq!(decode_shader(shared.token().unwrap()).as_deref(), Ok("edited"));
        // the applied state is untouched
        assert_eq!(decode_shader(location.token().unwrap()).as_deref(), Ok("applied"));
    }

    #[test]
    fn test_start_location_precedence() {
        let dir = std::env::temp_dir().join(format!("palette-start-{}", std::process::id()));
        let store = LocationStore::new(dir.join("location"));

        let fresh = resolve_start_location(None, Some(&store), BASE, false).unwrap();
        assert_eq!(fresh.as_str(), BASE);

        let mut saved = SessionLocation::parse(BASE).unwrap();
        saved.set_token(&encode_shader("stored"));
        store.save(&saved).unwrap();
        let restored = resolve_start_location(None, Some(&store), BASE, false).unwrap();
        assert_eq!(restored, saved);

        let link = saved.share_link("linked");
        let opened = resolve_start_location(Some(&link), Some(&store), BASE, false).unwrap();
        assert_eq!(decode_shader(opened.token().unwrap()).as_deref(), Ok("linked"));

        let reset = resolve_start_location(None, Some(&store), BASE, true).unwrap();
        assert_eq!(reset.token(), None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_start_location_rejects_bad_link() {
        assert!(matches!(
            resolve_start_location(Some("not a url"), None, BASE, false),
            Err(LocationError::Parse(_))
        ));
    }

    #[test]
    fn test_location_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("palette-location-{}", std::process::id()));
        let store = LocationStore::new(dir.join("location"));
        assert!(store.load().unwrap().is_none());

        let mut location = SessionLocation::parse(BASE).unwrap();
        location.set_token(&encode_shader("saved shader"));
        store.save(&location).unwrap();
        assert_eq!(store.load().unwrap(), Some(location));

        let _ = fs::remove_dir_all(&dir);
    }
}

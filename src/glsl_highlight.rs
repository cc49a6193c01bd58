use eframe::egui::{text::{LayoutJob, TextFormat}, Color32, FontId};

use crate::utils::glsl_syntax::{INTRINSICS, KEYWORDS, PALETTE_NAMES, TYPES};
use crate::utils::shader_program::INJECTION_MARKER;

// GLSL highlighter for the plain TextEdit fallback. No external crates.
// Highlights: keywords, types, intrinsics, palette names, preprocessor lines,
// numbers, comments, the injection marker, punctuation.

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn peek_non_ws(chars: &[char], mut i: usize) -> Option<char> {
    while i < chars.len() {
        let c = chars[i];
        if !c.is_whitespace() { return Some(c); }
        i += 1;
    }
    None
}

fn starts_with_at(chars: &[char], i: usize, needle: &str) -> bool {
    let mut j = i;
    for n in needle.chars() {
        if j >= chars.len() || chars[j] != n { return false; }
        j += 1;
    }
    true
}

pub fn layout_job_from_str(src: &str, font_size: f32) -> LayoutJob {
    let mut job = LayoutJob::default();
    let mono = FontId::monospace(font_size);

    // Colors
    let col_kw = Color32::from_rgb(220, 140, 60);       // keywords / qualifiers
    let col_ty = Color32::from_rgb(170, 120, 230);      // types
    let col_intr = Color32::from_rgb(120, 180, 255);    // intrinsics
    let col_palette = Color32::from_rgb(110, 200, 230); // host palette names
    let col_pre = Color32::from_rgb(200, 170, 90);      // #version etc.
    let col_num = Color32::from_rgb(230, 170, 90);      // numbers
    let col_cmt = Color32::from_rgb(90, 180, 120);      // comments
    let col_marker = Color32::from_rgb(255, 210, 90);   // injection marker
    let col_punc = Color32::from_gray(180);             // punctuation

    let tf = |color: Color32| TextFormat { font_id: mono.clone(), color, ..Default::default() };
    let tf_default = tf(Color32::WHITE);
    let tf_kw = tf(col_kw);
    let tf_ty = tf(col_ty);
    let tf_intr = tf(col_intr);
    let tf_palette = tf(col_palette);
    let tf_pre = tf(col_pre);
    let tf_num = tf(col_num);
    let tf_cmt = TextFormat { font_id: mono.clone(), color: col_cmt, italics: true, ..Default::default() };
    let tf_marker = TextFormat {
        font_id: mono.clone(),
        color: col_marker,
        background: Color32::from_rgb(50, 40, 10),
        ..Default::default()
    };
    let tf_punc = tf(col_punc);

    let chars: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];

        // Line comment, or the injection marker which is one
        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
            let start = i;
            let is_marker = starts_with_at(&chars, i, INJECTION_MARKER);
            i += 2;
            while i < chars.len() && chars[i] != '\n' { i += 1; }
            let s: String = chars[start..i].iter().collect();
            job.append(&s, 0.0, if is_marker { tf_marker.clone() } else { tf_cmt.clone() });
            continue;
        }

        // Block comment: /* ... */ (non-nesting)
        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '*' {
            let start = i;
            i += 2;
            while i < chars.len() {
                if i + 1 < chars.len() && chars[i] == '*' && chars[i + 1] == '/' { i += 2; break; }
                i += 1;
            }
            let s: String = chars[start..i].iter().collect();
            job.append(&s, 0.0, tf_cmt.clone());
            continue;
        }

        // Preprocessor line
        if c == '#' {
            let start = i;
            while i < chars.len() && chars[i] != '\n' { i += 1; }
            let s: String = chars[start..i].iter().collect();
            job.append(&s, 0.0, tf_pre.clone());
            continue;
        }

        // Whitespace
        if c.is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() { i += 1; }
            let s: String = chars[start..i].iter().collect();
            job.append(&s, 0.0, tf_default.clone());
            continue;
        }

        // Identifier
        if c.is_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while i < chars.len() && is_ident_char(chars[i]) { i += 1; }
            let s: String = chars[start..i].iter().collect();

            let format = if KEYWORDS.contains(&s.as_str()) {
                &tf_kw
            } else if TYPES.contains(&s.as_str()) {
                &tf_ty
            } else if PALETTE_NAMES.contains(&s.as_str()) {
                &tf_palette
            } else if peek_non_ws(&chars, i) == Some('(') && INTRINSICS.contains(&s.as_str()) {
                &tf_intr
            } else {
                &tf_default
            };
            job.append(&s, 0.0, format.clone());
            continue;
        }

        // Numbers: decimal, float with dot/exponent, hex; optional u/f suffix
        if c.is_ascii_digit() || (c == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()) {
            let start = i;
            if c == '0' && i + 1 < chars.len() && (chars[i + 1] == 'x' || chars[i + 1] == 'X') {
                i += 2;
                while i < chars.len() && chars[i].is_ascii_hexdigit() { i += 1; }
            } else {
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') { i += 1; }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') { i += 1; }
                    while i < chars.len() && chars[i].is_ascii_digit() { i += 1; }
                }
            }
            if i < chars.len() && (chars[i] == 'u' || chars[i] == 'U' || chars[i] == 'f' || chars[i] == 'F') { i += 1; }
            let s: String = chars[start..i].iter().collect();
            job.append(&s, 0.0, tf_num.clone());
            continue;
        }

        // Punctuation / symbols
        {
            let s = c.to_string();
            job.append(&s, 0.0, tf_punc.clone());
            i += 1;
        }
    }

    job
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_preserves_text() {
        let src = "#version 450\nvoid main() { float x = 1.5e3; /* c */ }\n// Injection point:\nrgba = vec4(1.0);";
        let job = layout_job_from_str(src, 14.0);
        assert_eq!(job.text, src);
    }

    #[test]
    fn test_marker_is_highlighted() {
        let src = "x;\n// Injection point:\nrgba = vec4(1.0);";
        let job = layout_job_from_str(src, 14.0);
        let marker_section = job
            .sections
            .iter()
            .find(|s| &job.text[s.byte_range.clone()] == INJECTION_MARKER)
            .expect("marker section");
        assert_eq!(marker_section.format.color, Color32::from_rgb(255, 210, 90));
    }
}

//! Centralized shader constants and boilerplate code
//!
//! The user edits only the template helpers and the injected snippet. The
//! prelude (uniform block, channel textures) and the `main` wrapper around
//! the injection hook are owned by the host and assembled here.

use crate::utils::shader_program::ShaderProgram;

/// Fixed GLSL prelude: version, stage interface, palette uniforms and the
/// channel texture array.
///
/// `PaletteParams` is std140 and must stay in sync with `PaletteUniforms`
/// in palette.rs (144 bytes).
pub const FRAGMENT_PRELUDE: &str = r#"#version 450

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 fragColor;

layout(std140, set = 0, binding = 0) uniform PaletteParams {
    vec4 colors[6];
    vec4 transparentColor;
    float opacity;
    int useTransparentColor;
    int channelCount;
    float paletteReserved;
    vec4 viewTransform;
};

layout(set = 1, binding = 0) uniform texture2DArray channels;
layout(set = 1, binding = 1) uniform sampler channelSampler;

float sampleChannel(vec2 uv, int layer) {
    return texture(sampler2DArray(channels, channelSampler), vec3(uv, float(layer))).r;
}
"#;

/// Host `main` up to the injection hook. The injected snippet sees the
/// locals `rgba` and `intensity0`..`intensity5`.
const MAIN_HEAD: &str = r#"
void main() {
    vec2 uv = (v_uv - vec2(0.5)) / viewTransform.z + viewTransform.xy;
    float intensity0 = sampleChannel(uv, 0);
    float intensity1 = sampleChannel(uv, 1);
    float intensity2 = sampleChannel(uv, 2);
    float intensity3 = sampleChannel(uv, 3);
    float intensity4 = sampleChannel(uv, 4);
    float intensity5 = sampleChannel(uv, 5);
    vec4 rgba = vec4(0.0, 0.0, 0.0, 1.0);
    {
"#;

const MAIN_TAIL: &str = r#"
    }
    bool inside = all(greaterThanEqual(uv, vec2(0.0))) && all(lessThanEqual(uv, vec2(1.0)));
    if (!inside) {
        rgba = vec4(0.0);
    }
    fragColor = rgba;
}
"#;

/// Default template: opacity/matte helper and the additive colour mixer.
pub const DEFAULT_TEMPLATE: &str = r#"// Palette inputs provided by the host:
//   vec4 colors[6]           channel colours (rgb), black when hidden
//   vec4 transparentColor    matte colour (rgb)
//   int useTransparentColor  nonzero when the matte is enabled
//   float opacity            output alpha
//   int channelCount         channels present in the image

vec4 apply_opacity(vec3 color, bool useMatte, vec3 matte, float alpha) {
    if (useMatte && all(equal(color, matte))) {
        return vec4(color, 0.0);
    }
    return vec4(color, alpha);
}

void mutate_color(inout vec3 rgb, float intensity0, float intensity1, float intensity2,
                  float intensity3, float intensity4, float intensity5) {
    rgb += clamp(intensity0, 0.0, 1.0) * colors[0].rgb;
    rgb += clamp(intensity1, 0.0, 1.0) * colors[1].rgb;
    rgb += clamp(intensity2, 0.0, 1.0) * colors[2].rgb;
    rgb += clamp(intensity3, 0.0, 1.0) * colors[3].rgb;
    rgb += clamp(intensity4, 0.0, 1.0) * colors[4].rgb;
    rgb += clamp(intensity5, 0.0, 1.0) * colors[5].rgb;
}"#;

/// Default per-fragment snippet spliced at the hook point.
pub const DEFAULT_INJECTION: &str = r#"vec3 rgb = rgba.rgb;
mutate_color(rgb, intensity0, intensity1, intensity2, intensity3, intensity4, intensity5);
rgba = apply_opacity(rgb, useTransparentColor != 0, transparentColor.rgb, opacity);"#;

/// Full-screen quad; `uv` runs 0..1 from the top-left corner.
pub const STANDARD_VERTEX: &str = r#"
struct VSOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VSOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let c = corners[vi];
    var out: VSOut;
    out.pos = vec4<f32>(c.x * 2.0 - 1.0, 1.0 - c.y * 2.0, 0.0, 1.0);
    out.uv = c;
    return out;
}
"#;

/// Entry point of the composed fragment stage.
pub const FRAGMENT_ENTRY_POINT: &str = "main";

/// Number of palette slots; GLSL has no dynamic-length uniform arrays.
pub const MAX_CHANNELS: usize = 6;

/// Default font size for the shader editor
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

/// Minimum font size for the shader editor
pub const MIN_FONT_SIZE: f32 = 8.0;

/// Maximum font size for the shader editor
pub const MAX_FONT_SIZE: f32 = 32.0;

/// Bind group of the block that collects loose template uniforms.
pub const USER_UNIFORM_GROUP: u32 = 2;

/// Template text with its file-scope `uniform <type> <name>;` declarations
/// blanked out, and those declarations as block members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistedUniforms {
    pub template: String,
    pub members: Vec<String>,
}

fn is_opaque_type(ty: &str) -> bool {
    // isampler2D, utexture2D, ... carry a one-letter sample type prefix
    let unprefixed = ty.strip_prefix(['i', 'u']).unwrap_or(ty);
    ["sampler", "texture", "image"]
        .iter()
        .any(|p| ty.starts_with(p) || unprefixed.starts_with(p))
}

/// Member text for a declaration body (`vec3 x`), or `None` when the
/// statement is not a plain non-opaque uniform variable.
fn loose_uniform_member(decl: &str) -> Option<String> {
    if decl.contains(['{', '(', '=', '/']) {
        return None;
    }
    let words: Vec<&str> = decl.split_whitespace().collect();
    let ty = words.iter().find(|w| !matches!(**w, "highp" | "mediump" | "lowp"))?;
    if words.len() < 2 || is_opaque_type(ty) {
        return None;
    }
    Some(format!("{};", words.join(" ")))
}

/// Move loose uniforms out of the template so they can live in a block
/// with an explicit set and binding. Newlines are kept, so line numbers in
/// the rest of the template do not move.
pub fn hoist_loose_uniforms(template: &str) -> HoistedUniforms {
    let bytes = template.as_bytes();
    let len = bytes.len();
    let mut out = bytes.to_vec();
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut statement_blank = true;
    let mut i = 0usize;

    while i < len {
        let b = bytes[i];

        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < len && bytes[i] != b'\n' { i += 1; }
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') { i += 1; }
            i = (i + 2).min(len);
            continue;
        }
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 { statement_blank = true; i += 1; continue; }
            }
            b';' if depth == 0 => { statement_blank = true; i += 1; continue; }
            b'#' if depth == 0 && statement_blank => {
                while i < len && bytes[i] != b'\n' { i += 1; }
                continue;
            }
            _ => {}
        }

        if depth == 0 && statement_blank && bytes[i..].starts_with(b"uniform") {
            let after = i + "uniform".len();
            let boundary = bytes.get(after).is_some_and(|c| c.is_ascii_whitespace());
            if let (true, Some(end)) = (boundary, template[after..].find(';')) {
                if let Some(member) = loose_uniform_member(&template[after..after + end]) {
                    for byte in &mut out[i..after + end + 1] {
                        if *byte != b'\n' { *byte = b' '; }
                    }
                    members.push(member);
                    i = after + end + 1;
                    continue;
                }
            }
        }

        statement_blank = false;
        i += 1;
    }

    HoistedUniforms {
        template: String::from_utf8_lossy(&out).into_owned(),
        members,
    }
}

fn user_uniform_block(members: &[String]) -> String {
    let mut block = format!(
        "\nlayout(std140, set = {}, binding = 0) uniform UserParams {{\n",
        USER_UNIFORM_GROUP
    );
    for member in members {
        block.push_str("    ");
        block.push_str(member);
        block.push('\n');
    }
    block.push_str("};\n");
    block
}

/// The built-in program shown in the baseline pane.
pub fn build_default_program() -> ShaderProgram {
    ShaderProgram::new(DEFAULT_TEMPLATE.trim(), DEFAULT_INJECTION.trim())
}

/// Assemble the complete GLSL fragment source for a program.
pub fn compose_fragment(program: &ShaderProgram) -> String {
    let mut src = String::with_capacity(
        FRAGMENT_PRELUDE.len() + program.template.len() + program.injection.len() + 1024,
    );
    let hoisted = hoist_loose_uniforms(&program.template);
    src.push_str(FRAGMENT_PRELUDE);
    if !hoisted.members.is_empty() {
        src.push_str(&user_uniform_block(&hoisted.members));
    }
    src.push('\n');
    src.push_str(&hoisted.template);
    src.push('\n');
    src.push_str(MAIN_HEAD);
    for line in program.injection.lines() {
        src.push_str("        ");
        src.push_str(line);
        src.push('\n');
    }
    src.push_str(MAIN_TAIL);
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_program_round_trips_through_editor_text() {
        let program = build_default_program();
        assert_eq!(ShaderProgram::split(&program.join()), program);
    }

    #[test]
    fn test_default_template_defines_contract_functions() {
        assert!(DEFAULT_TEMPLATE.contains("void mutate_color("));
        assert!(DEFAULT_TEMPLATE.contains("vec4 apply_opacity("));
        assert!(DEFAULT_INJECTION.contains("mutate_color(rgb, intensity0"));
    }

    #[test]
    fn test_compose_places_injection_inside_main() {
        let program = ShaderProgram::new("float helper() { return 1.0; }", "rgba = vec4(helper());");
        let src = compose_fragment(&program);
        assert!(src.starts_with("#version 450"));
        let template_at = src.find("float helper()").unwrap();
        let main_at = src.find("void main()").unwrap();
        let injection_at = src.find("rgba = vec4(helper());").unwrap();
        assert!(template_at < main_at);
        assert!(main_at < injection_at);
        assert!(injection_at < src.find("fragColor = rgba;").unwrap());
    }

    #[test]
    fn test_loose_uniforms_move_into_block() {
        let hoisted = hoist_loose_uniforms(
            "uniform vec3 x; void mutate_color(inout vec3 rgb) { rgb += x; }\nuniform  highp float gain;",
        );
        assert_eq!(hoisted.members, vec!["vec3 x;".to_string(), "highp float gain;".to_string()]);
        assert!(!hoisted.template.contains("uniform"));
        assert!(hoisted.template.contains("void mutate_color(inout vec3 rgb) { rgb += x; }"));
        assert_eq!(hoisted.template.lines().count(), 2);
    }

    #[test]
    fn test_hoisting_leaves_blocks_opaque_and_nested_alone() {
        let template = "// uniform float commented;\n\
            layout(set = 3, binding = 0) uniform texture2D extra;\n\
            uniform sampler2D tex;\n\
            uniform Block { float y; };\n\
            void f() { int uniformity = 1; }";
        let hoisted = hoist_loose_uniforms(template);
        assert!(hoisted.members.is_empty());
        assert_eq!(hoisted.template, template);
    }

    #[test]
    fn test_compose_declares_user_block() {
        let program = ShaderProgram::new("uniform vec3 x;\nvoid helper() {}", "rgba = vec4(x, 1.0);");
        let src = compose_fragment(&program);
        let block_at = src.find("uniform UserParams {").unwrap();
        assert!(src[block_at..].contains("    vec3 x;\n};"));
        assert!(src.contains(&format!("set = {}, binding = 0) uniform UserParams", USER_UNIFORM_GROUP)));
        assert!(block_at < src.find("void helper()").unwrap());
    }
}

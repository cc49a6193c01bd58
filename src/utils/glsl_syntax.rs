//! GLSL vocabulary shared by the highlighter and the code editor syntax.

pub const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "break", "continue", "return", "discard", "switch",
    "case", "default", "struct", "const", "uniform", "layout", "in", "out", "inout", "flat",
    "smooth", "highp", "mediump", "lowp", "precision", "true", "false",
];

pub const TYPES: &[&str] = &[
    "void", "bool", "int", "uint", "float", "double", "vec2", "vec3", "vec4", "ivec2", "ivec3",
    "ivec4", "uvec2", "uvec3", "uvec4", "bvec2", "bvec3", "bvec4", "mat2", "mat3", "mat4",
    "sampler", "sampler2D", "sampler2DArray", "texture2D", "texture2DArray",
];

pub const INTRINSICS: &[&str] = &[
    "abs", "min", "max", "clamp", "mix", "step", "smoothstep", "dot", "cross", "normalize",
    "length", "distance", "pow", "exp", "log", "sin", "cos", "tan", "floor", "ceil", "fract",
    "sqrt", "inversesqrt", "all", "any", "equal", "notEqual", "lessThan", "greaterThan",
    "lessThanEqual", "greaterThanEqual", "texture",
];

/// Host-provided names the template and injection may use.
pub const PALETTE_NAMES: &[&str] = &[
    "colors", "opacity", "transparentColor", "useTransparentColor", "channelCount",
    "mutate_color", "apply_opacity", "rgba", "intensity0", "intensity1", "intensity2",
    "intensity3", "intensity4", "intensity5",
];

#[cfg(feature = "code_editor")]
pub fn glsl() -> egui_code_editor::Syntax {
    use std::collections::BTreeSet;

    egui_code_editor::Syntax::new("glsl")
        .with_case_sensitive(true)
        .with_comment("//")
        .with_comment_multiline(["/*", "*/"])
        .with_keywords(KEYWORDS.iter().copied().collect::<BTreeSet<&'static str>>())
        .with_types(TYPES.iter().copied().collect::<BTreeSet<&'static str>>())
        .with_special(
            INTRINSICS
                .iter()
                .chain(PALETTE_NAMES.iter())
                .copied()
                .collect::<BTreeSet<&'static str>>(),
        )
}

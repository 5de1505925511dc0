//! WGSL shaders registered with the context's shader library
//!
//! Binding convention (group 0): vertex uniforms at binding 0, fragment
//! uniforms at binding 1, a sampled texture at binding 2 and its sampler at
//! binding 3.

/// Library id of [`SOLID_FILL_SHADER`]
pub const SOLID_FILL: &str = "solid_fill";

/// Library id of [`TEXTURE_FILL_SHADER`]
pub const TEXTURE_FILL: &str = "texture_fill";

/// Library id of [`COLOR_MATRIX_FILTER_SHADER`]
pub const COLOR_MATRIX_FILTER: &str = "color_matrix_filter";

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Flat premultiplied color
pub const SOLID_FILL_SHADER: &str = r#"
struct FrameInfo {
    mvp: mat4x4<f32>,
}

struct FragInfo {
    color: vec4<f32>,
}

@group(0) @binding(0) var<uniform> frame_info: FrameInfo;
@group(0) @binding(1) var<uniform> frag_info: FragInfo;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return frame_info.mvp * vec4<f32>(position, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return frag_info.color;
}
"#;

/// Sampled texture scaled by an opacity
pub const TEXTURE_FILL_SHADER: &str = r#"
struct FrameInfo {
    mvp: mat4x4<f32>,
}

struct FragInfo {
    alpha: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@group(0) @binding(0) var<uniform> frame_info: FrameInfo;
@group(0) @binding(1) var<uniform> frag_info: FragInfo;
@group(0) @binding(2) var texture_sampler_tex: texture_2d<f32>;
@group(0) @binding(3) var texture_sampler: sampler;

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) texture_coords: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.position = frame_info.mvp * vec4<f32>(position, 0.0, 1.0);
    out.uv = texture_coords;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(texture_sampler_tex, texture_sampler, in.uv) * frag_info.alpha;
}
"#;

/// Sampled premultiplied texture run through a 4x5 color matrix on its
/// straight-alpha color
pub const COLOR_MATRIX_FILTER_SHADER: &str = r#"
struct FrameInfo {
    mvp: mat4x4<f32>,
}

struct FragInfo {
    color_m: mat4x4<f32>,
    color_v: vec4<f32>,
    alpha: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@group(0) @binding(0) var<uniform> frame_info: FrameInfo;
@group(0) @binding(1) var<uniform> frag_info: FragInfo;
@group(0) @binding(2) var texture_sampler_tex: texture_2d<f32>;
@group(0) @binding(3) var texture_sampler: sampler;

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) texture_coords: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.position = frame_info.mvp * vec4<f32>(position, 0.0, 1.0);
    out.uv = texture_coords;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var color = textureSample(texture_sampler_tex, texture_sampler, in.uv);
    if (color.a > 0.0) {
        color = vec4<f32>(color.rgb / color.a, color.a);
    }
    color = clamp(frag_info.color_m * color + frag_info.color_v, vec4<f32>(0.0), vec4<f32>(1.0));
    return vec4<f32>(color.rgb * color.a, color.a) * frag_info.alpha;
}
"#;

/// Binding slots shared by the shaders above
pub mod slots {
    pub const FRAME_INFO: u32 = 0;
    pub const FRAG_INFO: u32 = 1;
    pub const TEXTURE: u32 = 2;
}

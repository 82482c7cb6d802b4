/// All three enhancement stages share one module, one bind group layout and the fullscreen
/// triangle vertex stage; each stage is a separate fragment entry point.
///
/// Frames arrive display-encoded (sRGB values in a `*Unorm` texture) and every stage works on
/// those values directly. Only the final write linearizes, and only when the render target
/// re-encodes on store.
pub(crate) const ENHANCE_WGSL: &str = r#"
struct StageUniforms {
    input_size: vec2<f32>,
    output_size: vec2<f32>,
    strength: f32,
    linearize: u32,
    _pad: vec2<u32>,
}

@group(0) @binding(0) var<uniform> u: StageUniforms;
@group(0) @binding(1) var src_tex: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) idx: u32) -> @builtin(position) vec4<f32> {
    var pos = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 3.0, -1.0),
        vec2<f32>(-1.0,  3.0),
    );
    return vec4<f32>(pos[idx], 0.0, 1.0);
}

fn luma(rgb: vec3<f32>) -> f32 {
    return dot(rgb, vec3<f32>(0.299, 0.587, 0.114));
}

fn load(p: vec2<i32>) -> vec4<f32> {
    let max_p = vec2<i32>(u.input_size) - vec2<i32>(1, 1);
    return textureLoad(src_tex, clamp(p, vec2<i32>(0, 0), max_p), 0);
}

fn srgb_to_linear_channel(x: f32) -> f32 {
    let xc = clamp(x, 0.0, 1.0);
    if (xc <= 0.04045) {
        return xc / 12.92;
    }
    return pow((xc + 0.055) / 1.055, 2.4);
}

fn encode_output(rgb: vec3<f32>) -> vec4<f32> {
    let c = clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0));
    if (u.linearize == 0u) {
        return vec4<f32>(c, 1.0);
    }
    return vec4<f32>(
        srgb_to_linear_channel(c.r),
        srgb_to_linear_channel(c.g),
        srgb_to_linear_channel(c.b),
        1.0,
    );
}

@fragment
fn fs_clamp_highlights(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let p = vec2<i32>(pos.xy);
    let center = load(p).rgb;

    var neighbour_max = 0.0;
    for (var dy = -1; dy <= 1; dy = dy + 1) {
        for (var dx = -1; dx <= 1; dx = dx + 1) {
            if (dx == 0 && dy == 0) {
                continue;
            }
            neighbour_max = max(neighbour_max, luma(load(p + vec2<i32>(dx, dy)).rgb));
        }
    }

    let y = luma(center);
    let limit = mix(y, min(y, neighbour_max), u.strength);
    let scale = select(1.0, limit / y, y > 0.0);
    return vec4<f32>(center * scale, 1.0);
}

@fragment
fn fs_restore_detail(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let p = vec2<i32>(pos.xy);
    let center = load(p).rgb;
    let blur = (
        load(p + vec2<i32>(-1, 0)).rgb +
        load(p + vec2<i32>(1, 0)).rgb +
        load(p + vec2<i32>(0, -1)).rgb +
        load(p + vec2<i32>(0, 1)).rgb
    ) * 0.25;
    let restored = center + (center - blur) * u.strength;
    return vec4<f32>(clamp(restored, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}

fn catmull_rom(t: f32) -> vec4<f32> {
    let t2 = t * t;
    let t3 = t2 * t;
    return vec4<f32>(
        -0.5 * t3 + t2 - 0.5 * t,
        1.5 * t3 - 2.5 * t2 + 1.0,
        -1.5 * t3 + 2.0 * t2 + 0.5 * t,
        0.5 * t3 - 0.5 * t2,
    );
}

@fragment
fn fs_upscale(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let src = pos.xy * (u.input_size / u.output_size) - vec2<f32>(0.5, 0.5);
    let base = floor(src);
    let f = src - base;
    let wx = catmull_rom(f.x);
    let wy = catmull_rom(f.y);
    let b = vec2<i32>(base);

    var acc = vec3<f32>(0.0);
    for (var j = 0; j < 4; j = j + 1) {
        var row = vec3<f32>(0.0);
        for (var i = 0; i < 4; i = i + 1) {
            row = row + load(b + vec2<i32>(i - 1, j - 1)).rgb * wx[i];
        }
        acc = acc + row * wy[j];
    }
    return encode_output(acc);
}
"#;

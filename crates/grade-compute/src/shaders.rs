//! WGSL shader sources for GPU compute pipelines.

/// 3D LUT trilinear sampling with strength blend.
///
/// The grid buffer is laid out red-fastest (`r + g*N + b*N²`), matching
/// `grade_lut::AXIS_ORDER`. Coordinates go through domain normalization and
/// the `[-1, 1]` grid space before being turned into fractional indices.
pub const LUT3D: &str = r#"
struct Params {
    dims: vec4<u32>,        // w, h, c, lut_size
    domain_min: vec4<f32>,  // xyz = domain min, w = strength
    domain_max: vec4<f32>,  // xyz = domain max
}

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: Params;
@group(0) @binding(3) var<storage, read> lut: array<f32>;

fn lut_at(ri: u32, gi: u32, bi: u32, ch: u32, s: u32) -> f32 {
    return lut[((bi * s + gi) * s + ri) * 3u + ch];
}

fn grid_pos(v: f32, lo: f32, hi: f32, scale: f32) -> f32 {
    let t = clamp((v - lo) / (hi - lo), 0.0, 1.0);
    let g = t * 2.0 - 1.0;
    return (g + 1.0) * 0.5 * scale;
}

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) id: vec3<u32>,
    @builtin(num_workgroups) nwg: vec3<u32>,
) {
    let px = id.y * nwg.x * 256u + id.x;
    let total = params.dims.x * params.dims.y;
    if px >= total { return; }

    let c = params.dims.z;
    let s = params.dims.w;
    let scale = f32(s - 1u);
    let base = px * c;
    let strength = params.domain_min.w;

    let r = grid_pos(src[base], params.domain_min.x, params.domain_max.x, scale);
    let g = grid_pos(src[base + 1u], params.domain_min.y, params.domain_max.y, scale);
    let b = grid_pos(src[base + 2u], params.domain_min.z, params.domain_max.z, scale);

    let r0 = min(u32(r), s - 1u);
    let g0 = min(u32(g), s - 1u);
    let b0 = min(u32(b), s - 1u);
    let r1 = min(r0 + 1u, s - 1u);
    let g1 = min(g0 + 1u, s - 1u);
    let b1 = min(b0 + 1u, s - 1u);

    let fr = r - f32(r0);
    let fg = g - f32(g0);
    let fb = b - f32(b0);

    for (var ch = 0u; ch < 3u; ch = ch + 1u) {
        let c000 = lut_at(r0, g0, b0, ch, s);
        let c100 = lut_at(r1, g0, b0, ch, s);
        let c010 = lut_at(r0, g1, b0, ch, s);
        let c110 = lut_at(r1, g1, b0, ch, s);
        let c001 = lut_at(r0, g0, b1, ch, s);
        let c101 = lut_at(r1, g0, b1, ch, s);
        let c011 = lut_at(r0, g1, b1, ch, s);
        let c111 = lut_at(r1, g1, b1, ch, s);

        let c00 = c000 + fr * (c100 - c000);
        let c10 = c010 + fr * (c110 - c010);
        let c01 = c001 + fr * (c101 - c001);
        let c11 = c011 + fr * (c111 - c011);

        let c0 = c00 + fg * (c10 - c00);
        let c1 = c01 + fg * (c11 - c01);
        let sampled = c0 + fb * (c1 - c0);

        let orig = src[base + ch];
        dst[base + ch] = clamp(orig + (sampled - orig) * strength, 0.0, 1.0);
    }
    if c >= 4u { dst[base + 3u] = src[base + 3u]; }
}
"#;

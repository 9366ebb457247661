/// GLSL ES 3.00 sources for the two draw paths

pub const POINTS_VERT: &str = r#"#version 300 es
in vec3 a_position;
uniform mat4 u_model_view;
uniform mat4 u_projection;
uniform float u_size;
uniform float u_scale;
uniform bool u_attenuate;
out float v_depth;
void main() {
    vec4 eye = u_model_view * vec4(a_position, 1.0);
    gl_Position = u_projection * eye;
    gl_PointSize = u_attenuate ? u_size * (u_scale / -eye.z) : u_size;
    v_depth = -eye.z;
}
"#;

pub const POINTS_FRAG: &str = r#"#version 300 es
precision mediump float;
uniform vec3 u_color;
uniform float u_opacity;
uniform vec3 u_fog_color;
uniform vec2 u_fog_range;
in float v_depth;
out vec4 o_color;
void main() {
    vec2 offset = gl_PointCoord - vec2(0.5);
    if (dot(offset, offset) > 0.25) discard;
    vec3 color = u_color;
    if (u_fog_range.y > u_fog_range.x) {
        float fog = clamp((v_depth - u_fog_range.x) / (u_fog_range.y - u_fog_range.x), 0.0, 1.0);
        color = mix(color, u_fog_color, fog);
    }
    o_color = vec4(color, u_opacity);
}
"#;

pub const LIT_VERT: &str = r#"#version 300 es
in vec3 a_position;
in vec3 a_normal;
uniform mat4 u_model;
uniform mat4 u_view;
uniform mat4 u_projection;
out vec3 v_normal;
out float v_depth;
void main() {
    vec4 world = u_model * vec4(a_position, 1.0);
    v_normal = mat3(u_model) * a_normal;
    vec4 eye = u_view * world;
    v_depth = -eye.z;
    gl_Position = u_projection * eye;
}
"#;

pub const LIT_FRAG: &str = r#"#version 300 es
precision mediump float;
uniform vec3 u_color;
uniform float u_roughness;
uniform float u_metalness;
uniform vec3 u_ambient;
uniform vec3 u_sky;
uniform vec3 u_ground;
uniform vec3 u_light_color;
uniform vec3 u_light_dir;
uniform vec3 u_fog_color;
uniform vec2 u_fog_range;
in vec3 v_normal;
in float v_depth;
out vec4 o_color;
void main() {
    vec3 n = normalize(v_normal);
    if (!gl_FrontFacing) n = -n;
    float facing = max(dot(n, u_light_dir), 0.0);
    vec3 irradiance = u_ambient + mix(u_ground, u_sky, 0.5 * n.y + 0.5) + u_light_color * facing;
    vec3 color = u_color * irradiance * (1.0 - 0.5 * u_metalness);
    color += u_light_color * pow(facing, 8.0) * (1.0 - u_roughness) * 0.2;
    if (u_fog_range.y > u_fog_range.x) {
        float fog = clamp((v_depth - u_fog_range.x) / (u_fog_range.y - u_fog_range.x), 0.0, 1.0);
        color = mix(color, u_fog_color, fog);
    }
    o_color = vec4(color, 1.0);
}
"#;

pub const POINTS_UNIFORMS: &[&str] = &[
    "u_model_view",
    "u_projection",
    "u_size",
    "u_scale",
    "u_attenuate",
    "u_color",
    "u_opacity",
    "u_fog_color",
    "u_fog_range",
];

pub const LIT_UNIFORMS: &[&str] = &[
    "u_model",
    "u_view",
    "u_projection",
    "u_color",
    "u_roughness",
    "u_metalness",
    "u_ambient",
    "u_sky",
    "u_ground",
    "u_light_color",
    "u_light_dir",
    "u_fog_color",
    "u_fog_range",
];

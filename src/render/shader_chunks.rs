/// Shader chunk library — named GLSL fragments assembled into programs.
///
/// Each shading model has a vertex and fragment template containing
/// `#include <chunk>` markers. The program cache expands the markers by
/// textual substitution and prepends a `#define` header synthesized from
/// the program descriptor, so optional behavior (maps, fog, skinning,
/// light loop bounds) is compiled in or out per program.

use crate::error::Result;
use crate::engine_err;
use crate::resource::ShadingTag;

/// Look up a named chunk.
pub fn chunk(name: &str) -> Option<&'static str> {
    CHUNKS.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
}

/// Replace every `#include <name>` line in `template` with the named
/// chunk's source. Unknown chunk names are a configuration error.
pub fn expand_includes(template: &str) -> Result<String> {
    let mut out = String::with_capacity(template.len() * 2);
    for line in template.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("#include <") {
            let name = rest.trim_end_matches('>');
            let body = chunk(name).ok_or_else(|| {
                engine_err!("aurora3d::ShaderChunks", "unknown shader chunk '{}'", name)
            })?;
            out.push_str(body);
            out.push('\n');
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Vertex template for a shading model.
pub fn vertex_template(tag: ShadingTag) -> &'static str {
    match tag {
        ShadingTag::Basic => BASIC_VERT,
        // All lit models share the vertex stage; they diverge per fragment
        ShadingTag::Matte | ShadingTag::Glossy | ShadingTag::Standard | ShadingTag::Toon => {
            LIT_VERT
        }
    }
}

/// Fragment template for a shading model.
pub fn fragment_template(tag: ShadingTag) -> &'static str {
    match tag {
        ShadingTag::Basic => BASIC_FRAG,
        ShadingTag::Matte => MATTE_FRAG,
        ShadingTag::Glossy => GLOSSY_FRAG,
        ShadingTag::Standard => STANDARD_FRAG,
        ShadingTag::Toon => TOON_FRAG,
    }
}

// ===== CHUNKS =====

static CHUNKS: &[(&str, &str)] = &[
    ("common", r#"
precision highp float;
uniform mat4 modelMatrix;
uniform mat4 viewMatrix;
uniform mat4 projectionMatrix;
"#),
    ("attributes_vertex", r#"
attribute vec3 position;
#ifdef HAS_NORMALS
attribute vec3 normal;
#endif
#ifdef HAS_UVS
attribute vec2 uv;
#endif
#ifdef VERTEX_COLORS
attribute vec4 color;
#endif
"#),
    ("skinning_pars_vertex", r#"
#ifdef SKINNING
attribute vec4 skinIndex;
attribute vec4 skinWeight;
uniform mat4 boneMatrices[MAX_BONES];
#endif
"#),
    ("begin_vertex", r#"
vec3 transformed = position;
"#),
    ("skinning_vertex", r#"
#ifdef SKINNING
mat4 skinMatrix =
    skinWeight.x * boneMatrices[int(skinIndex.x)] +
    skinWeight.y * boneMatrices[int(skinIndex.y)] +
    skinWeight.z * boneMatrices[int(skinIndex.z)] +
    skinWeight.w * boneMatrices[int(skinIndex.w)];
transformed = (skinMatrix * vec4(transformed, 1.0)).xyz;
#endif
"#),
    ("project_vertex", r#"
vec4 worldPosition = modelMatrix * vec4(transformed, 1.0);
vec4 viewPosition = viewMatrix * worldPosition;
gl_Position = projectionMatrix * viewPosition;
"#),
    ("normal_pars_vertex", r#"
#ifdef HAS_NORMALS
uniform mat3 normalMatrix;
#endif
"#),
    ("normal_vertex", r#"
#ifdef HAS_NORMALS
vWorldNormal = normalize(normalMatrix * normal);
#endif
"#),
    ("uv_vertex", r#"
#ifdef HAS_UVS
vUv = uv;
#endif
"#),
    ("fog_pars", r#"
#ifdef FOG
uniform vec3 fogColor;
uniform float fogNear;
uniform float fogFar;
#endif
"#),
    ("fog_fragment", r#"
#ifdef FOG
float fogDepth = length(vViewPosition);
float fogFactor = smoothstep(fogNear, fogFar, fogDepth);
outColor.rgb = mix(outColor.rgb, fogColor, fogFactor);
#endif
"#),
    ("map_fragment", r#"
#ifdef COLOR_MAP
uniform sampler2D map;
#endif
"#),
    ("map_sample_fragment", r#"
#ifdef COLOR_MAP
outColor *= texture2D(map, vUv);
#endif
"#),
    ("normal_map_pars", r#"
#ifdef NORMAL_MAP
uniform sampler2D normalMap;
#endif
"#),
    ("alphatest_pars", r#"
#ifdef ALPHA_TEST
uniform float alphaCutoff;
#endif
"#),
    ("alphatest_fragment", r#"
#ifdef ALPHA_TEST
if (outColor.a < alphaCutoff) discard;
#endif
"#),
    ("lights_pars", r#"
#if NUM_DIR_LIGHTS > 0
uniform vec3 dirLightDirections[NUM_DIR_LIGHTS];
uniform vec3 dirLightColors[NUM_DIR_LIGHTS];
#endif
#if NUM_POINT_LIGHTS > 0
uniform vec3 pointLightPositions[NUM_POINT_LIGHTS];
uniform vec3 pointLightColors[NUM_POINT_LIGHTS];
#endif
#if NUM_SPOT_LIGHTS > 0
uniform vec3 spotLightPositions[NUM_SPOT_LIGHTS];
uniform vec3 spotLightDirections[NUM_SPOT_LIGHTS];
uniform vec3 spotLightColors[NUM_SPOT_LIGHTS];
#endif
#if NUM_HEMI_LIGHTS > 0
uniform vec3 hemiSkyColors[NUM_HEMI_LIGHTS];
uniform vec3 hemiGroundColors[NUM_HEMI_LIGHTS];
#endif
"#),
    ("lights_accumulate", r#"
vec3 irradiance = vec3(0.0);
#if NUM_DIR_LIGHTS > 0
for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
    irradiance += max(dot(vWorldNormal, -dirLightDirections[i]), 0.0) * dirLightColors[i];
}
#endif
#if NUM_POINT_LIGHTS > 0
for (int i = 0; i < NUM_POINT_LIGHTS; i++) {
    vec3 toLight = pointLightPositions[i] - vWorldPosition;
    float attenuation = 1.0 / (1.0 + dot(toLight, toLight));
    irradiance += max(dot(vWorldNormal, normalize(toLight)), 0.0)
        * pointLightColors[i] * attenuation;
}
#endif
#if NUM_SPOT_LIGHTS > 0
for (int i = 0; i < NUM_SPOT_LIGHTS; i++) {
    vec3 toLight = normalize(spotLightPositions[i] - vWorldPosition);
    float cone = max(dot(-toLight, spotLightDirections[i]), 0.0);
    irradiance += max(dot(vWorldNormal, toLight), 0.0) * spotLightColors[i] * cone;
}
#endif
#if NUM_HEMI_LIGHTS > 0
for (int i = 0; i < NUM_HEMI_LIGHTS; i++) {
    float mixWeight = vWorldNormal.y * 0.5 + 0.5;
    irradiance += mix(hemiGroundColors[i], hemiSkyColors[i], mixWeight);
}
#endif
"#),
    ("tonemapping_fragment", r#"
#if TONE_MAPPING == 1
outColor.rgb = outColor.rgb / (outColor.rgb + vec3(1.0));
#elif TONE_MAPPING == 2
outColor.rgb = clamp((outColor.rgb * (2.51 * outColor.rgb + 0.03))
    / (outColor.rgb * (2.43 * outColor.rgb + 0.59) + 0.14), 0.0, 1.0);
#endif
"#),
    ("colorspace_fragment", r#"
#ifdef OUTPUT_SRGB
outColor.rgb = pow(outColor.rgb, vec3(1.0 / 2.2));
#endif
"#),
];

// ===== TEMPLATES =====

static BASIC_VERT: &str = r#"
#include <common>
#include <attributes_vertex>
#include <skinning_pars_vertex>
varying vec2 vUv;
varying vec3 vViewPosition;
void main() {
    #include <begin_vertex>
    #include <skinning_vertex>
    #include <project_vertex>
    #include <uv_vertex>
    vViewPosition = viewPosition.xyz;
}
"#;

static LIT_VERT: &str = r#"
#include <common>
#include <attributes_vertex>
#include <skinning_pars_vertex>
#include <normal_pars_vertex>
varying vec2 vUv;
varying vec3 vWorldNormal;
varying vec3 vWorldPosition;
varying vec3 vViewPosition;
void main() {
    #include <begin_vertex>
    #include <skinning_vertex>
    #include <project_vertex>
    #include <normal_vertex>
    #include <uv_vertex>
    vWorldPosition = worldPosition.xyz;
    vViewPosition = viewPosition.xyz;
}
"#;

static BASIC_FRAG: &str = r#"
precision highp float;
uniform vec3 diffuse;
uniform float opacity;
varying vec2 vUv;
varying vec3 vViewPosition;
#include <map_fragment>
#include <fog_pars>
#include <alphatest_pars>
void main() {
    vec4 outColor = vec4(diffuse, opacity);
    #include <map_sample_fragment>
    #include <alphatest_fragment>
    #include <fog_fragment>
    #include <tonemapping_fragment>
    #include <colorspace_fragment>
    gl_FragColor = outColor;
}
"#;

static MATTE_FRAG: &str = r#"
precision highp float;
uniform vec3 diffuse;
uniform float opacity;
uniform vec3 emissive;
varying vec2 vUv;
varying vec3 vWorldNormal;
varying vec3 vWorldPosition;
varying vec3 vViewPosition;
#include <map_fragment>
#include <lights_pars>
#include <fog_pars>
#include <alphatest_pars>
void main() {
    vec4 outColor = vec4(diffuse, opacity);
    #include <map_sample_fragment>
    #include <lights_accumulate>
    outColor.rgb = outColor.rgb * irradiance + emissive;
    #include <alphatest_fragment>
    #include <fog_fragment>
    #include <tonemapping_fragment>
    #include <colorspace_fragment>
    gl_FragColor = outColor;
}
"#;

static GLOSSY_FRAG: &str = r#"
precision highp float;
uniform vec3 diffuse;
uniform float opacity;
uniform vec3 specular;
uniform float shininess;
varying vec2 vUv;
varying vec3 vWorldNormal;
varying vec3 vWorldPosition;
varying vec3 vViewPosition;
#include <map_fragment>
#include <normal_map_pars>
#include <lights_pars>
#include <fog_pars>
#include <alphatest_pars>
void main() {
    vec4 outColor = vec4(diffuse, opacity);
    #include <map_sample_fragment>
    #include <lights_accumulate>
    vec3 viewDir = normalize(-vViewPosition);
    vec3 halfway = normalize(viewDir + vWorldNormal);
    float highlight = pow(max(dot(vWorldNormal, halfway), 0.0), shininess);
    outColor.rgb = outColor.rgb * irradiance + specular * highlight;
    #include <alphatest_fragment>
    #include <fog_fragment>
    #include <tonemapping_fragment>
    #include <colorspace_fragment>
    gl_FragColor = outColor;
}
"#;

static STANDARD_FRAG: &str = r#"
precision highp float;
uniform vec3 diffuse;
uniform float opacity;
uniform float metalness;
uniform float roughness;
uniform vec3 emissive;
#ifdef TRANSMISSION
uniform float transmission;
#endif
varying vec2 vUv;
varying vec3 vWorldNormal;
varying vec3 vWorldPosition;
varying vec3 vViewPosition;
#include <map_fragment>
#include <normal_map_pars>
#ifdef EMISSIVE_MAP
uniform sampler2D emissiveMap;
#endif
#include <lights_pars>
#include <fog_pars>
#include <alphatest_pars>
void main() {
    vec4 outColor = vec4(diffuse, opacity);
    #include <map_sample_fragment>
    #include <lights_accumulate>
    vec3 base = outColor.rgb * (1.0 - metalness);
    vec3 reflectance = mix(vec3(0.04), outColor.rgb, metalness);
    float gloss = 1.0 - roughness;
    vec3 viewDir = normalize(-vViewPosition);
    vec3 halfway = normalize(viewDir + vWorldNormal);
    float highlight = pow(max(dot(vWorldNormal, halfway), 0.0), 1.0 + gloss * 255.0);
    outColor.rgb = base * irradiance + reflectance * highlight * gloss;
    vec3 emission = emissive;
    #ifdef EMISSIVE_MAP
    emission *= texture2D(emissiveMap, vUv).rgb;
    #endif
    outColor.rgb += emission;
    #ifdef TRANSMISSION
    outColor.a *= 1.0 - transmission;
    #endif
    #include <alphatest_fragment>
    #include <fog_fragment>
    #include <tonemapping_fragment>
    #include <colorspace_fragment>
    gl_FragColor = outColor;
}
"#;

static TOON_FRAG: &str = r#"
precision highp float;
uniform vec3 diffuse;
uniform float opacity;
uniform float toonSteps;
varying vec2 vUv;
varying vec3 vWorldNormal;
varying vec3 vWorldPosition;
varying vec3 vViewPosition;
#include <map_fragment>
#include <lights_pars>
#include <fog_pars>
#include <alphatest_pars>
void main() {
    vec4 outColor = vec4(diffuse, opacity);
    #include <map_sample_fragment>
    #include <lights_accumulate>
    float level = length(irradiance);
    level = floor(level * toonSteps) / toonSteps;
    outColor.rgb *= level;
    #include <alphatest_fragment>
    #include <fog_fragment>
    #include <tonemapping_fragment>
    #include <colorspace_fragment>
    gl_FragColor = outColor;
}
"#;

#[cfg(test)]
#[path = "shader_chunks_tests.rs"]
mod tests;

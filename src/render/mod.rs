//! Render module
//!
//! Per-frame render-list construction and sorting, the feature-keyed
//! program cache, the GPU state diff engine, the uniform uploader, and
//! the frame-orchestrating Renderer.

mod program_cache;
mod render_list;
mod renderer;
mod shader_chunks;
mod state;
mod uniforms;

pub use program_cache::{
    CachedProgram, ColorSpace, ProgramCache, ProgramDescriptor, ProgramFeatures,
    ProgramKey, ToneMapping,
};
pub use render_list::{
    material_major_comparator, depth_major_comparator, transparent_comparator,
    OpaqueComparator, RenderItem, RenderList,
};
pub use renderer::{Fog, Renderer, RendererSettings, RenderStats};
pub use shader_chunks::{chunk, expand_includes, fragment_template, vertex_template};
pub use state::StateCache;
pub use uniforms::UniformUploader;

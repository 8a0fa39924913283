/*!
# Aurora 3D Engine

Core of a real-time forward renderer: a hierarchical scene graph of
transformable nodes, per-frame visibility filtering and render-list
sorting, a feature-keyed shader program cache, and a GPU state/uniform
diffing layer that avoids redundant driver calls.

The GPU itself sits behind the [`gpu::GpuDevice`] trait — an
OpenGL-style immediate-state boundary. Backend implementations are
provided by separate crates (or, in tests, by the built-in mock device).

## Architecture

- **SceneGraph**: arena of Nodes, transform propagation, visibility filter
- **RenderList**: flattened draw records, bucketed and sorted per frame
- **ProgramCache**: compiled shader programs keyed by feature descriptor
- **StateCache**: last-known GPU state, compare-then-set diffing
- **Renderer**: per-frame orchestration over an injected GpuDevice
*/

// Internal modules
mod error;
pub mod log;
pub mod camera;
pub mod gpu;
pub mod render;
pub mod resource;
pub mod scene;

// Main aurora3d namespace module
pub mod aurora3d {
    // Error types
    pub use crate::error::{Error, Result, ShaderStage};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // GPU boundary sub-module
    pub mod gpu {
        pub use crate::gpu::*;
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::render::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;

//! Camera module
//!
//! Provides the passive camera container and the view frustum used for
//! visibility culling.

mod camera;
mod frustum;

pub use camera::Camera;
pub use frustum::Frustum;

//! Error types for the Aurora3D engine
//!
//! This module defines the error types used throughout the engine,
//! including shader compilation, resource management, and backend errors.

use std::fmt;

/// Result type for Aurora3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Aurora3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (driver call failed)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (geometry, material, texture, etc.)
    InvalidResource(String),

    /// Initialization failed (renderer, subsystems)
    InitializationFailed(String),

    /// Shader compile or link failure with full diagnostic context.
    ///
    /// There is deliberately no fallback shader: a broken shader fails
    /// loudly for the affected material and the frame continues without it.
    ShaderCompile {
        /// Which stage failed
        stage: ShaderStage,
        /// Raw driver log
        log: String,
        /// Line-windowed excerpt of the offending source
        excerpt: String,
    },
}

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// Program link step (after both stages compiled)
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
            ShaderStage::Link => write!(f, "link"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ShaderCompile { stage, log, excerpt } => {
                write!(f, "Shader {} error: {}\n{}", stage, log, excerpt)
            }
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR CONSTRUCTION MACROS =====

/// Log an error and construct an `Error::InvalidResource` from it.
///
/// # Example
///
/// ```ignore
/// let group = geometry.group(i)
///     .ok_or_else(|| engine_err!("aurora3d::Scene", "group {} not found", i))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        $crate::engine_error!($source, $($arg)*);
        $crate::aurora3d::Error::InvalidResource(format!($($arg)*))
    }};
}

/// Log an error and return early with `Err(Error::InvalidResource)`.
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

//! GPU buffer plumbing
//!
//! The engine never talks to a graphics API directly. Rendering code hands it
//! a [`GlController`] implementation (a thin wrapper around a WebGL/OpenGL
//! context) and the engine drives buffer creation, uploads and deletion
//! through it.
//!
//! Each [`crate::Series`] owns one [`GlBufferState`]: the buffer handle, the
//! reference count and the last uploaded write cursor, kept together so the
//! decrement that reaches zero is the same call that deletes the buffer.

mod state;

pub use state::{GlBufferState, ReleaseOutcome};
pub(crate) use state::Upload;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque buffer name issued by a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlBufferHandle(pub u32);

impl fmt::Display for GlBufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gl-buffer-{}", self.0)
    }
}

/// Binding point for buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`ARRAY_BUFFER`)
    Array,
}

/// Usage hint passed along with full uploads and allocations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlUsage {
    /// Written once, drawn many times (`STATIC_DRAW`)
    #[default]
    Static,
    /// Rewritten repeatedly (`DYNAMIC_DRAW`)
    Dynamic,
}

impl fmt::Display for GlUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlUsage::Static => write!(f, "static"),
            GlUsage::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Buffer operations the engine needs from a graphics context
///
/// Implementations map [`GlUsage`] to their native usage enum. Calls are made
/// synchronously from whichever thread owns the context; the engine performs
/// no locking of its own.
#[cfg_attr(test, mockall::automock)]
pub trait GlController {
    /// Create a new, empty buffer. `None` if the context could not allocate one.
    fn create_buffer(&mut self) -> Option<GlBufferHandle>;

    /// Bind `handle` to `target` for the following data calls
    fn bind_buffer(&mut self, target: BufferTarget, handle: GlBufferHandle);

    /// Replace the contents of the bound buffer with `data`
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: GlUsage);

    /// Reallocate the bound buffer to `size` zeroed bytes
    fn buffer_data_size(&mut self, target: BufferTarget, size: usize, usage: GlUsage);

    /// Overwrite part of the bound buffer starting at `byte_offset`
    fn buffer_sub_data(&mut self, target: BufferTarget, byte_offset: usize, data: &[u8]);

    fn delete_buffer(&mut self, handle: GlBufferHandle);
}

//! Per-series GPU buffer ownership

use super::{BufferTarget, GlBufferHandle, GlController, GlUsage};
use crate::error::{Result, TelemError};
use crate::series::WritePos;
use tracing::{debug, trace, warn};

/// Result of releasing one reference to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Other holders remain; the buffer is kept
    Retained(u32),
    /// The count reached zero. Any uploaded buffer was deleted.
    Deleted,
    /// Released without a matching acquire; nothing changed
    Underflow,
}

/// Snapshot of the series contents handed to [`GlBufferState::sync`]
#[derive(Debug)]
pub(crate) struct Upload<'a> {
    pub write_pos: WritePos,
    /// The valid region of the series, as bytes
    pub bytes: &'a [u8],
    pub byte_capacity: usize,
    pub density: usize,
    pub usage: GlUsage,
}

/// GPU handle, reference count and upload cursor of one series
#[derive(Debug, Default)]
pub struct GlBufferState {
    handle: Option<GlBufferHandle>,
    ref_count: u32,
    /// Write cursor at the last upload, `None` before the first one
    uploaded: Option<WritePos>,
}

impl GlBufferState {
    pub fn handle(&self) -> Option<GlBufferHandle> {
        self.handle
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Write cursor at the time of the last upload
    pub fn uploaded(&self) -> Option<WritePos> {
        self.uploaded
    }

    /// Take one reference, returning the new count
    pub fn acquire(&mut self) -> u32 {
        self.ref_count += 1;
        self.ref_count
    }

    /// Drop one reference, deleting the buffer when the count reaches zero
    pub fn release<C: GlController + ?Sized>(&mut self, gl: &mut C) -> ReleaseOutcome {
        if self.ref_count == 0 {
            warn!("gl buffer released more times than it was acquired");
            return ReleaseOutcome::Underflow;
        }
        self.ref_count -= 1;
        if self.ref_count > 0 {
            return ReleaseOutcome::Retained(self.ref_count);
        }
        if let Some(handle) = self.handle.take() {
            gl.delete_buffer(handle);
            debug!(%handle, "deleted gl buffer");
        }
        self.uploaded = None;
        ReleaseOutcome::Deleted
    }

    /// Bring the GPU copy up to date with `upload`
    ///
    /// Complete series are uploaded whole. Filling series allocate their full
    /// byte capacity on the first upload and afterwards only push the tail
    /// written since the previous upload.
    pub(crate) fn sync<C: GlController + ?Sized>(
        &mut self,
        gl: &mut C,
        upload: &Upload<'_>,
    ) -> Result<()> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = gl
                    .create_buffer()
                    .ok_or_else(|| TelemError::Gl("failed to create buffer".to_string()))?;
                debug!(%handle, "created gl buffer");
                self.handle = Some(handle);
                handle
            }
        };
        if self.uploaded == Some(upload.write_pos) {
            return Ok(());
        }
        gl.bind_buffer(BufferTarget::Array, handle);
        match upload.write_pos {
            WritePos::Full => {
                trace!(%handle, bytes = upload.bytes.len(), "full gl upload");
                gl.buffer_data(BufferTarget::Array, upload.bytes, upload.usage);
            }
            WritePos::At(pos) => {
                let prev = match self.uploaded {
                    Some(WritePos::At(prev)) if prev <= pos => prev,
                    _ => {
                        gl.buffer_data_size(BufferTarget::Array, upload.byte_capacity, upload.usage);
                        0
                    }
                };
                let from = prev * upload.density;
                if from < upload.bytes.len() {
                    trace!(%handle, from, to = upload.bytes.len(), "incremental gl upload");
                    gl.buffer_sub_data(BufferTarget::Array, from, &upload.bytes[from..]);
                }
            }
        }
        self.uploaded = Some(upload.write_pos);
        Ok(())
    }
}

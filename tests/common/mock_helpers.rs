//! Mock construction helpers

use telem_rs::{BufferTarget, GlBufferHandle, GlController, GlUsage};

/// One call made against a [`RecordingGl`]
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Create(GlBufferHandle),
    Bind(GlBufferHandle),
    Data { bytes: Vec<u8>, usage: GlUsage },
    Allocate { size: usize, usage: GlUsage },
    SubData { offset: usize, bytes: Vec<u8> },
    Delete(GlBufferHandle),
}

/// Controller that records every call and keeps a CPU copy of each buffer
#[derive(Debug, Default)]
pub struct RecordingGl {
    pub calls: Vec<GlCall>,
    next_handle: u32,
    bound: Option<GlBufferHandle>,
    buffers: std::collections::HashMap<GlBufferHandle, Vec<u8>>,
    /// Make `create_buffer` fail
    pub fail_create: bool,
    /// Make `create_buffer` fail once this many buffers have been created
    pub create_limit: Option<u32>,
}

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a buffer
    pub fn contents(&self, handle: GlBufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(Vec::as_slice)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl GlController for RecordingGl {
    fn create_buffer(&mut self) -> Option<GlBufferHandle> {
        if self.fail_create || self.create_limit.is_some_and(|n| self.next_handle >= n) {
            return None;
        }
        self.next_handle += 1;
        let handle = GlBufferHandle(self.next_handle);
        self.buffers.insert(handle, Vec::new());
        self.calls.push(GlCall::Create(handle));
        Some(handle)
    }

    fn bind_buffer(&mut self, _target: BufferTarget, handle: GlBufferHandle) {
        self.bound = Some(handle);
        self.calls.push(GlCall::Bind(handle));
    }

    fn buffer_data(&mut self, _target: BufferTarget, data: &[u8], usage: GlUsage) {
        if let Some(buf) = self.bound.and_then(|h| self.buffers.get_mut(&h)) {
            *buf = data.to_vec();
        }
        self.calls.push(GlCall::Data {
            bytes: data.to_vec(),
            usage,
        });
    }

    fn buffer_data_size(&mut self, _target: BufferTarget, size: usize, usage: GlUsage) {
        if let Some(buf) = self.bound.and_then(|h| self.buffers.get_mut(&h)) {
            *buf = vec![0; size];
        }
        self.calls.push(GlCall::Allocate { size, usage });
    }

    fn buffer_sub_data(&mut self, _target: BufferTarget, byte_offset: usize, data: &[u8]) {
        if let Some(buf) = self.bound.and_then(|h| self.buffers.get_mut(&h)) {
            buf[byte_offset..byte_offset + data.len()].copy_from_slice(data);
        }
        self.calls.push(GlCall::SubData {
            offset: byte_offset,
            bytes: data.to_vec(),
        });
    }

    fn delete_buffer(&mut self, handle: GlBufferHandle) {
        self.buffers.remove(&handle);
        if self.bound == Some(handle) {
            self.bound = None;
        }
        self.calls.push(GlCall::Delete(handle));
    }
}

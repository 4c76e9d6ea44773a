use crate::error::Error;
use gfx_hal::{buffer, prelude::*, Backend, Limits};
use std::mem::{self, ManuallyDrop};
use std::ptr;

/// A vertex buffer sized for `content`, not yet bound to memory.
pub struct Buffer<'a, B: Backend, T> {
    pub device: &'a B::Device,
    pub buf: ManuallyDrop<B::Buffer>,
    pub content: &'a [T],
    pub len: u64,
}

impl<'a, B: Backend, T> Buffer<'a, B, T> {
    pub fn new(device: &'a B::Device, content: &'a [T], limits: &Limits) -> Result<Self, Error> {
        let buffer_len = byte_len(content);
        if buffer_len == 0 {
            return Err(Error::Device("vertex buffer content is empty".into()));
        }
        let memory_size = align_to(buffer_len, limits.non_coherent_atom_size as u64);

        let buf = unsafe { device.create_buffer(memory_size, buffer::Usage::VERTEX) }
            .map_err(|e| Error::device("create vertex buffer", e))?;

        Ok(Buffer {
            device,
            buf: ManuallyDrop::new(buf),
            content,
            len: buffer_len,
        })
    }
}

impl<'a, B: Backend, T> Drop for Buffer<'a, B, T> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_buffer(ManuallyDrop::into_inner(ptr::read(&self.buf)))
        }
    }
}

fn byte_len<T>(content: &[T]) -> u64 {
    content.len() as u64 * mem::size_of::<T>() as u64
}

fn align_to(len: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return len;
    }
    ((len + alignment - 1) / alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::vertex::{COLORS, POSITIONS};

    #[test]
    fn quad_arrays_are_72_bytes() {
        assert_eq!(byte_len(&POSITIONS[..]), 72);
        assert_eq!(byte_len(&COLORS[..]), 72);
    }

    #[test]
    fn sizes_round_up_to_atom() {
        assert_eq!(align_to(72, 64), 128);
        assert_eq!(align_to(128, 64), 128);
        assert_eq!(align_to(72, 1), 72);
        assert_eq!(align_to(72, 0), 72);
    }
}

use crate::error::Error;
use gfx_hal::{adapter::MemoryType, memory as m, prelude::*, Backend, MemoryTypeId};
use std::iter;
use std::mem::ManuallyDrop;
use std::ptr;

use super::buffer::Buffer;

/// A buffer together with the CPU-visible memory holding its content.
/// Written once at creation and never touched again.
pub struct Memory<'a, B: Backend, T> {
    pub buffer: ManuallyDrop<Buffer<'a, B, T>>,
    memory: ManuallyDrop<B::Memory>,
}

impl<'a, B: Backend, T> Memory<'a, B, T> {
    pub fn new(mut buffer: Buffer<'a, B, T>, memory_types: &[MemoryType]) -> Result<Self, Error> {
        let memory = Self::allocate_gpu_memory(&mut buffer, memory_types)?;
        Ok(Memory {
            buffer: ManuallyDrop::new(buffer),
            memory: ManuallyDrop::new(memory),
        })
    }

    fn allocate_gpu_memory(
        buffer: &mut Buffer<'a, B, T>,
        memory_types: &[MemoryType],
    ) -> Result<B::Memory, Error> {
        let device = buffer.device;
        let buffer_req = unsafe { device.get_buffer_requirements(&buffer.buf) };
        let upload_type = Self::upload_type(memory_types, &buffer_req)
            .ok_or_else(|| Error::Device("no CPU-visible memory type for vertex data".into()))?;

        let memory = unsafe { device.allocate_memory(upload_type, buffer_req.size) }
            .map_err(|e| Error::device("allocate vertex memory", e))?;

        if let Err(err) = unsafe { Self::upload(buffer, &memory) } {
            unsafe { device.free_memory(memory) };
            return Err(err);
        }
        Ok(memory)
    }

    unsafe fn upload(buffer: &mut Buffer<'a, B, T>, memory: &B::Memory) -> Result<(), Error> {
        let device = buffer.device;
        device
            .bind_buffer_memory(memory, 0, &mut buffer.buf)
            .map_err(|e| Error::device("bind vertex memory", e))?;

        let mapping = device
            .map_memory(memory, m::Segment::ALL)
            .map_err(|e| Error::device("map vertex memory", e))?;
        ptr::copy_nonoverlapping(
            buffer.content.as_ptr() as *const u8,
            mapping,
            buffer.len as usize,
        );
        let flushed = device.flush_mapped_memory_ranges(iter::once((memory, m::Segment::ALL)));
        device.unmap_memory(memory);
        flushed.map_err(|e| Error::device("flush vertex memory", e))
    }

    fn upload_type(properties: &[MemoryType], buffer_req: &m::Requirements) -> Option<MemoryTypeId> {
        properties
            .iter()
            .enumerate()
            .position(|(id, mem_type)| {
                buffer_req.type_mask & (1 << id) != 0
                    && mem_type.properties.contains(m::Properties::CPU_VISIBLE)
            })
            .map(MemoryTypeId::from)
    }
}

impl<'a, B: Backend, T> Drop for Memory<'a, B, T> {
    fn drop(&mut self) {
        unsafe {
            let device = self.buffer.device;
            ManuallyDrop::drop(&mut self.buffer);
            device.free_memory(ManuallyDrop::into_inner(ptr::read(&self.memory)))
        }
    }
}

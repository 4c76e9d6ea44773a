use crate::error::Error;
use crate::shader::Program;
use gfx_hal::{
    adapter, buffer as b, command, format as f, image as i, pass, pool,
    prelude::*,
    queue::{family::QueueFamilyId, Submission},
    window, Backend,
};
use log::{info, warn};

use std::borrow::Borrow;
use std::iter;
use std::mem::ManuallyDrop;

mod buffer;
mod memory;
mod pipeline;
mod swapchain;
pub mod vertex;

use buffer::Buffer;
use memory::Memory;
use pipeline::{Pipeline, POSITION_BINDING};
use std::ptr;
use swapchain::Swapchain;
use vertex::{COLORS, POSITIONS, VERTEX_COUNT};

const FRAMES_IN_FLIGHT: usize = 2;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Draws the colored quad. Everything but the per-frame command
/// buffers is created once in `new` and released on drop.
pub struct Renderer<'a, B: Backend> {
    frame: usize,
    device: &'a B::Device,
    command_buffers: Vec<B::CommandBuffer>,
    submission_complete_semaphores: Vec<B::Semaphore>,
    submission_complete_fences: Vec<B::Fence>,
    framebuffers: Vec<Option<B::Framebuffer>>,
    command_pool: ManuallyDrop<B::CommandPool>,
    positions: ManuallyDrop<Memory<'a, B, [f32; 3]>>,
    colors: ManuallyDrop<Memory<'a, B, [f32; 3]>>,
    pipeline: ManuallyDrop<Pipeline<'a, B>>,
    render_pass: ManuallyDrop<B::RenderPass>,
    swapchain: ManuallyDrop<Swapchain<'a, B>>,
}

impl<'a, B> Renderer<'a, B>
where
    B: Backend,
{
    pub fn new(
        surface: &'a mut B::Surface,
        adapter: &'a adapter::Adapter<B>,
        device: &'a B::Device,
        family: QueueFamilyId,
        init_dims: window::Extent2D,
        program: &Program,
    ) -> Result<Self, Error> {
        let memory_types = adapter.physical_device.memory_properties().memory_types;
        let limits = adapter.physical_device.limits();

        let positions = Memory::new(Buffer::new(device, &POSITIONS, &limits)?, &memory_types)?;
        let colors = Memory::new(Buffer::new(device, &COLORS, &limits)?, &memory_types)?;
        info!("Uploaded {} vertices", VERTEX_COUNT);

        let swapchain = Swapchain::new(device, surface, adapter, init_dims)?;
        let render_pass = Self::create_render_pass(device, swapchain.format)?;

        let pipeline = match Pipeline::new(device, program, &render_pass) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                unsafe { device.destroy_render_pass(render_pass) };
                return Err(err);
            }
        };

        let command_pool = match Self::create_command_pool(device, family) {
            Ok(pool) => pool,
            Err(err) => {
                unsafe { device.destroy_render_pass(render_pass) };
                return Err(err);
            }
        };

        let mut renderer = Renderer {
            device,
            command_buffers: Vec::with_capacity(FRAMES_IN_FLIGHT),
            submission_complete_semaphores: Vec::with_capacity(FRAMES_IN_FLIGHT),
            submission_complete_fences: Vec::with_capacity(FRAMES_IN_FLIGHT),
            framebuffers: Vec::with_capacity(FRAMES_IN_FLIGHT),
            command_pool: ManuallyDrop::new(command_pool),
            positions: ManuallyDrop::new(positions),
            colors: ManuallyDrop::new(colors),
            pipeline: ManuallyDrop::new(pipeline),
            render_pass: ManuallyDrop::new(render_pass),
            swapchain: ManuallyDrop::new(swapchain),
            frame: 0,
        };
        renderer.create_frame_resources()?;

        Ok(renderer)
    }

    pub fn render(&mut self, queue: &mut B::CommandQueue) -> Result<(), Error> {
        let surface_image = unsafe {
            match self.swapchain.surface.acquire_image(!0) {
                Ok((image, _)) => image,
                Err(err) => {
                    warn!("Failed to acquire image ({:?}), reconfiguring swapchain", err);
                    return self.reconfigure();
                }
            }
        };

        let frame_idx = self.frame % FRAMES_IN_FLIGHT;

        unsafe {
            let fence = &self.submission_complete_fences[frame_idx];
            self.device
                .wait_for_fence(fence, !0)
                .map_err(|e| Error::device("wait for fence", e))?;
            self.device
                .reset_fence(fence)
                .map_err(|e| Error::device("reset fence", e))?;
        }

        let frame_buffer = unsafe {
            self.device.create_framebuffer(
                &self.render_pass,
                iter::once(surface_image.borrow()),
                i::Extent {
                    width: self.swapchain.dims.width,
                    height: self.swapchain.dims.height,
                    depth: 1,
                },
            )
        }
        .map_err(|e| Error::device("create framebuffer", e))?;

        // The fence above guarantees the previous user of this slot is done.
        if let Some(old) = self.framebuffers[frame_idx].replace(frame_buffer) {
            unsafe { self.device.destroy_framebuffer(old) };
        }

        let cmd_buffer = &mut self.command_buffers[frame_idx];
        let present = unsafe {
            cmd_buffer.reset(false);
            cmd_buffer.begin_primary(command::CommandBufferFlags::ONE_TIME_SUBMIT);
            cmd_buffer.set_viewports(0, &[self.swapchain.viewport.clone()]);
            cmd_buffer.set_scissors(0, &[self.swapchain.viewport.rect]);
            cmd_buffer.bind_graphics_pipeline(&self.pipeline.pipeline);
            cmd_buffer.bind_vertex_buffers(
                POSITION_BINDING,
                vec![
                    (&*self.positions.buffer.buf, b::SubRange::WHOLE),
                    (&*self.colors.buffer.buf, b::SubRange::WHOLE),
                ],
            );
            if let Some(frame_buffer) = &self.framebuffers[frame_idx] {
                cmd_buffer.begin_render_pass(
                    &self.render_pass,
                    frame_buffer,
                    self.swapchain.viewport.rect,
                    &[command::ClearValue {
                        color: command::ClearColor {
                            float32: CLEAR_COLOR,
                        },
                    }],
                    command::SubpassContents::Inline,
                );
                cmd_buffer.draw(0..VERTEX_COUNT, 0..1);
                cmd_buffer.end_render_pass();
            }
            cmd_buffer.finish();

            let submission = Submission {
                command_buffers: iter::once(&*cmd_buffer),
                wait_semaphores: None,
                signal_semaphores: iter::once(&self.submission_complete_semaphores[frame_idx]),
            };

            queue.submit(
                submission,
                Some(&self.submission_complete_fences[frame_idx]),
            );

            queue.present_surface(
                &mut self.swapchain.surface,
                surface_image,
                Some(&self.submission_complete_semaphores[frame_idx]),
            )
        };

        self.frame += 1;

        match present {
            Ok(None) => Ok(()),
            Ok(Some(_)) => {
                warn!("Swapchain is suboptimal, reconfiguring");
                self.reconfigure()
            }
            Err(err) => {
                warn!("Failed to present ({:?}), reconfiguring swapchain", err);
                self.reconfigure()
            }
        }
    }

    pub fn resize(&mut self, dims: window::Extent2D) -> Result<(), Error> {
        self.swapchain.dims = dims;
        self.reconfigure()
    }

    fn reconfigure(&mut self) -> Result<(), Error> {
        self.device
            .wait_idle()
            .map_err(|e| Error::device("wait for idle device", e))?;
        self.destroy_framebuffers();
        self.swapchain.recreate()
    }

    fn destroy_framebuffers(&mut self) {
        for frame_buffer in self.framebuffers.iter_mut().filter_map(Option::take) {
            unsafe { self.device.destroy_framebuffer(frame_buffer) };
        }
    }

    fn create_frame_resources(&mut self) -> Result<(), Error> {
        for _ in 0..FRAMES_IN_FLIGHT {
            self.command_buffers
                .push(unsafe { self.command_pool.allocate_one(command::Level::Primary) });
            self.submission_complete_semaphores.push(
                self.device
                    .create_semaphore()
                    .map_err(|e| Error::device("create semaphore", e))?,
            );
            self.submission_complete_fences.push(
                self.device
                    .create_fence(true)
                    .map_err(|e| Error::device("create fence", e))?,
            );
            self.framebuffers.push(None);
        }
        Ok(())
    }

    fn create_render_pass(device: &B::Device, format: f::Format) -> Result<B::RenderPass, Error> {
        let attachment = pass::Attachment {
            format: Some(format),
            samples: 1,
            ops: pass::AttachmentOps::new(
                pass::AttachmentLoadOp::Clear,
                pass::AttachmentStoreOp::Store,
            ),
            stencil_ops: pass::AttachmentOps::DONT_CARE,
            layouts: i::Layout::Undefined..i::Layout::Present,
        };

        let subpass = pass::SubpassDesc {
            colors: &[(0, i::Layout::ColorAttachmentOptimal)],
            depth_stencil: None,
            inputs: &[],
            resolves: &[],
            preserves: &[],
        };

        unsafe { device.create_render_pass(&[attachment], &[subpass], &[]) }
            .map_err(|e| Error::device("create render pass", e))
    }

    fn create_command_pool(device: &B::Device, family: QueueFamilyId) -> Result<B::CommandPool, Error> {
        unsafe { device.create_command_pool(family, pool::CommandPoolCreateFlags::RESET_INDIVIDUAL) }
            .map_err(|e| Error::device("create command pool", e))
    }
}

impl<'a, B: Backend> Drop for Renderer<'a, B> {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            warn!("Device did not go idle before teardown: {:?}", err);
        }
        self.destroy_framebuffers();

        let device = self.device;
        unsafe {
            let mut command_pool = ManuallyDrop::into_inner(ptr::read(&self.command_pool));
            command_pool.free(self.command_buffers.drain(..));
            device.destroy_command_pool(command_pool);

            for s in self.submission_complete_semaphores.drain(..) {
                device.destroy_semaphore(s);
            }
            for f in self.submission_complete_fences.drain(..) {
                device.destroy_fence(f);
            }

            ManuallyDrop::drop(&mut self.positions);
            ManuallyDrop::drop(&mut self.colors);
            ManuallyDrop::drop(&mut self.pipeline);
            device.destroy_render_pass(ManuallyDrop::into_inner(ptr::read(&self.render_pass)));
            ManuallyDrop::drop(&mut self.swapchain);
        }
        info!("Renderer released");
    }
}

use crate::error::Error;
use crate::shader::{InfoLog, Program, COLOR_ATTRIBUTE, POSITION_ATTRIBUTE};
use gfx_hal::{format as f, pass::Subpass, prelude::*, pso, Backend};
use std::iter;
use std::mem::{self, ManuallyDrop};
use std::ops::Range;
use std::ptr;

const ENTRY_NAME: &str = "main";

/// Colors are bound at the slot right after positions.
pub const POSITION_BINDING: u32 = 0;
const COLOR_BINDING: u32 = POSITION_BINDING + 1;

pub struct Pipeline<'a, B: Backend> {
    device: &'a B::Device,
    pub pipeline: ManuallyDrop<B::GraphicsPipeline>,
    pub pipeline_layout: ManuallyDrop<B::PipelineLayout>,
}

impl<'a, B: Backend> Pipeline<'a, B> {
    /// Builds the graphics pipeline for `program`. Positions and colors
    /// come from two separate vertex buffers, 3 floats per vertex each.
    pub fn new(
        device: &'a B::Device,
        program: &Program,
        render_pass: &B::RenderPass,
    ) -> Result<Self, Error> {
        let position_location = Self::attribute(program, POSITION_ATTRIBUTE)?;
        let color_location = Self::attribute(program, COLOR_ATTRIBUTE)?;

        let pipeline_layout = unsafe {
            device.create_pipeline_layout(
                iter::empty::<&B::DescriptorSetLayout>(),
                iter::empty::<&(pso::ShaderStageFlags, Range<u32>)>(),
            )
        }
        .map_err(|e| Error::device("create pipeline layout", e))?;

        let vs_module = match Self::load_spirv(device, &program.vertex.spirv) {
            Ok(module) => module,
            Err(err) => {
                unsafe { device.destroy_pipeline_layout(pipeline_layout) };
                return Err(err);
            }
        };
        let fs_module = match Self::load_spirv(device, &program.fragment.spirv) {
            Ok(module) => module,
            Err(err) => unsafe {
                device.destroy_shader_module(vs_module);
                device.destroy_pipeline_layout(pipeline_layout);
                return Err(err);
            },
        };

        let graphic_pipeline = {
            let shader_entries = pso::GraphicsShaderSet {
                vertex: pso::EntryPoint {
                    entry: ENTRY_NAME,
                    module: &vs_module,
                    specialization: pso::Specialization::default(),
                },
                hull: None,
                domain: None,
                geometry: None,
                fragment: Some(pso::EntryPoint {
                    entry: ENTRY_NAME,
                    module: &fs_module,
                    specialization: pso::Specialization::default(),
                }),
            };

            let subpass = Subpass {
                index: 0,
                main_pass: render_pass,
            };

            let mut pipeline_desc = pso::GraphicsPipelineDesc::new(
                shader_entries,
                pso::Primitive::TriangleList,
                pso::Rasterizer::FILL,
                &pipeline_layout,
                subpass,
            );
            pipeline_desc.blender.targets.push(pso::ColorBlendDesc {
                mask: pso::ColorMask::ALL,
                blend: None,
            });

            for &(binding, location) in &[
                (POSITION_BINDING, position_location),
                (COLOR_BINDING, color_location),
            ] {
                pipeline_desc.vertex_buffers.push(pso::VertexBufferDesc {
                    binding,
                    stride: mem::size_of::<[f32; 3]>() as u32,
                    rate: pso::VertexInputRate::Vertex,
                });
                pipeline_desc.attributes.push(pso::AttributeDesc {
                    location,
                    binding,
                    element: pso::Element {
                        format: f::Format::Rgb32Sfloat,
                        offset: 0,
                    },
                });
            }

            unsafe { device.create_graphics_pipeline(&pipeline_desc, None) }
        };

        unsafe {
            device.destroy_shader_module(vs_module);
            device.destroy_shader_module(fs_module);
        }

        match graphic_pipeline {
            Ok(pipeline) => Ok(Pipeline {
                device,
                pipeline: ManuallyDrop::new(pipeline),
                pipeline_layout: ManuallyDrop::new(pipeline_layout),
            }),
            Err(err) => {
                unsafe { device.destroy_pipeline_layout(pipeline_layout) };
                Err(Error::Link(InfoLog::new(&format!("{:?}", err))))
            }
        }
    }

    fn attribute(program: &Program, name: &str) -> Result<u32, Error> {
        program.attribute_location(name).ok_or_else(|| {
            Error::Link(InfoLog::new(&format!("attribute `{}` has no location", name)))
        })
    }

    fn load_spirv(device: &B::Device, spirv: &[u32]) -> Result<B::ShaderModule, Error> {
        unsafe { device.create_shader_module(spirv) }
            .map_err(|e| Error::Link(InfoLog::new(&format!("{:?}", e))))
    }
}

impl<'a, B: Backend> Drop for Pipeline<'a, B> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_graphics_pipeline(ManuallyDrop::into_inner(ptr::read(&self.pipeline)));
            self.device
                .destroy_pipeline_layout(ManuallyDrop::into_inner(ptr::read(
                    &self.pipeline_layout,
                )));
        }
    }
}

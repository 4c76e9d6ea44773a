#[cfg(feature = "metal")]
use gfx_backend_metal as back;

#[cfg(feature = "vulkan")]
use gfx_backend_vulkan as back;

mod circle;
mod error;
mod frame_loop;
mod renderer;
mod settings;
mod shader;

use error::Error;
use frame_loop::FrameLoop;
use renderer::Renderer;
use settings::{Settings, APP_NAME, BACKEND, DIMS, TITLE};

use gfx_hal::{adapter::Adapter, prelude::*, window, Backend, Features};
use log::{error, info, trace};
use std::io::{self, Write};
use std::process;

use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::desktop::EventLoopExtDesktop,
};

fn main() {
    env_logger::init();

    let status = match run() {
        Ok(()) => 0,
        Err(err) => {
            error!("{}", err);
            report(&err, &mut io::stderr());
            err.exit_code()
        }
    };
    process::exit(status);
}

/// Writes a fatal error regardless of the log filter.
fn report<W: Write>(err: &Error, out: &mut W) {
    let _ = writeln!(out, "{}", err);
}

fn run() -> Result<(), Error> {
    let settings = Settings::from_env();

    let mut event_loop = EventLoop::new();
    let window = winit::window::WindowBuilder::new()
        .with_title(TITLE)
        .with_inner_size(winit::dpi::Size::Physical(winit::dpi::PhysicalSize::new(
            DIMS.width,
            DIMS.height,
        )))
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|e| Error::Init(format!("window creation failed: {}", e)))?;

    let instance = back::Instance::create(APP_NAME, 1)
        .map_err(|_| Error::Init(format!("{} backend is not available", BACKEND)))?;
    eprintln!("Status: Using {} backend", BACKEND);

    let mut surface = unsafe { instance.create_surface(&window) }
        .map_err(|e| Error::Init(format!("surface creation failed: {:?}", e)))?;

    let result = draw_quad(
        instance.enumerate_adapters(),
        &mut surface,
        &mut event_loop,
        &settings,
    );

    unsafe {
        instance.destroy_surface(surface);
    }
    result
}

fn draw_quad<B: Backend>(
    adapters: Vec<Adapter<B>>,
    surface: &mut B::Surface,
    event_loop: &mut EventLoop<()>,
    settings: &Settings,
) -> Result<(), Error> {
    let supports = |family: &B::QueueFamily| {
        surface.supports_queue_family(family) && family.queue_type().supports_graphics()
    };

    let adapter = adapters
        .into_iter()
        .find(|adapter| adapter.queue_families.iter().any(|f| supports(f)))
        .ok_or_else(|| Error::Init("no adapter can draw to the window".into()))?;
    let family = adapter
        .queue_families
        .iter()
        .find(|f| supports(f))
        .ok_or_else(|| Error::Init("no graphics queue family".into()))?;

    println!("Init :: checking adapter:");
    println!(
        "{} ({:?}, vendor {:#06x})",
        adapter.info.name, adapter.info.device_type, adapter.info.vendor
    );
    println!(" Shader language version: \n{}", shader::SHADING_LANGUAGE);

    let mut gpu = unsafe {
        adapter
            .physical_device
            .open(&[(family, &[1.0])], Features::empty())
    }
    .map_err(|e| Error::Init(format!("device creation failed: {:?}", e)))?;
    let family = family.id();

    let mut queue_group = gpu
        .queue_groups
        .pop()
        .ok_or_else(|| Error::Init("device has no queue group".into()))?;
    let queue = queue_group
        .queues
        .get_mut(0)
        .ok_or_else(|| Error::Init("queue group is empty".into()))?;
    let device = gpu.device;

    let program = shader::build_program()?;
    info!("Shader program linked");

    let mut renderer = Renderer::new(surface, &adapter, &device, family, DIMS, &program)?;

    #[cfg(debug_assertions)]
    let mut fps_counter = fps_counter::FPSCounter::new();
    let mut frame_loop = FrameLoop::new(settings.close_after);
    let mut outcome = Ok(());

    info!("Entering render loop");
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => frame_loop.request_close(),
                WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                    let dims = window::Extent2D {
                        width: size.width,
                        height: size.height,
                    };
                    if let Err(err) = renderer.resize(dims) {
                        outcome = Err(err);
                        frame_loop.request_close();
                    }
                }
                _ => {}
            },
            Event::MainEventsCleared if frame_loop.is_running() => match renderer.render(queue) {
                Ok(()) => {
                    frame_loop.frame_presented();
                    #[cfg(debug_assertions)]
                    trace!("frame: {} fps", fps_counter.tick());
                }
                Err(err) => {
                    outcome = Err(err);
                    frame_loop.request_close();
                }
            },
            _ => {}
        }

        if !frame_loop.is_running() {
            *control_flow = ControlFlow::Exit;
        }
    });
    info!("Window closed after {} frames", frame_loop.frames());

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{InfoLog, ShaderKind};
    use std::env;

    #[test]
    fn compile_log_is_written_out() {
        let err = Error::Compile {
            stage: ShaderKind::Fragment,
            log: InfoLog::new("ERROR: 0:5: '' : syntax error"),
        };
        let mut out = Vec::new();
        report(&err, &mut out);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("fragment shader"));
        assert!(text.contains("syntax error"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn init_failure_is_written_out() {
        let mut out = Vec::new();
        report(&Error::Init("window creation failed".into()), &mut out);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Init error: window creation failed\n"
        );
    }

    // Needs a display and a GPU.
    #[test]
    #[ignore]
    fn closes_cleanly_right_after_setup() {
        env::set_var(settings::CLOSE_AFTER_VAR, "0");
        let result = run();
        env::remove_var(settings::CLOSE_AFTER_VAR);
        if let Err(err) = result {
            panic!("expected a clean close, got: {}", err);
        }
    }
}

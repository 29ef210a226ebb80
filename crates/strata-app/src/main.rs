// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use strata_core::init_tracing;
use strata_render::records::VERTICES_PER_OBJECT;
use strata_render::{FrameStatus, RenderSize, Renderer, SpirvDir};
use strata_render_vk::{BuiltinShaders, FrameError, Severity, VkContext};
use tracing::{debug, error, info, warn};

use strata_platform::winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    raw_window_handle::{HasDisplayHandle, HasWindowHandle},
    window::{Window, WindowId},
};

mod config;
mod scene;

use config::{load_cfg, AppCfg};
use scene::{checker, Scene};

/// Side of the generated user image, in pixels.
const CHECKER_SIZE: u32 = 64;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "strata.toml")]
    config: PathBuf,
    /// Load `<program>.<stage>.spv` from this directory instead of the built-in shaders
    #[arg(long)]
    shader_dir: Option<PathBuf>,
    /// Exit after this many presented frames, 0 runs until closed
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

struct App {
    args: Args,
    cfg: AppCfg,
    window: Option<Window>,
    ctx: Option<VkContext>,
    scene: Option<Scene>,
    render_size: RenderSize,

    exiting: bool,
    failure: Option<anyhow::Error>,
    frames: u32,
    presented: u64,
    last_fps_instant: Instant,
    last_tick: Instant,
}

/// Fills every layer from the scene and submits one frame.
fn draw_frame(ctx: &mut VkContext, scene: &Scene) -> Result<FrameStatus, FrameError> {
    for layer in 0..scene.layer_count() {
        let objects = ctx.objects_mut(layer)?;
        let n = scene.fill(layer, objects);
        ctx.draw(layer, n * VERTICES_PER_OBJECT)?;
    }
    ctx.submit()
}

impl App {
    fn new(args: Args, cfg: AppCfg) -> Self {
        let now = Instant::now();
        App {
            args,
            cfg,
            window: None,
            ctx: None,
            scene: None,
            render_size: RenderSize {
                width: 1,
                height: 1,
            },
            exiting: false,
            failure: None,
            frames: 0,
            presented: 0,
            last_fps_instant: now,
            last_tick: now,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.cfg.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.cfg.window.width,
                self.cfg.window.height,
            ));
        let window = event_loop.create_window(attrs).context("create_window")?;

        let size = window.inner_size();
        self.render_size = RenderSize {
            width: size.width,
            height: size.height,
        };

        let wh = window.window_handle().context("window_handle")?;
        let dh = window.display_handle().context("display_handle")?;

        let ctx = match &self.args.shader_dir {
            Some(dir) => {
                info!("shaders from {}", dir.display());
                VkContext::new(
                    &wh,
                    &dh,
                    self.render_size,
                    &self.cfg.context,
                    &SpirvDir::new(dir),
                )
            }
            None => VkContext::new(
                &wh,
                &dh,
                self.render_size,
                &self.cfg.context,
                &BuiltinShaders,
            ),
        };
        let mut ctx = ctx.context("vulkan context")?;

        ctx.upload_user_image(
            0,
            CHECKER_SIZE,
            CHECKER_SIZE,
            &checker(CHECKER_SIZE, 8),
        )
        .context("upload checker image")?;

        let cc = ctx.config();
        let scene = Scene::new(
            cc.layer_max as usize,
            self.cfg.demo.objects_per_layer.min(cc.object_max),
            self.cfg.demo.seed,
            RenderSize {
                width: cc.sprite_width,
                height: cc.sprite_height,
            },
        );
        info!(
            "device = {}, {} layers x {} objects",
            ctx.device_info().name,
            scene.layer_count(),
            self.cfg.demo.objects_per_layer
        );

        self.window = Some(window);
        self.ctx = Some(ctx);
        self.scene = Some(scene);
        self.last_tick = Instant::now();
        Ok(())
    }

    fn recreate_surface(&mut self) -> Result<()> {
        let (Some(window), Some(ctx)) = (self.window.as_ref(), self.ctx.as_mut()) else {
            return Ok(());
        };
        let wh = window.window_handle().context("window_handle")?;
        let dh = window.display_handle().context("display_handle")?;
        ctx.recreate_surface(&wh, &dh, self.render_size)
            .context("recreate surface")
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        self.failure = Some(e);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        // context before window: the surface borrows the window
        self.ctx = None;
        self.window = None;
        event_loop.exit();
    }

    fn on_frame_error(&mut self, event_loop: &ActiveEventLoop, e: FrameError) {
        match e.severity() {
            Severity::Recoverable => {
                warn!("{e}");
                let res = match e {
                    FrameError::SurfaceLost => self.recreate_surface(),
                    _ => match self.ctx.as_mut() {
                        Some(ctx) => ctx.resize(self.render_size).context("rebuild swapchain"),
                        None => Ok(()),
                    },
                };
                if let Err(e) = res {
                    self.fail(event_loop, e);
                }
            }
            Severity::SkipFrame | Severity::Rejected => warn!("frame dropped: {e}"),
            Severity::Fatal => self.fail(event_loop, anyhow!(e).context("render")),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f32().min(0.1);
        self.last_tick = now;

        let (Some(ctx), Some(scene)) = (self.ctx.as_mut(), self.scene.as_mut()) else {
            return;
        };
        if ctx.is_paused() {
            return;
        }
        scene.step(dt);

        match draw_frame(ctx, scene) {
            Ok(FrameStatus::Presented) => {
                self.frames = self.frames.saturating_add(1);
                self.presented += 1;
            }
            Ok(status) => debug!("frame {status:?}"),
            Err(e) => self.on_frame_error(event_loop, e),
        }

        if self.args.frames > 0 && self.presented >= self.args.frames {
            info!("{} frames presented, exiting", self.presented);
            self.shutdown(event_loop);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && !self.exiting {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
                return;
            }
        }

        event_loop.set_control_flow(if self.cfg.context.vsync {
            ControlFlow::Wait
        } else {
            ControlFlow::Poll
        });
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                self.render_size = RenderSize {
                    width: new_size.width,
                    height: new_size.height,
                };
                info!(
                    "Resized → {}x{}",
                    self.render_size.width, self.render_size.height
                );
                if let Some(ctx) = self.ctx.as_mut() {
                    if let Err(e) = ctx.resize(self.render_size) {
                        self.on_frame_error(event_loop, e);
                    }
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                if !self.exiting {
                    self.redraw(event_loop);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }

        let paused = self.ctx.as_ref().map_or(true, |c| c.is_paused());
        if paused {
            event_loop.set_control_flow(ControlFlow::Wait);
            self.frames = 0;
            return;
        }
        if let Some(w) = &self.window {
            w.request_redraw();
        }

        let now = Instant::now();
        if now.duration_since(self.last_fps_instant) >= Duration::from_secs(1) {
            info!("fps ~ {}", self.frames);
            self.frames = 0;
            self.last_fps_instant = now;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);
    let event_loop: EventLoop<()> = EventLoop::new().context("create event loop")?;

    let mut app = App::new(args, cfg);
    event_loop.run_app(&mut app).context("event loop")?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

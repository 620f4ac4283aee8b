use anyhow::Result;
use glam::Mat4;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use crate::config::WindowConfig;
use crate::viewer::SceneDraw;

#[cfg(feature = "panel")]
pub mod egui_pass;
mod scene_pass;
mod window_surface;

pub use scene_pass::{ScenePass, ScenePassParams};
pub use window_surface::{SurfaceFrame, WindowSurface};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Converts one sRGB-encoded channel to linear light.
pub fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB color with straight alpha to linear color; alpha is left alone.
pub fn linear_color([r, g, b, a]: [f32; 4]) -> [f32; 4] {
    [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a]
}

pub struct Renderer {
    surface: WindowSurface,
    scene: ScenePass,
}

impl Renderer {
    pub fn new(window_cfg: &WindowConfig) -> Self {
        Self { surface: WindowSurface::new(window_cfg), scene: ScenePass::new() }
    }

    pub fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.surface.ensure_window(event_loop)
    }

    pub fn window(&self) -> Option<&Window> {
        self.surface.window()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.surface.resize(size);
    }

    pub fn device_and_queue(&self) -> Result<(&wgpu::Device, &wgpu::Queue)> {
        self.surface.device_and_queue()
    }

    pub fn surface_format(&self) -> Result<wgpu::TextureFormat> {
        self.surface.surface_format()
    }

    pub fn begin_frame(&mut self) -> Result<SurfaceFrame> {
        self.surface.acquire_surface_frame()
    }

    /// Clears `frame` and draws the scene into it. Presenting is left to the caller
    /// so overlays can be composited first.
    pub fn render_scene(
        &mut self,
        frame: &SurfaceFrame,
        view_proj: Mat4,
        draws: &[SceneDraw<'_>],
        clear_color: [f32; 3],
    ) -> Result<()> {
        let (device, queue) = self.surface.device_and_queue()?;
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Scene Encoder") });
        self.scene.render(ScenePassParams {
            device,
            queue,
            encoder: &mut encoder,
            color_view: frame.view(),
            depth_view: self.surface.depth_view()?,
            format: self.surface.surface_format()?,
            view_proj,
            draws,
            clear_color,
        })?;
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

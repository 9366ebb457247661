/// Host environment seam: the container, the frame clock and the rendering backend
use std::rc::Rc;

use crate::error::SceneError;
use crate::graph::{GeometryKey, MaterialKey, SceneGraph};
use crate::material::Color;
use crate::projection::{Camera, Viewport};

/// Invoked once per display frame with a timestamp in milliseconds
pub type FrameCallback = Rc<dyn Fn(f64)>;

/// Invoked whenever the global viewport changes size
pub type ResizeCallback = Rc<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// How a scene wants its renderer configured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    pub clear_color: Color,
    pub antialias: bool,
    pub shadows: bool,
    pub high_performance: bool,
    /// Upper bound applied to the device pixel ratio
    pub max_pixel_ratio: f64,
}

impl RendererOptions {
    pub fn new(clear_color: Color) -> Self {
        Self {
            clear_color,
            antialias: true,
            shadows: false,
            high_performance: false,
            max_pixel_ratio: 2.0,
        }
    }

    pub fn with_shadows(mut self) -> Self {
        self.shadows = true;
        self
    }

    pub fn with_high_performance(mut self) -> Self {
        self.high_performance = true;
        self
    }

    /// Pixel ratio to render at on a display reporting `device_ratio`
    pub fn pixel_ratio(&self, device_ratio: f64) -> f64 {
        if device_ratio.is_finite() && device_ratio > 0.0 {
            device_ratio.min(self.max_pixel_ratio)
        } else {
            1.0
        }
    }
}

/// A drawing backend bound to one drawing surface.
///
/// Every release operation must tolerate resources that were never uploaded
/// or were already released.
pub trait Renderer {
    fn set_size(&mut self, viewport: Viewport);
    fn set_pixel_ratio(&mut self, ratio: f64);
    fn render(&mut self, graph: &SceneGraph, camera: &Camera);
    fn release_geometry(&mut self, key: GeometryKey);
    fn release_material(&mut self, key: MaterialKey);
    /// Free the rendering context itself. Later calls are no-ops.
    fn dispose(&mut self);
}

/// Everything a mounted scene borrows from its host: the container it draws
/// into, the window-level resize event, and the frame clock.
///
/// Implementations are single-threaded and use interior mutability, so every
/// method takes `&self`. Removing or cancelling an unknown id is a no-op.
pub trait Environment {
    type Renderer: Renderer;

    /// Current client size of the container
    fn container_size(&self) -> Viewport;

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    fn create_renderer(&self, options: &RendererOptions) -> Result<Self::Renderer, SceneError>;

    /// Append the renderer's drawing surface to the container
    fn attach_surface(&self, renderer: &Self::Renderer) -> Result<(), SceneError>;

    /// Remove the renderer's drawing surface from the container if present
    fn detach_surface(&self, renderer: &Self::Renderer);

    fn add_resize_listener(&self, callback: ResizeCallback) -> ListenerId;

    fn remove_resize_listener(&self, id: ListenerId);

    /// Schedule `callback` for the next frame
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameId, SceneError>;

    fn cancel_frame(&self, id: FrameId);
}

/// Browser host: a DOM container, window resize events and requestAnimationFrame
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use healsim_core::{Environment, FrameCallback, FrameId, ListenerId, RendererOptions, ResizeCallback, SceneError, Viewport};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Document, HtmlCanvasElement, HtmlElement, Window};

use crate::renderer::{js_error, WebGlRenderer};

pub struct DomEnvironment {
    window: Window,
    document: Document,
    container: HtmlElement,
    listeners: RefCell<HashMap<u64, Closure<dyn FnMut()>>>,
    next_id: Cell<u64>,
}

impl DomEnvironment {
    pub fn new(window: Window, container: HtmlElement) -> Result<Self, SceneError> {
        let document = window
            .document()
            .ok_or_else(|| SceneError::Environment("window has no document".into()))?;
        Ok(Self {
            window,
            document,
            container,
            listeners: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn container(&self) -> &HtmlElement {
        &self.container
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Environment for DomEnvironment {
    type Renderer = WebGlRenderer;

    fn container_size(&self) -> Viewport {
        Viewport::new(
            self.container.client_width().max(0) as u32,
            self.container.client_height().max(0) as u32,
        )
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn create_renderer(&self, options: &RendererOptions) -> Result<WebGlRenderer, SceneError> {
        let canvas: HtmlCanvasElement = self
            .document
            .create_element("canvas")
            .map_err(|e| SceneError::Environment(js_error("createElement", e)))?
            .dyn_into()
            .map_err(|_| SceneError::Environment("created element is not a canvas".into()))?;
        WebGlRenderer::new(canvas, options)
    }

    fn attach_surface(&self, renderer: &WebGlRenderer) -> Result<(), SceneError> {
        self.container
            .append_child(renderer.canvas())
            .map(|_| ())
            .map_err(|e| SceneError::Environment(js_error("appendChild", e)))
    }

    fn detach_surface(&self, renderer: &WebGlRenderer) {
        let canvas = renderer.canvas();
        if let Some(parent) = canvas.parent_node() {
            if let Err(e) = parent.remove_child(canvas) {
                log::warn!("{}", js_error("removeChild", e));
            }
        }
    }

    fn add_resize_listener(&self, callback: ResizeCallback) -> ListenerId {
        let id = self.next_id();
        let closure = Closure::wrap(Box::new(move || callback()) as Box<dyn FnMut()>);
        if let Err(e) = self
            .window
            .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        {
            log::warn!("{}", js_error("addEventListener(resize)", e));
        }
        self.listeners.borrow_mut().insert(id, closure);
        ListenerId(id)
    }

    fn remove_resize_listener(&self, id: ListenerId) {
        let Some(closure) = self.listeners.borrow_mut().remove(&id.0) else {
            return;
        };
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        {
            log::warn!("{}", js_error("removeEventListener(resize)", e));
        }
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<FrameId, SceneError> {
        // A cancelled frame never runs, so its one-shot closure is never
        // reclaimed; it only holds weak references into the scene.
        let closure = Closure::once_into_js(move |time: f64| callback(time));
        self.window
            .request_animation_frame(closure.unchecked_ref())
            .map(|handle| FrameId(u64::from(handle as u32)))
            .map_err(|e| SceneError::Environment(js_error("requestAnimationFrame", e)))
    }

    fn cancel_frame(&self, id: FrameId) {
        if let Err(e) = self.window.cancel_animation_frame(id.0 as u32 as i32) {
            log::warn!("{}", js_error("cancelAnimationFrame", e));
        }
    }
}

impl Drop for DomEnvironment {
    fn drop(&mut self) {
        let ids: Vec<_> = self.listeners.borrow().keys().copied().collect();
        for id in ids {
            self.remove_resize_listener(ListenerId(id));
        }
    }
}

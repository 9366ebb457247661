/// Terminal host: the screen is the container, terminal resize events are the
/// resize signal and the app's main loop is the frame clock
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use healsim_core::{Environment, FrameCallback, FrameId, ListenerId, RendererOptions, ResizeCallback, SceneError, Viewport};

use crate::renderer::{AsciiRenderer, Framebuffer};

pub struct TerminalEnvironment {
    /// Columns and rows available to the scene
    size: Cell<(u16, u16)>,
    surface: RefCell<Option<Rc<RefCell<Framebuffer>>>>,
    listeners: RefCell<BTreeMap<u64, ResizeCallback>>,
    frames: RefCell<BTreeMap<u64, FrameCallback>>,
    next_id: Cell<u64>,
}

impl TerminalEnvironment {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            size: Cell::new((cols, rows)),
            surface: RefCell::new(None),
            listeners: RefCell::new(BTreeMap::new()),
            frames: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// The framebuffer currently shown, if a scene is mounted
    pub fn surface(&self) -> Option<Rc<RefCell<Framebuffer>>> {
        self.surface.borrow().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Record the new terminal size and notify every resize listener
    pub fn dispatch_resize(&self, cols: u16, rows: u16) -> usize {
        self.size.set((cols, rows));
        let callbacks: Vec<_> = self.listeners.borrow().values().cloned().collect();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Run the callbacks queued for this frame. Callbacks scheduled while
    /// pumping wait for the next call.
    pub fn pump_frames(&self, time_ms: f64) -> usize {
        let due = std::mem::take(&mut *self.frames.borrow_mut());
        let count = due.len();
        for callback in due.into_values() {
            callback(time_ms);
        }
        count
    }
}

impl Environment for TerminalEnvironment {
    type Renderer = AsciiRenderer;

    fn container_size(&self) -> Viewport {
        let (cols, rows) = self.size.get();
        // Cells are about twice as tall as wide
        Viewport::new(u32::from(cols), u32::from(rows) * 2)
    }

    fn create_renderer(&self, options: &RendererOptions) -> Result<AsciiRenderer, SceneError> {
        Ok(AsciiRenderer::new(options))
    }

    fn attach_surface(&self, renderer: &AsciiRenderer) -> Result<(), SceneError> {
        let mut surface = self.surface.borrow_mut();
        if surface.is_some() {
            return Err(SceneError::Environment("terminal already shows a scene".into()));
        }
        *surface = Some(Rc::clone(renderer.surface()));
        Ok(())
    }

    fn detach_surface(&self, renderer: &AsciiRenderer) {
        let mut surface = self.surface.borrow_mut();
        if surface.as_ref().is_some_and(|current| Rc::ptr_eq(current, renderer.surface())) {
            *surface = None;
        }
    }

    fn add_resize_listener(&self, callback: ResizeCallback) -> ListenerId {
        let id = self.next_id();
        self.listeners.borrow_mut().insert(id, callback);
        ListenerId(id)
    }

    fn remove_resize_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(&id.0);
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<FrameId, SceneError> {
        let id = self.next_id();
        self.frames.borrow_mut().insert(id, callback);
        Ok(FrameId(id))
    }

    fn cancel_frame(&self, id: FrameId) {
        self.frames.borrow_mut().remove(&id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healsim_core::{SceneHost, SceneKind};

    #[test]
    fn test_container_uses_half_cells() {
        let env = TerminalEnvironment::new(80, 24);
        assert_eq!(env.container_size(), Viewport::new(80, 48));
    }

    #[test]
    fn test_second_surface_is_refused() {
        let env = TerminalEnvironment::new(80, 24);
        let options = RendererOptions::new(healsim_core::Color::BLACK);
        let first = env.create_renderer(&options).unwrap();
        let second = env.create_renderer(&options).unwrap();

        env.attach_surface(&first).unwrap();
        assert!(env.attach_surface(&second).is_err());

        // Detaching a surface that is not shown leaves the current one alone
        env.detach_surface(&second);
        assert!(env.surface().is_some());
        env.detach_surface(&first);
        assert!(env.surface().is_none());
    }

    #[test]
    fn test_host_switches_and_draws_into_terminal() {
        let env = Rc::new(TerminalEnvironment::new(60, 20));
        let mut host = SceneHost::with_seed(Rc::clone(&env), 3);

        for kind in SceneKind::ALL {
            host.select(kind).unwrap();
            assert_eq!(env.pump_frames(0.0), 1);
            assert_eq!(env.pending_frames(), 1);
            assert_eq!(env.listener_count(), 1);
            let surface = env.surface().unwrap();
            assert_eq!(surface.borrow().height(), 20);
        }

        host.unmount();
        assert!(env.surface().is_none());
        assert_eq!(env.pending_frames(), 0);
        assert_eq!(env.listener_count(), 0);
    }

    #[test]
    fn test_resize_reaches_framebuffer() {
        let env = Rc::new(TerminalEnvironment::new(60, 20));
        let mut host = SceneHost::with_seed(Rc::clone(&env), 3);
        host.select(SceneKind::Ocean).unwrap();

        assert_eq!(env.dispatch_resize(100, 30), 1);

        let surface = env.surface().unwrap();
        assert_eq!((surface.borrow().width(), surface.borrow().height()), (100, 30));
    }
}

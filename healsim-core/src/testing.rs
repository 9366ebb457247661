/// Recording environment used by the lifecycle and host tests
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::environment::{
    Environment, FrameCallback, FrameId, ListenerId, Renderer, RendererOptions, ResizeCallback,
};
use crate::error::SceneError;
use crate::graph::{GeometryKey, MaterialKey, SceneGraph};
use crate::projection::{Camera, Viewport};

#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    RendererCreated(u64),
    SurfaceAttached(u64),
    SurfaceDetached(u64),
    ListenerAdded(ListenerId),
    ListenerRemoved(ListenerId),
    FrameRequested(FrameId),
    FrameCancelled(FrameId),
    Rendered(u64),
    GeometryReleased(GeometryKey),
    MaterialReleased(MaterialKey),
    RendererDisposed(u64),
}

#[derive(Default)]
struct Journal {
    events: Vec<MockEvent>,
    renders: usize,
    disposals: usize,
    double_releases: usize,
}

pub struct MockRenderer {
    id: u64,
    size: Viewport,
    pixel_ratio: f64,
    disposed: bool,
    released_geometries: HashSet<GeometryKey>,
    released_materials: HashSet<MaterialKey>,
    journal: Rc<RefCell<Journal>>,
}

impl MockRenderer {
    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn record(&self, event: MockEvent) {
        self.journal.borrow_mut().events.push(event);
    }
}

impl Renderer for MockRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        self.size = viewport;
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn render(&mut self, _graph: &SceneGraph, _camera: &Camera) {
        self.journal.borrow_mut().renders += 1;
        self.record(MockEvent::Rendered(self.id));
    }

    fn release_geometry(&mut self, key: GeometryKey) {
        if !self.released_geometries.insert(key) {
            self.journal.borrow_mut().double_releases += 1;
            return;
        }
        self.record(MockEvent::GeometryReleased(key));
    }

    fn release_material(&mut self, key: MaterialKey) {
        if !self.released_materials.insert(key) {
            self.journal.borrow_mut().double_releases += 1;
            return;
        }
        self.record(MockEvent::MaterialReleased(key));
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.journal.borrow_mut().disposals += 1;
        self.record(MockEvent::RendererDisposed(self.id));
    }
}

/// Container, resize event and frame clock driven by hand from tests
pub struct MockEnvironment {
    viewport: Cell<Viewport>,
    pixel_ratio: f64,
    fail_renderer: Cell<bool>,
    next_id: Cell<u64>,
    surfaces: RefCell<Vec<u64>>,
    max_surfaces: Cell<usize>,
    listeners: RefCell<BTreeMap<u64, ResizeCallback>>,
    frames: RefCell<BTreeMap<u64, FrameCallback>>,
    journal: Rc<RefCell<Journal>>,
}

impl MockEnvironment {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Cell::new(viewport),
            pixel_ratio: 1.0,
            fail_renderer: Cell::new(false),
            next_id: Cell::new(1),
            surfaces: RefCell::new(Vec::new()),
            max_surfaces: Cell::new(0),
            listeners: RefCell::new(BTreeMap::new()),
            frames: RefCell::new(BTreeMap::new()),
            journal: Rc::new(RefCell::new(Journal::default())),
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, event: MockEvent) {
        self.journal.borrow_mut().events.push(event);
    }

    pub fn fail_next_renderer(&self) {
        self.fail_renderer.set(true);
    }

    pub fn journal(&self) -> Vec<MockEvent> {
        self.journal.borrow().events.clone()
    }

    pub fn clear_journal(&self) {
        self.journal.borrow_mut().events.clear();
    }

    pub fn renders(&self) -> usize {
        self.journal.borrow().renders
    }

    pub fn renderer_disposals(&self) -> usize {
        self.journal.borrow().disposals
    }

    pub fn double_releases(&self) -> usize {
        self.journal.borrow().double_releases
    }

    /// Surfaces currently attached to the container
    pub fn surface_count(&self) -> usize {
        self.surfaces.borrow().len()
    }

    /// Most surfaces ever attached at the same time
    pub fn max_surface_count(&self) -> usize {
        self.max_surfaces.get()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Change the container size and fire the resize event, returning how
    /// many listeners ran
    pub fn resize_to(&self, viewport: Viewport) -> usize {
        self.viewport.set(viewport);
        let callbacks: Vec<_> = self.listeners.borrow().values().cloned().collect();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Run every callback queued for this frame, returning how many ran
    pub fn run_frames(&self, time: f64) -> usize {
        let due = self.steal_pending_frames();
        for callback in &due {
            callback(time);
        }
        due.len()
    }

    /// Take the queued frame callbacks without running them
    pub fn steal_pending_frames(&self) -> Vec<FrameCallback> {
        std::mem::take(&mut *self.frames.borrow_mut()).into_values().collect()
    }
}

impl Environment for MockEnvironment {
    type Renderer = MockRenderer;

    fn container_size(&self) -> Viewport {
        self.viewport.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn create_renderer(&self, _options: &RendererOptions) -> Result<MockRenderer, SceneError> {
        if self.fail_renderer.replace(false) {
            return Err(SceneError::Renderer("context lost".into()));
        }
        let id = self.next_id();
        self.record(MockEvent::RendererCreated(id));
        Ok(MockRenderer {
            id,
            size: Viewport::default(),
            pixel_ratio: 1.0,
            disposed: false,
            released_geometries: HashSet::new(),
            released_materials: HashSet::new(),
            journal: Rc::clone(&self.journal),
        })
    }

    fn attach_surface(&self, renderer: &MockRenderer) -> Result<(), SceneError> {
        let mut surfaces = self.surfaces.borrow_mut();
        surfaces.push(renderer.id);
        self.max_surfaces.set(self.max_surfaces.get().max(surfaces.len()));
        self.record(MockEvent::SurfaceAttached(renderer.id));
        Ok(())
    }

    fn detach_surface(&self, renderer: &MockRenderer) {
        let mut surfaces = self.surfaces.borrow_mut();
        if let Some(index) = surfaces.iter().position(|&id| id == renderer.id) {
            surfaces.remove(index);
            self.record(MockEvent::SurfaceDetached(renderer.id));
        }
    }

    fn add_resize_listener(&self, callback: ResizeCallback) -> ListenerId {
        let id = self.next_id();
        self.listeners.borrow_mut().insert(id, callback);
        self.record(MockEvent::ListenerAdded(ListenerId(id)));
        ListenerId(id)
    }

    fn remove_resize_listener(&self, id: ListenerId) {
        if self.listeners.borrow_mut().remove(&id.0).is_some() {
            self.record(MockEvent::ListenerRemoved(id));
        }
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<FrameId, SceneError> {
        let id = self.next_id();
        self.frames.borrow_mut().insert(id, callback);
        self.record(MockEvent::FrameRequested(FrameId(id)));
        Ok(FrameId(id))
    }

    fn cancel_frame(&self, id: FrameId) {
        if self.frames.borrow_mut().remove(&id.0).is_some() {
            self.record(MockEvent::FrameCancelled(id));
        }
    }
}

/// Scene lifecycle: mounting a scene into a host environment, driving its
/// render loop, and tearing it down again.
///
/// A mounted scene owns everything it created (renderer, listener, pending
/// frame) behind its [`SceneHandle`]. Callbacks handed to the environment only
/// hold weak references, so once the handle is disposed nothing the
/// environment still has queued can reach the scene.
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rand::SeedableRng;

use crate::environment::{Environment, FrameCallback, FrameId, ListenerId, Renderer, ResizeCallback};
use crate::error::SceneError;
use crate::kind::SceneKind;
use crate::projection::Viewport;
use crate::scenes::{self, Scene, SceneRng};

/// Shared cancellation flag checked at every frame boundary
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Bookkeeping for the self-rescheduling frame task
#[derive(Debug, Default)]
pub struct RenderLoop {
    token: CancelToken,
    pending: Option<FrameId>,
    frames: u64,
}

impl RenderLoop {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }
}

struct Mounted<E: Environment> {
    scene: Box<dyn Scene>,
    renderer: E::Renderer,
    render_loop: RenderLoop,
    tick: Option<FrameCallback>,
    listener: Option<ListenerId>,
    attached: bool,
}

impl<E: Environment> Mounted<E> {
    fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        self.scene.camera_mut().set_viewport(viewport);
        self.renderer.set_size(viewport);
    }

    fn frame(&mut self, env: &E, time: f64) {
        if self.render_loop.token.is_cancelled() {
            return;
        }
        self.render_loop.pending = None;

        self.scene.advance(time);
        self.renderer.render(self.scene.graph(), self.scene.camera());
        self.render_loop.frames += 1;

        let Some(tick) = self.tick.clone() else {
            return;
        };
        match env.request_frame(tick) {
            Ok(id) => self.render_loop.pending = Some(id),
            Err(e) => {
                log::error!("{} render loop stopped: {e}", self.scene.kind());
                self.render_loop.token.cancel();
            }
        }
    }

    /// Release scene arenas and their GPU copies, then the renderer itself
    fn release_resources(&mut self) -> usize {
        let graph = self.scene.graph_mut();
        let geometries: Vec<_> = graph.geometry_keys().collect();
        let materials: Vec<_> = graph.material_keys().collect();
        for &key in &geometries {
            self.renderer.release_geometry(key);
        }
        for &key in &materials {
            self.renderer.release_material(key);
        }
        let released = graph.release_all();
        self.renderer.dispose();
        released
    }
}

/// Owned handle to one mounted scene. Its only meaningful operation is
/// [`SceneHandle::dispose`]; dropping the handle disposes it too.
pub struct SceneHandle<E: Environment + 'static> {
    kind: SceneKind,
    env: Rc<E>,
    state: Option<Rc<RefCell<Mounted<E>>>>,
}

impl<E: Environment + 'static> SceneHandle<E> {
    /// Build `kind` inside the environment's container and start rendering.
    ///
    /// Appends one drawing surface, registers one resize listener and
    /// schedules the first frame. On error nothing is left behind.
    pub fn mount(env: Rc<E>, kind: SceneKind, seed: u64) -> Result<Self, SceneError> {
        let viewport = env.container_size();
        if viewport.is_empty() {
            return Err(SceneError::EmptySurface {
                width: viewport.width,
                height: viewport.height,
            });
        }

        let mut rng = SceneRng::seed_from_u64(seed);
        let scene = scenes::builder(kind)(&mut rng, viewport);
        let options = scene.options();

        let mut renderer = env.create_renderer(&options)?;
        renderer.set_pixel_ratio(options.pixel_ratio(env.device_pixel_ratio()));
        renderer.set_size(viewport);
        if let Err(e) = env.attach_surface(&renderer) {
            renderer.dispose();
            return Err(e);
        }

        let state = Rc::new(RefCell::new(Mounted::<E> {
            scene,
            renderer,
            render_loop: RenderLoop::default(),
            tick: None,
            listener: None,
            attached: true,
        }));

        let listener = env.add_resize_listener(resize_callback(&env, &state));
        let tick = frame_callback(&env, &state);

        let mut handle = Self {
            kind,
            env: Rc::clone(&env),
            state: Some(Rc::clone(&state)),
        };
        {
            let mut mounted = state.borrow_mut();
            mounted.listener = Some(listener);
            mounted.tick = Some(Rc::clone(&tick));
        }
        match env.request_frame(tick) {
            Ok(id) => state.borrow_mut().render_loop.pending = Some(id),
            Err(e) => {
                handle.dispose();
                return Err(e);
            }
        }

        log::info!(
            "mounted {kind} scene at {}x{} (seed {seed:#x})",
            viewport.width,
            viewport.height
        );
        Ok(handle)
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_none()
    }

    /// Whether a next frame is scheduled
    pub fn is_running(&self) -> bool {
        self.state.as_ref().is_some_and(|state| {
            let mounted = state.borrow();
            let running = mounted.render_loop.is_scheduled() && !mounted.render_loop.token().is_cancelled();
            running
        })
    }

    /// Frames rendered so far, or `None` once disposed
    pub fn frames_rendered(&self) -> Option<u64> {
        self.state.as_ref().map(|state| state.borrow().render_loop.frames())
    }

    /// Read-only access to the live scene
    pub fn with_scene<R>(&self, f: impl FnOnce(&dyn Scene) -> R) -> Option<R> {
        self.state.as_ref().map(|state| f(state.borrow().scene.as_ref()))
    }

    /// Read-only access to the live renderer
    pub fn with_renderer<R>(&self, f: impl FnOnce(&E::Renderer) -> R) -> Option<R> {
        self.state.as_ref().map(|state| f(&state.borrow().renderer))
    }

    /// Tear the scene down: cancel the pending frame, remove the resize
    /// listener, release GPU resources and the renderer, then detach the
    /// drawing surface. Calling it again does nothing.
    pub fn dispose(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        let mut mounted = state.borrow_mut();

        mounted.render_loop.token.cancel();
        if let Some(frame) = mounted.render_loop.pending.take() {
            self.env.cancel_frame(frame);
        }
        mounted.tick = None;

        if let Some(listener) = mounted.listener.take() {
            self.env.remove_resize_listener(listener);
        }

        let released = mounted.release_resources();

        if mounted.attached {
            self.env.detach_surface(&mounted.renderer);
            mounted.attached = false;
        }

        log::info!(
            "disposed {} scene after {} frames ({released} resources released)",
            self.kind,
            mounted.render_loop.frames()
        );
    }
}

impl<E: Environment + 'static> Drop for SceneHandle<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn resize_callback<E: Environment + 'static>(env: &Rc<E>, state: &Rc<RefCell<Mounted<E>>>) -> ResizeCallback {
    let env: Weak<E> = Rc::downgrade(env);
    let state = Rc::downgrade(state);
    Rc::new(move || {
        let (Some(env), Some(state)) = (env.upgrade(), state.upgrade()) else {
            return;
        };
        let viewport = env.container_size();
        if let Ok(mut mounted) = state.try_borrow_mut() {
            mounted.resize(viewport);
        };
    })
}

fn frame_callback<E: Environment + 'static>(env: &Rc<E>, state: &Rc<RefCell<Mounted<E>>>) -> FrameCallback {
    let token = state.borrow().render_loop.token.clone();
    let env: Weak<E> = Rc::downgrade(env);
    let state = Rc::downgrade(state);
    Rc::new(move |time| {
        if token.is_cancelled() {
            return;
        }
        let (Some(env), Some(state)) = (env.upgrade(), state.upgrade()) else {
            return;
        };
        if let Ok(mut mounted) = state.try_borrow_mut() {
            mounted.frame(&env, time);
        };
    })
}

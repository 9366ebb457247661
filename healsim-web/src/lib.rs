/// Healing Simulator Web - WebGL2 front end compiled to WASM
///
/// Builds the full-viewport container and the scene toolbar, then hands the
/// container to a [`SceneHost`] backed by the DOM.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use healsim_core::{SceneHost, SceneKind};
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};
use web_sys::{HtmlElement, PageTransitionEvent};

pub mod environment;
pub mod renderer;
pub mod shaders;
pub mod toolbar;

pub use environment::DomEnvironment;
pub use renderer::WebGlRenderer;
pub use toolbar::Toolbar;

const ROOT_STYLE: &[(&str, &str)] = &[("width", "100vw"), ("height", "100vh"), ("position", "relative")];
const CONTAINER_STYLE: &[(&str, &str)] = &[("width", "100%"), ("height", "100%"), ("overflow", "hidden")];

struct AppInner {
    host: RefCell<SceneHost<DomEnvironment>>,
    toolbar: RefCell<Option<Toolbar>>,
    /// Layout root we created ourselves and remove again on drop
    root: Option<HtmlElement>,
}

impl AppInner {
    fn select(&self, kind: SceneKind) -> Result<(), JsValue> {
        if let Some(toolbar) = self.toolbar.borrow().as_ref() {
            toolbar.set_active(Some(kind))?;
        }
        self.host
            .borrow_mut()
            .select(kind)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Drop for AppInner {
    fn drop(&mut self) {
        self.host.borrow_mut().unmount();
        if let Some(toolbar) = self.toolbar.borrow_mut().take() {
            toolbar.remove();
        }
        if let Some(root) = &self.root {
            if let Some(parent) = root.parent_node() {
                let _ = parent.remove_child(root);
            }
        }
    }
}

#[wasm_bindgen]
pub struct WebApp {
    inner: Rc<AppInner>,
}

#[wasm_bindgen]
impl WebApp {
    /// Mount into the element with `container_id`, or build a full-viewport
    /// layout on `<body>` when no id is given. Starts on the default scene.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: Option<String>) -> Result<WebApp, JsValue> {
        let window = web_sys::window().ok_or("no global window")?;
        let document = window.document().ok_or("window has no document")?;

        let (root, container) = match container_id {
            Some(id) => {
                let element = document
                    .get_element_by_id(&id)
                    .ok_or_else(|| JsValue::from_str(&format!("no element with id {id}")))?;
                let container = element.dyn_into::<HtmlElement>()?;
                (None, container)
            }
            None => {
                let body = document.body().ok_or("document has no body")?;
                let root = toolbar::create_div(&document)?;
                toolbar::apply_style(&root, ROOT_STYLE)?;
                let container = toolbar::create_div(&document)?;
                toolbar::apply_style(&container, CONTAINER_STYLE)?;
                root.append_child(&container)?;
                body.append_child(&root)?;
                (Some(root), container)
            }
        };

        let toolbar_parent = root.clone().unwrap_or_else(|| container.clone());
        let env = DomEnvironment::new(window, container).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let seed = js_sys::Math::random().to_bits();

        let inner = Rc::new(AppInner {
            host: RefCell::new(SceneHost::with_seed(Rc::new(env), seed)),
            toolbar: RefCell::new(None),
            root,
        });

        let weak: Weak<AppInner> = Rc::downgrade(&inner);
        let toolbar = Toolbar::new(&document, &toolbar_parent, move |kind| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = inner.select(kind) {
                log::error!("could not switch to {kind}: {e:?}");
            }
        })?;
        *inner.toolbar.borrow_mut() = Some(toolbar);

        let app = WebApp { inner };
        if let Err(e) = app.inner.select(SceneKind::default()) {
            log::error!("could not start {}: {e:?}", SceneKind::default());
        }
        Ok(app)
    }

    /// Switch scenes by name (`starlight`, `forest`, `ocean`)
    pub fn select(&self, name: &str) -> Result<(), JsValue> {
        let kind: SceneKind = name.parse().map_err(|e: healsim_core::SceneError| JsValue::from_str(&e.to_string()))?;
        self.inner.select(kind)
    }

    /// Name of the active scene, if one is mounted
    pub fn active(&self) -> Option<String> {
        self.inner.host.borrow().active().map(|kind| kind.name().to_string())
    }

    /// Remount the scene that was showing before `unmount`
    pub fn resume(&self) -> Result<(), JsValue> {
        let result = self.inner.host.borrow_mut().resume();
        if let Some(toolbar) = self.inner.toolbar.borrow().as_ref() {
            toolbar.set_active(self.inner.host.borrow().requested())?;
        }
        result.map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Dispose the active scene; the toolbar can mount another one later
    pub fn unmount(&self) {
        self.inner.host.borrow_mut().unmount();
        if let Some(toolbar) = self.inner.toolbar.borrow().as_ref() {
            let _ = toolbar.set_active(None);
        }
    }
}

thread_local! {
    static APP: RefCell<Option<WebApp>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("healing simulator starting");

    let app = WebApp::new(None)?;
    APP.with(|slot| *slot.borrow_mut() = Some(app));

    let window = web_sys::window().ok_or("no global window")?;

    // Tear the scene down when the page goes away
    let pagehide = Closure::wrap(Box::new(|| {
        APP.with(|slot| {
            if let Some(app) = slot.borrow().as_ref() {
                app.unmount();
            }
        });
    }) as Box<dyn FnMut()>);
    window.add_event_listener_with_callback("pagehide", pagehide.as_ref().unchecked_ref())?;
    pagehide.forget();

    // A page restored from the back/forward cache keeps its DOM but lost
    // its scene on pagehide
    let pageshow = Closure::wrap(Box::new(|event: PageTransitionEvent| {
        if !event.persisted() {
            return;
        }
        APP.with(|slot| {
            if let Some(app) = slot.borrow().as_ref() {
                if let Err(e) = app.resume() {
                    log::error!("could not restore scene: {e:?}");
                }
            }
        });
    }) as Box<dyn FnMut(PageTransitionEvent)>);
    window.add_event_listener_with_callback("pageshow", pageshow.as_ref().unchecked_ref())?;
    pageshow.forget();

    Ok(())
}

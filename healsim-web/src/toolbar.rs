/// Overlay toolbar with one button per scene
use healsim_core::SceneKind;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, HtmlElement};

const TOOLBAR_STYLE: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("top", "16px"),
    ("left", "16px"),
    ("display", "flex"),
    ("gap", "8px"),
    ("background", "rgba(0,0,0,0.35)"),
    ("padding", "8px 10px"),
    ("border-radius", "12px"),
    ("backdrop-filter", "blur(6px)"),
    ("z-index", "1"),
];

const BUTTON_STYLE: &[(&str, &str)] = &[
    ("border", "none"),
    ("padding", "8px 10px"),
    ("border-radius", "10px"),
    ("cursor", "pointer"),
    ("font-weight", "700"),
];

/// Foreground and background of a button
pub fn button_colors(active: bool) -> (&'static str, &'static str) {
    if active {
        ("#0b1d16", "#e9f1ff")
    } else {
        ("#e9f1ff", "transparent")
    }
}

pub(crate) fn apply_style(element: &HtmlElement, rules: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = element.style();
    for (property, value) in rules {
        style.set_property(property, value)?;
    }
    Ok(())
}

pub(crate) fn create_div(document: &Document) -> Result<HtmlElement, JsValue> {
    Ok(document.create_element("div")?.dyn_into::<HtmlElement>()?)
}

pub struct Toolbar {
    root: HtmlElement,
    buttons: Vec<(SceneKind, HtmlElement)>,
    _clicks: Vec<Closure<dyn FnMut()>>,
}

impl Toolbar {
    /// Build the toolbar inside `parent`; `on_select` runs on every click
    pub fn new<F>(document: &Document, parent: &HtmlElement, on_select: F) -> Result<Self, JsValue>
    where
        F: Fn(SceneKind) + Clone + 'static,
    {
        let root = create_div(document)?;
        apply_style(&root, TOOLBAR_STYLE)?;

        let mut buttons = Vec::with_capacity(SceneKind::ALL.len());
        let mut clicks = Vec::with_capacity(SceneKind::ALL.len());
        for kind in SceneKind::ALL {
            let button = document.create_element("button")?.dyn_into::<HtmlElement>()?;
            button.set_text_content(Some(kind.label()));
            button.set_attribute("data-scene", kind.name())?;
            apply_style(&button, BUTTON_STYLE)?;

            let on_select = on_select.clone();
            let click = Closure::wrap(Box::new(move || on_select(kind)) as Box<dyn FnMut()>);
            button.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;

            root.append_child(&button)?;
            buttons.push((kind, button));
            clicks.push(click);
        }
        parent.append_child(&root)?;

        Ok(Self {
            root,
            buttons,
            _clicks: clicks,
        })
    }

    /// Highlight the button for `selected`
    pub fn set_active(&self, selected: Option<SceneKind>) -> Result<(), JsValue> {
        for (kind, button) in &self.buttons {
            let (color, background) = button_colors(Some(*kind) == selected);
            apply_style(button, &[("color", color), ("background", background)])?;
        }
        Ok(())
    }

    pub fn remove(&self) {
        if let Some(parent) = self.root.parent_node() {
            let _ = parent.remove_child(&self.root);
        }
    }
}

//! Loading indicator shown while the avatar downloads.

/// Something that can show the loading progress to the user.
pub trait LoadingIndicator {
    fn set_text(&mut self, text: &str);
    fn hide(&mut self);
}

/// Writes into a page element and hides it when loading is done.
///
/// A missing element is reported once and otherwise ignored.
#[cfg(target_arch = "wasm32")]
pub struct DomIndicator {
    element: Option<web_sys::HtmlElement>,
}

#[cfg(target_arch = "wasm32")]
impl DomIndicator {
    pub fn new(element_id: &str) -> Self {
        use wasm_bindgen::JsCast;

        let element = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(element_id))
            .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok());
        if element.is_none() {
            log::warn!("Loading element #{} not found, progress is only logged", element_id);
        }
        Self { element }
    }
}

#[cfg(target_arch = "wasm32")]
impl LoadingIndicator for DomIndicator {
    fn set_text(&mut self, text: &str) {
        if let Some(element) = &self.element {
            element.set_inner_text(text);
        }
    }

    fn hide(&mut self) {
        if let Some(element) = &self.element {
            if let Err(err) = element.style().set_property("display", "none") {
                log::warn!("Could not hide the loading element: {:?}", err);
            }
        }
    }
}

/// Shows the progress in the window title.
#[cfg(not(target_arch = "wasm32"))]
pub struct WindowTitleIndicator {
    window: std::sync::Arc<winit::window::Window>,
    title: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl WindowTitleIndicator {
    pub fn new(window: std::sync::Arc<winit::window::Window>, title: impl Into<String>) -> Self {
        Self {
            window,
            title: title.into(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl LoadingIndicator for WindowTitleIndicator {
    fn set_text(&mut self, text: &str) {
        self.window.set_title(&format!("{} - {}", self.title, text));
    }

    fn hide(&mut self) {
        self.window.set_title(&self.title);
    }
}

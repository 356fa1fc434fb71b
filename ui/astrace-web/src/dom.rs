//! DOM element bindings.
//!
//! The page markup is static; this module only resolves the elements the
//! session logic drives. All fields are resolved once at startup.

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement};

// ── Helpers ──

fn doc() -> Option<Document> {
    web_sys::window()?.document()
}

pub fn by_id(id: &str) -> Option<Element> {
    doc()?.get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn get_input_value(el: &HtmlInputElement) -> String {
    el.value().trim().to_string()
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn set_hidden(el: &Element, hidden: bool) {
    toggle_class(el, "hidden", hidden);
}

// ── Elements struct ──

/// Clone-friendly: every field is a JS handle.
#[derive(Clone)]
pub struct Elements {
    // Views
    pub home_view: Element,
    pub form_view: Element,

    // Header
    pub wallet_button: HtmlButtonElement,

    // Landing
    pub home_cta: HtmlButtonElement,

    // Birth form
    pub back_button: HtmlButtonElement,
    pub birth_place: HtmlInputElement,
    pub birth_coords: HtmlInputElement,
    pub birth_date: HtmlInputElement,
    pub birth_time: HtmlInputElement,
    pub mint_button: HtmlButtonElement,
    pub mint_price: HtmlElement,

    pub notice: HtmlElement,
}

macro_rules! get_el {
    ($id:expr) => {
        by_id($id).ok_or_else(|| JsValue::from_str(&format!("missing element #{}", $id)))?
    };
}

macro_rules! get_input {
    ($id:expr) => {
        by_id_typed::<HtmlInputElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing input #{}", $id)))?
    };
}

macro_rules! get_button {
    ($id:expr) => {
        by_id_typed::<HtmlButtonElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing button #{}", $id)))?
    };
}

macro_rules! get_html {
    ($id:expr) => {
        by_id_typed::<HtmlElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing html element #{}", $id)))?
    };
}

impl Elements {
    /// Resolve all DOM references. Call once after DOMContentLoaded.
    pub fn bind() -> Result<Elements, JsValue> {
        Ok(Elements {
            home_view: get_el!("homeView"),
            form_view: get_el!("formView"),

            wallet_button: get_button!("walletButton"),

            home_cta: get_button!("homeCta"),

            back_button: get_button!("backButton"),
            birth_place: get_input!("birthPlace"),
            birth_coords: get_input!("birthCoords"),
            birth_date: get_input!("birthDate"),
            birth_time: get_input!("birthTime"),
            mint_button: get_button!("mintButton"),
            mint_price: get_html!("mintPrice"),

            notice: get_html!("notice"),
        })
    }
}

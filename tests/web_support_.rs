#![cfg(target_arch = "wasm32")]

static mut LOG_INITIALIZED: bool = false;

pub fn init_tracing() {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
}

/// A fresh container element appended to the document body.
pub fn container() -> web_sys::Element {
	let document = web_sys::window().unwrap().document().unwrap();
	let container = document.create_element("div").unwrap();
	document.body().unwrap().append_child(container.as_ref()).unwrap();
	container
}

/// The element children of `parent`, in document order.
pub fn element_children(parent: &web_sys::Element) -> Vec<web_sys::Element> {
	let child_nodes = parent.child_nodes();
	let mut elements = Vec::new();
	for i in 0..child_nodes.length() {
		if let Some(node) = child_nodes.item(i) {
			if let Ok(element) = wasm_bindgen::JsCast::dyn_into::<web_sys::Element>(node) {
				elements.push(element);
			}
		}
	}
	elements
}

/// The comment children of `parent`, in document order.
pub fn comment_children(parent: &web_sys::Element) -> Vec<web_sys::Comment> {
	let child_nodes = parent.child_nodes();
	let mut comments = Vec::new();
	for i in 0..child_nodes.length() {
		if let Some(node) = child_nodes.item(i) {
			if let Ok(comment) = wasm_bindgen::JsCast::dyn_into::<web_sys::Comment>(node) {
				comments.push(comment);
			}
		}
	}
	comments
}

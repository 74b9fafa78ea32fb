#![cfg(target_arch = "wasm32")]

use opdom::{DomHost, EventContext, Module, Opcode, PropValue, Rendered, SharedModule};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

mod web_support_;
use web_support_::{container, init_tracing};

struct Clicker {
	count: Rc<Cell<i32>>,
	alt: Rc<Cell<bool>>,
}
impl Module for Clicker {
	fn render(&mut self, _: &mut opdom::Imports<'_, '_>, _: &[PropValue]) -> opdom::Result<Rendered> {
		let handler = if self.alt.get() { "add_hundred" } else { "add_one" };
		Ok(Rendered::Opcodes(vec![
			Opcode::Open("button".to_string()),
			Opcode::Event("click".to_string(), handler.to_string()),
			Opcode::Slot(self.count.get().to_string()),
			Opcode::Close,
		]))
	}

	fn handle_event(&mut self, handler: &str, _: &EventContext<'_>) {
		match handler {
			"add_one" => self.count.set(self.count.get() + 1),
			"add_hundred" => self.count.set(self.count.get() + 100),
			_ => {}
		}
	}
}

struct Echo {
	last: Rc<RefCell<String>>,
	bytes: Rc<RefCell<Vec<u8>>>,
	missing: Rc<RefCell<Option<String>>>,
}
impl Module for Echo {
	fn render(&mut self, _: &mut opdom::Imports<'_, '_>, _: &[PropValue]) -> opdom::Result<Rendered> {
		Ok(Rendered::Opcodes(vec![
			Opcode::Open("input".to_string()),
			Opcode::Event("input".to_string(), "on_input".to_string()),
			Opcode::Close,
		]))
	}

	fn handle_event(&mut self, handler: &str, event: &EventContext<'_>) {
		if handler == "on_input" {
			*self.last.borrow_mut() = event.query("target.value");
			let mut buffer = [0u8; 16];
			let written = event.target_value(&mut buffer);
			*self.bytes.borrow_mut() = buffer[..written].to_vec();
			*self.missing.borrow_mut() = Some(event.query("no.such.path"));
		}
	}
}

#[wasm_bindgen_test]
fn click_invokes_the_handler_and_rerenders() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let count = Rc::new(Cell::new(0));
	let module: SharedModule = Rc::new(RefCell::new(Clicker { count: count.clone(), alt: Rc::new(Cell::new(false)) }));

	host.render(&module).unwrap();
	assert_eq!(container.inner_html(), "<button>0</button>");
	assert_eq!(host.listener_count(), 1);

	let button: web_sys::HtmlElement = container.first_element_child().unwrap().dyn_into().unwrap();
	button.click();

	assert_eq!(count.get(), 1);
	// The re-render after the handler is unconditional.
	assert_eq!(container.inner_html(), "<button>1</button>");
	assert_eq!(host.listener_count(), 1);
}

#[wasm_bindgen_test]
fn rebinding_keeps_the_same_native_listener() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let count = Rc::new(Cell::new(0));
	let alt = Rc::new(Cell::new(false));
	let module: SharedModule = Rc::new(RefCell::new(Clicker { count: count.clone(), alt: alt.clone() }));

	host.render(&module).unwrap();
	let button: web_sys::HtmlElement = container.first_element_child().unwrap().dyn_into().unwrap();

	button.click();
	assert_eq!(count.get(), 1);
	assert_eq!(host.listener_count(), 1);

	// Re-render with a different logical handler on the same (element, event type).
	alt.set(true);
	host.render(&module).unwrap();
	assert_eq!(host.listener_count(), 1);
	assert!(container.first_element_child().unwrap().is_same_node(Some(button.as_ref())));

	button.click();
	assert_eq!(count.get(), 101);
	assert_eq!(host.listener_count(), 1);
}

#[wasm_bindgen_test]
fn the_event_channel_is_readable_during_dispatch() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let last = Rc::new(RefCell::new(String::new()));
	let bytes = Rc::new(RefCell::new(Vec::new()));
	let missing = Rc::new(RefCell::new(None));
	let module: SharedModule = Rc::new(RefCell::new(Echo {
		last: last.clone(),
		bytes: bytes.clone(),
		missing: missing.clone(),
	}));

	host.render(&module).unwrap();
	let input: web_sys::HtmlInputElement = container.first_element_child().unwrap().dyn_into().unwrap();
	input.set_value("hello");

	let event = web_sys::Event::new("input").unwrap();
	assert!(input.dispatch_event(&event).unwrap());

	assert_eq!(*last.borrow(), "hello");
	assert_eq!(*bytes.borrow(), b"hello");
	// A null or undefined step inside a dispatch window degrades to the empty string.
	assert_eq!(missing.borrow().as_deref(), Some(""));
}

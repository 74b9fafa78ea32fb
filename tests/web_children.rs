#![cfg(target_arch = "wasm32")]

use opdom::{DomHost, Module, Opcode, PropValue, Rendered, SharedModule};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

mod web_support_;
use web_support_::{container, init_tracing};

struct Parent {
	child_name: &'static str,
}
impl Module for Parent {
	fn render(&mut self, _: &mut opdom::Imports<'_, '_>, _: &[PropValue]) -> opdom::Result<Rendered> {
		Ok(Rendered::Opcodes(vec![
			Opcode::Open("div".to_string()),
			Opcode::Attr("class".to_string(), "parent".to_string()),
			Opcode::Child(self.child_name.to_string()),
			Opcode::Prop(PropValue::I32(5)),
			Opcode::Prop(PropValue::Str("left".to_string())),
			Opcode::Text("after".to_string()),
			Opcode::Close,
		]))
	}
}

struct Greeting {
	received: Rc<RefCell<Vec<PropValue>>>,
}
impl Module for Greeting {
	fn render(&mut self, _: &mut opdom::Imports<'_, '_>, props: &[PropValue]) -> opdom::Result<Rendered> {
		*self.received.borrow_mut() = props.to_vec();
		Ok(Rendered::Opcodes(vec![
			Opcode::Open("span".to_string()),
			Opcode::Slot(format!("props:{}", props.len())),
			Opcode::Close,
		]))
	}
}

/// A child speaking the flat buffer protocol; it splices inline, without a mount element.
struct InlineChild {
	memory: Vec<u8>,
	ptr: u32,
}
impl InlineChild {
	fn new() -> Self {
		let mut memory = Vec::new();
		let span = (memory.len() as u32, "span".len() as u32);
		memory.extend_from_slice(b"span");
		let inline = (memory.len() as u32, "inline".len() as u32);
		memory.extend_from_slice(b"inline");
		while memory.len() % 4 != 0 {
			memory.push(0);
		}
		let ptr = memory.len() as u32;
		for word in [1, span.0, span.1, 5, inline.0, inline.1, 2, 0] {
			memory.extend_from_slice(&word.to_le_bytes());
		}
		Self { memory, ptr }
	}
}
impl Module for InlineChild {
	fn render(&mut self, _: &mut opdom::Imports<'_, '_>, _: &[PropValue]) -> opdom::Result<Rendered> {
		Ok(Rendered::Buffer(self.ptr))
	}

	fn memory(&self) -> &[u8] {
		&self.memory
	}
}

#[wasm_bindgen_test]
fn mounts_a_typed_child_with_props() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let received = Rc::new(RefCell::new(Vec::new()));
	let parent: SharedModule = Rc::new(RefCell::new(Parent { child_name: "greeting" }));
	let child: SharedModule = Rc::new(RefCell::new(Greeting { received: received.clone() }));

	host.render_with_children(&parent, vec![("greeting".to_string(), child)]).unwrap();

	assert_eq!(
		container.inner_html(),
		"<div class=\"parent\"><greeting><span>props:2</span></greeting>after</div>",
	);
	assert_eq!(
		*received.borrow(),
		[PropValue::I32(5), PropValue::Str("left".to_string())],
	);

	// Re-rendering re-uses the mount point and the child instance.
	let div = container.first_element_child().unwrap();
	let mount = div.first_element_child().unwrap();
	host.render(&parent).unwrap();
	assert!(div.first_element_child().unwrap().is_same_node(Some(mount.as_ref())));
}

#[wasm_bindgen_test]
fn an_unregistered_child_renders_nothing() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let parent: SharedModule = Rc::new(RefCell::new(Parent { child_name: "ghost" }));

	host.render(&parent).unwrap();
	assert_eq!(container.inner_html(), "<div class=\"parent\">after</div>");
}

#[wasm_bindgen_test]
fn a_buffer_child_splices_inline() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let parent: SharedModule = Rc::new(RefCell::new(Parent { child_name: "inline" }));
	let child: SharedModule = Rc::new(RefCell::new(InlineChild::new()));

	host.render_with_children(&parent, vec![("inline".to_string(), child)]).unwrap();
	assert_eq!(
		container.inner_html(),
		"<div class=\"parent\"><span>inline</span>after</div>",
	);

	let div = container.first_element_child().unwrap();
	let span = div.first_element_child().unwrap();
	host.render(&parent).unwrap();
	assert!(div.first_element_child().unwrap().is_same_node(Some(span.as_ref())));
}

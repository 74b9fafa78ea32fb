#![cfg(target_arch = "wasm32")]

use opdom::{DomHost, Imports, Module, PropValue, Rendered, SharedModule};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

mod web_support_;
use web_support_::{container, init_tracing};

struct CounterView {
	count: Rc<Cell<i32>>,
}
impl Module for CounterView {
	fn render(&mut self, imports: &mut Imports<'_, '_>, _: &[PropValue]) -> opdom::Result<Rendered> {
		imports.open_element("div")?;
		imports.attribute("class", "c")?;
		imports.text(&format!("n={}", self.count.get()))?;
		imports.close_element()?;
		Ok(Rendered::Imports)
	}
}

struct Repeater {
	count: Rc<Cell<u32>>,
}
impl Module for Repeater {
	fn render(&mut self, imports: &mut Imports<'_, '_>, _: &[PropValue]) -> opdom::Result<Rendered> {
		for _ in 0..self.count.get() {
			imports.open_element("p")?;
			imports.text("x")?;
			imports.close_element()?;
		}
		Ok(Rendered::Imports)
	}
}

#[wasm_bindgen_test]
fn patches_only_the_text_node() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let count = Rc::new(Cell::new(0));
	let module: SharedModule = Rc::new(RefCell::new(CounterView { count: count.clone() }));

	host.render(&module).unwrap();
	assert_eq!(container.inner_html(), "<div class=\"c\">n=0</div>");

	let div = container.first_element_child().unwrap();
	let text = div.first_child().unwrap();

	count.set(1);
	host.render(&module).unwrap();
	assert_eq!(container.inner_html(), "<div class=\"c\">n=1</div>");
	assert!(container.first_element_child().unwrap().is_same_node(Some(div.as_ref())));
	assert!(div.first_child().unwrap().is_same_node(Some(&text)));
}

#[wasm_bindgen_test]
fn an_unchanged_description_is_idempotent() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let module: SharedModule = Rc::new(RefCell::new(CounterView { count: Rc::new(Cell::new(7)) }));

	host.render(&module).unwrap();
	let div = container.first_element_child().unwrap();
	let text = div.first_child().unwrap();

	host.render(&module).unwrap();
	assert_eq!(container.inner_html(), "<div class=\"c\">n=7</div>");
	assert!(container.first_element_child().unwrap().is_same_node(Some(div.as_ref())));
	assert!(div.first_child().unwrap().is_same_node(Some(&text)));
}

#[wasm_bindgen_test]
fn shrinking_trims_trailing_children() {
	init_tracing();
	let container = container();
	let host = DomHost::new_for_element(container.clone());
	let count = Rc::new(Cell::new(3));
	let module: SharedModule = Rc::new(RefCell::new(Repeater { count: count.clone() }));

	host.render(&module).unwrap();
	assert_eq!(container.child_nodes().length(), 3);
	let first = container.first_element_child().unwrap();

	count.set(1);
	host.render(&module).unwrap();
	assert_eq!(container.child_nodes().length(), 1);
	assert!(container.first_element_child().unwrap().is_same_node(Some(first.as_ref())));
}

//! The event bridge.
//!
//! At most one native listener exists per (element, event type) pair, no matter how many
//! renders occur. Each listener reads the *current* handler name out of a mutable cell at
//! fire time, so a later render can rebind which logical handler fires without touching
//! the DOM listener. Event data is handed to the module through [`EventContext`], a read
//! channel that only exists for the duration of one dispatch.

use crate::{
	host::HostInner,
	module::SharedModule,
};
use hashbrown::HashMap;
use js_sys::Reflect;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// The expando property that keys an element into the listener table.
const ELEMENT_ID_PROP: &str = "__opdomId";

pub(crate) type ListenerKey = (u64, String);

struct ListenerEntry {
	cell: Rc<RefCell<String>>,
	// Dropping this invalidates the JS function; entries are only removed once their
	// element has left the document (or the whole host is dropped; see `DomHost` docs).
	_closure: Closure<dyn FnMut(web_sys::Event)>,
}

#[derive(Default)]
pub(crate) struct ListenerMap {
	entries: HashMap<ListenerKey, ListenerEntry>,
	next_element_id: u64,
}
impl ListenerMap {
	/// Identity key for `element`, stamped onto it as a numeric expando on first use.
	fn element_id(&mut self, element: &web_sys::Element) -> u64 {
		let key = JsValue::from_str(ELEMENT_ID_PROP);
		if let Some(id) = Reflect::get(element.as_ref(), &key).ok().and_then(|id| id.as_f64()) {
			return id as u64;
		}
		let id = self.next_element_id;
		self.next_element_id += 1;
		if let Err(error) = Reflect::set(element.as_ref(), &key, &JsValue::from_f64(id as f64)) {
			error!("Failed to stamp listener id onto element: {:?}", error);
		}
		id
	}

	/// Ensures a native listener for (`element`, `kind`) and points its handler cell at
	/// `handler`. Re-binding an existing pair only updates the cell.
	pub fn bind(
		&mut self,
		host: &Weak<RefCell<HostInner>>,
		owner: &SharedModule,
		root: &SharedModule,
		element: &web_sys::Element,
		kind: &str,
		handler: &str,
	) -> (Rc<RefCell<String>>, ListenerKey) {
		let key = (self.element_id(element), kind.to_owned());
		if let Some(entry) = self.entries.get(&key) {
			if *entry.cell.borrow() != handler {
				trace!("Rebinding {:?} listener to handler {:?}.", kind, handler);
				*entry.cell.borrow_mut() = handler.to_owned();
			}
			return (entry.cell.clone(), key);
		}

		let cell = Rc::new(RefCell::new(handler.to_owned()));
		let closure = {
			let host = host.clone();
			let owner = owner.clone();
			let root = root.clone();
			let cell = cell.clone();
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let host = match host.upgrade() {
					Some(host) => host,
					None => return error!("Listener fired after its host was dropped. Ignoring."),
				};
				crate::host::dispatch(&host, &owner, &root, &cell, event);
			}) as Box<dyn FnMut(web_sys::Event)>)
		};
		if let Err(error) = element.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref()) {
			error!("Failed to add {:?} listener: {:?}", kind, error);
		}
		trace!("Created listener.");
		self.entries.insert(key.clone(), ListenerEntry { cell: cell.clone(), _closure: closure });
		(cell, key)
	}

	/// Drops the entries for `keys`. Call once their elements have left the document.
	pub fn release(&mut self, keys: &[ListenerKey]) {
		for key in keys {
			if self.entries.remove(key).is_some() {
				trace!("Destroyed listener.");
			}
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

/// The narrow event read channel handed to [`Module::handle_event`](crate::Module::handle_event).
///
/// It borrows the triggering event for exactly one synchronous dispatch; no event data is
/// retained after the handler returns.
#[derive(Debug)]
pub struct EventContext<'a> {
	event: &'a web_sys::Event,
}
impl<'a> EventContext<'a> {
	pub(crate) fn new(event: &'a web_sys::Event) -> Self {
		Self { event }
	}

	/// Walks a dotted property path (`"key"`, `"target.value"`, `"target.dataset.id"`)
	/// over the triggering event and stringifies the result. A null or undefined step
	/// yields the empty string.
	#[must_use]
	pub fn query(&self, path: &str) -> String {
		let mut value: JsValue = self.event.clone().into();
		for key in path.split('.') {
			if value.is_null() || value.is_undefined() {
				return String::new();
			}
			value = match Reflect::get(&value, &JsValue::from_str(key)) {
				Ok(value) => value,
				Err(_) => return String::new(),
			};
		}
		stringify(&value)
	}

	/// Encodes `target.value` into `out` (clamped) and returns the written byte count.
	/// This is the write-back channel a wasm-side module reads its input field through.
	#[must_use]
	pub fn target_value(&self, out: &mut [u8]) -> usize {
		crate::memory::encode_into(&self.query("target.value"), out)
	}

	/// The raw event, for modules that need more than the string channel.
	#[must_use]
	pub fn raw(&self) -> &web_sys::Event {
		self.event
	}
}

fn stringify(value: &JsValue) -> String {
	if value.is_null() || value.is_undefined() {
		String::new()
	} else if let Some(value) = value.as_string() {
		value
	} else if let Some(value) = value.as_f64() {
		if value.fract() == 0.0 && value.is_finite() && value.abs() <= 9_007_199_254_740_992.0 {
			format!("{}", value as i64)
		} else {
			value.to_string()
		}
	} else if let Some(value) = value.as_bool() {
		value.to_string()
	} else {
		String::new()
	}
}

//! Group bookkeeping for `begin(key)`…`end` brackets: variable-length runs of repeated
//! structure, reconciled by count and emission order rather than by tree diffing.
//!
//! A group owns a trailing sentinel comment; every instance is bounded by its own start
//! and end marker comments and owns the DOM between them. Instance order always equals
//! document order, and trimming always removes from the tail.

use crate::events::ListenerKey;
use std::{cell::RefCell, rc::Rc};
use tracing::error;

/// One dynamic position recorded inside an instance (or inside a mount's root region).
#[derive(Debug)]
pub(crate) enum Part {
	/// A `slot` text node, patched by content comparison.
	Slot(web_sys::Text),
	/// An `attr-slot` target, patched by attribute-value comparison.
	AttrSlot { element: web_sys::Element, name: String },
}

/// One `begin`…`end` repetition: markers, recorded parts, and listener bookkeeping.
#[derive(Debug)]
pub(crate) struct GroupInstance {
	pub start: web_sys::Comment,
	pub end: web_sys::Comment,
	pub parts: Vec<Part>,
	/// Handler cells of listeners bound inside this instance, in emission order, so a
	/// patch pass can rebind without walking structure.
	pub cells: Vec<Rc<RefCell<String>>>,
	pub listener_keys: Vec<ListenerKey>,
	/// Top-level node count between the markers, markers included. Lets the enclosing
	/// cursor step over the whole bracket.
	pub span: u32,
}
impl GroupInstance {
	/// Removes this instance's DOM span, start and end markers included. Tolerates spans
	/// that sibling reconciliation already detached.
	pub fn remove_span(&self) {
		let end: web_sys::Node = self.end.clone().into();
		let mut current: web_sys::Node = self.start.clone().into();
		loop {
			let next = current.next_sibling();
			if let Some(parent) = current.parent_node() {
				if let Err(error) = parent.remove_child(&current) {
					error!("Failed to remove group instance node: {:?}", error);
				}
			}
			if current.is_same_node(Some(&end)) {
				return;
			}
			match next {
				Some(next) => current = next,
				None => {
					// The span was torn apart externally; drop the end marker on its own.
					if let Some(parent) = end.parent_node() {
						if let Err(error) = parent.remove_child(&end) {
							error!("Failed to remove group end marker: {:?}", error);
						}
					}
					return;
				}
			}
		}
	}
}

/// The reconciliation unit for one group key.
#[derive(Debug)]
pub(crate) struct Group {
	pub sentinel: web_sys::Comment,
	pub instances: Vec<GroupInstance>,
}
impl Group {
	/// Total top-level node count the group occupies in its parent, sentinel included.
	pub fn span(&self) -> u32 {
		self.instances.iter().map(|instance| instance.span).sum::<u32>() + 1
	}

	/// Drops every instance from `keep` onward, removing its DOM span, and returns the
	/// released listener keys for the caller to free.
	pub fn trim_to(&mut self, keep: usize) -> Vec<ListenerKey> {
		let mut released = Vec::new();
		while self.instances.len() > keep {
			if let Some(instance) = self.instances.pop() {
				instance.remove_span();
				released.extend(instance.listener_keys);
			}
		}
		released
	}

	/// Removes the whole group from the document: every instance span plus the sentinel.
	pub fn remove(mut self) -> Vec<ListenerKey> {
		let released = self.trim_to(0);
		if let Some(parent) = self.sentinel.parent_node() {
			if let Err(error) = parent.remove_child(self.sentinel.as_ref()) {
				error!("Failed to remove group sentinel: {:?}", error);
			}
		}
		released
	}
}

//! The host → module surface: what a mounted UI module must expose.

use crate::{error::Result, events::EventContext, interpret::Imports, opcode::{Opcode, PropValue}};
use std::{cell::RefCell, rc::Rc};

/// How a module handed its current description back from [`Module::render`].
#[derive(Debug)]
pub enum Rendered {
	/// The UI was described through [`Imports`] calls during the `render` call itself
	/// (the incremental and template protocols). Nothing further to interpret.
	Imports,
	/// A byte offset into the module's [linear memory](Module::memory) holding a flat,
	/// zero-terminated opcode buffer (see [`crate::opcode`] for the word layout).
	Buffer(u32),
	/// The typed opcode sequence.
	Opcodes(Vec<Opcode>),
}

/// A UI module. The host calls [`init`](Self::init) once before the first render of a
/// mount, then [`render`](Self::render) on every cycle; bound events call back into
/// [`handle_event`](Self::handle_event) and trigger the next cycle automatically.
///
/// `render` must be safe to call any number of times. For the template and typed
/// protocols it must reproduce the identical structural shape on every call, except
/// inside `begin`/`end` brackets and `child` mounts, which reconcile on their own.
pub trait Module {
	/// One-time setup. Template recording belongs here.
	fn init(&mut self, imports: &mut Imports<'_, '_>) -> Result<()> {
		let _ = imports;
		Ok(())
	}

	/// Produces the module's current UI description. `props` is the ordered argument
	/// list collected from `prop` opcodes when this module is mounted as a child, and
	/// empty for root mounts.
	fn render(&mut self, imports: &mut Imports<'_, '_>, props: &[PropValue]) -> Result<Rendered>;

	/// Invoked when a bound event fires, with the named logical handler and the
	/// dispatch-scoped event read channel. The host re-renders unconditionally after
	/// this returns.
	fn handle_event(&mut self, handler: &str, event: &EventContext<'_>) {
		let _ = (handler, event);
	}

	/// The module's linear memory, read when [`Rendered::Buffer`] references it and by
	/// `update_template`. Modules that only use the typed or import protocols keep the
	/// default.
	fn memory(&self) -> &[u8] {
		&[]
	}
}

/// Modules are shared between the host's side tables and its listener closures.
pub type SharedModule = Rc<RefCell<dyn Module>>;

//! The opcode interpreter.
//!
//! One [`RenderFrame`] exists per render call of one component; it holds every cursor
//! (traversal stack, part cursor, group instance cursor) and is discarded when the call
//! ends. Only the document and the host's side tables persist between calls.
//!
//! All four render strategies meet here: host-import calls are pushed in one opcode at a
//! time through [`Imports`], while typed sequences and flat buffers are pulled through
//! the decoder front-ends in `host`. Interpretation itself is written once, over
//! [`Op`](crate::opcode::Op).

use crate::{
	error::{Error, Result},
	events::ListenerKey,
	groups::{Group, GroupInstance, Part},
	host::{ChildRegistration, ComponentScope, HostInner},
	memory::MemoryReader,
	module::{Rendered, SharedModule},
	opcode::{BufferDecoder, Op, PropValue},
	templates::TemplateInstruction,
};
use hashbrown::HashSet;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, trace, trace_span, warn};
use wasm_bindgen::{throw_str, JsCast};

struct Level {
	parent: web_sys::Element,
	element: Option<web_sys::Element>,
	index: u32,
}

struct PendingChild {
	name: String,
	props: Vec<PropValue>,
}

struct UpdateCursor {
	id: u32,
	index: usize,
}

/// State while between `begin` and `end`, or between an `end` and a possible further
/// `begin` for the same key (`Idle`).
struct Bracket {
	key: String,
	group: Group,
	visited: usize,
	state: BracketState,
}
enum BracketState {
	Idle,
	Build(InstanceBuilder),
	Patch(InstancePatcher),
}

struct InstanceBuilder {
	start: web_sys::Comment,
	parts: Vec<Part>,
	cells: Vec<Rc<RefCell<String>>>,
	listener_keys: Vec<ListenerKey>,
	parent: web_sys::Element,
	element: Option<web_sys::Element>,
	stack: Vec<(web_sys::Element, Option<web_sys::Element>)>,
	/// Top-level nodes so far, start marker included.
	span: u32,
}

struct InstancePatcher {
	part_cursor: usize,
	cell_cursor: usize,
	depth: usize,
}

pub(crate) struct RenderFrame<'h> {
	pub(crate) inner: &'h mut HostInner,
	scope: &'h mut ComponentScope,
	owner: SharedModule,
	root: SharedModule,
	parent: web_sys::Element,
	element: Option<web_sys::Element>,
	index: u32,
	stack: Vec<Level>,
	part_cursor: usize,
	bracket: Option<Bracket>,
	visited_groups: HashSet<String>,
	pending_child: Option<PendingChild>,
	update_target: Option<UpdateCursor>,
}
impl<'h> RenderFrame<'h> {
	pub fn new(inner: &'h mut HostInner, scope: &'h mut ComponentScope, owner: SharedModule, root: SharedModule) -> Self {
		let parent = inner.container.clone();
		Self {
			inner,
			scope,
			owner,
			root,
			parent,
			element: None,
			index: 0,
			stack: Vec::new(),
			part_cursor: 0,
			bracket: None,
			visited_groups: HashSet::new(),
			pending_child: None,
			update_target: None,
		}
	}

	fn child_frame<'b>(&'b mut self, registration: &'b mut ChildRegistration, parent: web_sys::Element, index: u32) -> RenderFrame<'b> {
		RenderFrame {
			inner: &mut *self.inner,
			scope: &mut registration.scope,
			owner: registration.module.clone(),
			root: self.root.clone(),
			parent,
			element: None,
			index,
			stack: Vec::new(),
			part_cursor: 0,
			bracket: None,
			visited_groups: HashSet::new(),
			pending_child: None,
			update_target: None,
		}
	}

	/// Applies one opcode. Instruction order is authoritative; see the failure policy on
	/// [`Error`] for what happens when a module's shape drifts between renders.
	pub fn apply(&mut self, op: Op<'_>) -> Result<()> {
		// A pending child mount absorbs its `prop` arguments; any other opcode seals the
		// argument list and resolves the child first.
		if self.pending_child.is_some() {
			if let Op::Prop(value) = op {
				if let Some(pending) = self.pending_child.as_mut() {
					pending.props.push(value);
				}
				return Ok(());
			}
			self.flush_child()?;
		}

		if self.bracket.is_some() {
			return self.bracket_op(op);
		}

		match op {
			Op::Open(tag) => self.open_element(tag),
			Op::Close => self.close_element(),
			Op::Attr { name, value } => self.set_attribute(name, value),
			Op::Text(content) => self.write_text(content),
			Op::Slot(content) => self.write_slot(content),
			Op::AttrSlot { name, value } => self.write_attr_slot(name, value),
			Op::Event { kind, handler } => self.bind_event(kind, handler),
			Op::Child(name) => {
				self.pending_child = Some(PendingChild { name: name.to_owned(), props: Vec::new() });
				Ok(())
			}
			Op::Prop(_) => Err(Error::PropOutsideChild),
			Op::Begin(key) => self.open_bracket(key),
			Op::End => Err(Error::EndWithoutBegin),
		}
	}

	/// Ends the render pass: resolves any trailing child or bracket, verifies the
	/// traversal closed out, and drops groups the pass no longer emitted.
	pub fn finish(&mut self) -> Result<()> {
		self.flush_child()?;
		self.finalize_bracket()?;
		if self.update_target.take().is_some() {
			warn!("Render ended inside an `update` without `commit`.");
		}
		if !self.stack.is_empty() {
			return Err(Error::UnclosedElements(self.stack.len()));
		}

		let stale: Vec<String> = self
			.scope
			.groups
			.keys()
			.filter(|key| !self.visited_groups.contains(*key))
			.cloned()
			.collect();
		for key in stale {
			if let Some(group) = self.scope.groups.remove(&key) {
				trace!("Group {:?} is no longer emitted. Removing it.", key);
				let released = group.remove();
				self.inner.listeners.release(&released);
			}
		}

		self.scope.built = true;
		Ok(())
	}

	/// Removes container children past the cursor. Only the incremental protocol closes
	/// out the root level this way; template DOM lives past the cursor and must survive.
	pub fn trim_trailing(&mut self) {
		if !self.inner.templates.is_empty() {
			return;
		}
		while self.parent.child_nodes().length() > self.index {
			match self.parent.last_child() {
				Some(child) => {
					if let Err(error) = self.parent.remove_child(&child) {
						error!("Failed to remove trailing node: {:?}", error);
						return;
					}
				}
				None => return,
			}
		}
	}

	// --- Root-region structure ---

	fn open_element(&mut self, tag: &str) -> Result<()> {
		let existing = self.parent.child_nodes().item(self.index);
		let element = match existing.as_ref().and_then(|node| node.dyn_ref::<web_sys::Element>()) {
			Some(element) if element.tag_name().eq_ignore_ascii_case(tag) => element.clone(),
			_ => {
				let element = create_element(&self.inner.document, tag);
				let inserted = match &existing {
					Some(existing) => self.parent.replace_child(element.as_ref(), existing),
					None => self.parent.append_child(element.as_ref()),
				};
				if let Err(error) = inserted {
					error!("Failed to insert <{}>: {:?}", tag, error);
				}
				element
			}
		};
		self.stack.push(Level {
			parent: self.parent.clone(),
			element: self.element.take(),
			index: self.index,
		});
		self.parent = element.clone();
		self.element = Some(element);
		self.index = 0;
		Ok(())
	}

	fn close_element(&mut self) -> Result<()> {
		let level = self.stack.pop().ok_or(Error::CloseWithoutOpen)?;
		// Surplus trailing children mean the subtree shrank.
		while self.parent.child_nodes().length() > self.index {
			match self.parent.last_child() {
				Some(child) => {
					if let Err(error) = self.parent.remove_child(&child) {
						error!("Failed to remove surplus node: {:?}", error);
						break;
					}
				}
				None => break,
			}
		}
		self.parent = level.parent;
		self.element = level.element;
		self.index = level.index + 1;
		Ok(())
	}

	fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
		let element = self.element.as_ref().ok_or(Error::AttrOutsideElement)?;
		if let Err(error) = element.set_attribute(name, value) {
			error!("Failed to set attribute {:?}: {:?}", name, error);
		}
		Ok(())
	}

	fn write_text(&mut self, content: &str) -> Result<()> {
		let existing = self.parent.child_nodes().item(self.index);
		match existing.as_ref().and_then(|node| node.dyn_ref::<web_sys::Text>()) {
			Some(text) => {
				if text.data() != content {
					text.set_data(content);
				}
			}
			None => {
				let text = self.inner.document.create_text_node(content);
				let inserted = match &existing {
					Some(existing) => self.parent.replace_child(text.as_ref(), existing),
					None => self.parent.append_child(text.as_ref()),
				};
				if let Err(error) = inserted {
					error!("Failed to insert text node: {:?}", error);
				}
			}
		}
		self.index += 1;
		Ok(())
	}

	// --- Parts (dynamic positions) ---

	fn write_slot(&mut self, content: &str) -> Result<()> {
		let cursor = self.part_cursor;
		self.part_cursor += 1;
		if self.scope.built {
			match self.scope.parts.get(cursor) {
				Some(Part::Slot(text)) => {
					if text.data() != content {
						text.set_data(content);
					}
				}
				Some(Part::AttrSlot { .. }) => return Err(Error::PartKindMismatch { index: cursor }),
				None => return Err(Error::PartListExhausted { index: cursor }),
			}
		} else {
			let text = self.inner.document.create_text_node(content);
			let existing = self.parent.child_nodes().item(self.index);
			let inserted = match &existing {
				Some(existing) => self.parent.insert_before(text.as_ref(), Some(existing)),
				None => self.parent.append_child(text.as_ref()),
			};
			if let Err(error) = inserted {
				error!("Failed to insert slot node: {:?}", error);
			}
			self.scope.parts.push(Part::Slot(text));
		}
		self.index += 1;
		Ok(())
	}

	fn write_attr_slot(&mut self, name: &str, value: &str) -> Result<()> {
		let cursor = self.part_cursor;
		self.part_cursor += 1;
		if self.scope.built {
			match self.scope.parts.get(cursor) {
				Some(Part::AttrSlot { element, name: recorded }) => {
					if recorded != name {
						return Err(Error::PartKindMismatch { index: cursor });
					}
					if element.get_attribute(name).as_deref() != Some(value) {
						if let Err(error) = element.set_attribute(name, value) {
							error!("Failed to set attribute {:?}: {:?}", name, error);
						}
					}
				}
				Some(Part::Slot(_)) => return Err(Error::PartKindMismatch { index: cursor }),
				None => return Err(Error::PartListExhausted { index: cursor }),
			}
		} else {
			let element = self.element.clone().ok_or(Error::AttrOutsideElement)?;
			if let Err(error) = element.set_attribute(name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
			self.scope.parts.push(Part::AttrSlot { element, name: name.to_owned() });
		}
		Ok(())
	}

	fn bind_event(&mut self, kind: &str, handler: &str) -> Result<()> {
		let element = self.element.as_ref().ok_or(Error::EventOutsideElement)?;
		let inner = &mut *self.inner;
		let _ = inner.listeners.bind(&inner.self_weak, &self.owner, &self.root, element, kind, handler);
		Ok(())
	}

	// --- Groups ---

	fn open_bracket(&mut self, key: &str) -> Result<()> {
		let span = trace_span!("Entering group", key);
		let _enter = span.enter();
		self.visited_groups.insert(key.to_owned());
		let group = match self.scope.groups.remove(key) {
			Some(group) => group,
			None => {
				// First appearance: anchor the sentinel at the cursor so everything the
				// group ever inserts lands before any trailing sibling content.
				let sentinel = self.inner.document.create_comment(key);
				let existing = self.parent.child_nodes().item(self.index);
				let inserted = match &existing {
					Some(existing) => self.parent.insert_before(sentinel.as_ref(), Some(existing)),
					None => self.parent.append_child(sentinel.as_ref()),
				};
				if let Err(error) = inserted {
					error!("Failed to insert group sentinel: {:?}", error);
				}
				Group { sentinel, instances: Vec::new() }
			}
		};
		self.bracket = Some(Bracket {
			key: key.to_owned(),
			group,
			visited: 0,
			state: BracketState::Idle,
		});
		self.start_instance()
	}

	fn start_instance(&mut self) -> Result<()> {
		let bracket = self.bracket.as_mut().ok_or(Error::EndWithoutBegin)?;
		if bracket.visited < bracket.group.instances.len() {
			trace!("Patching group instance {}.", bracket.visited);
			bracket.state = BracketState::Patch(InstancePatcher { part_cursor: 0, cell_cursor: 0, depth: 0 });
		} else {
			trace!("Building group instance {}.", bracket.visited);
			let start = self.inner.document.create_comment("");
			if let Err(error) = self.parent.insert_before(start.as_ref(), Some(bracket.group.sentinel.as_ref())) {
				error!("Failed to insert instance start marker: {:?}", error);
			}
			bracket.state = BracketState::Build(InstanceBuilder {
				start,
				parts: Vec::new(),
				cells: Vec::new(),
				listener_keys: Vec::new(),
				parent: self.parent.clone(),
				element: None,
				stack: Vec::new(),
				span: 1,
			});
		}
		Ok(())
	}

	fn end_instance(&mut self) -> Result<()> {
		let bracket = self.bracket.as_mut().ok_or(Error::EndWithoutBegin)?;
		match core::mem::replace(&mut bracket.state, BracketState::Idle) {
			BracketState::Build(builder) => {
				if !builder.stack.is_empty() {
					return Err(Error::UnclosedElements(builder.stack.len()));
				}
				let end = self.inner.document.create_comment("");
				if let Err(error) = self.parent.insert_before(end.as_ref(), Some(bracket.group.sentinel.as_ref())) {
					error!("Failed to insert instance end marker: {:?}", error);
				}
				bracket.group.instances.push(GroupInstance {
					start: builder.start,
					end,
					parts: builder.parts,
					cells: builder.cells,
					listener_keys: builder.listener_keys,
					span: builder.span + 1,
				});
				bracket.visited += 1;
			}
			BracketState::Patch(patcher) => {
				if patcher.depth != 0 {
					return Err(Error::UnclosedElements(patcher.depth));
				}
				bracket.visited += 1;
			}
			BracketState::Idle => return Err(Error::EndWithoutBegin),
		}
		Ok(())
	}

	fn bracket_op(&mut self, op: Op<'_>) -> Result<()> {
		let idle = matches!(self.bracket.as_ref().map(|bracket| &bracket.state), Some(BracketState::Idle));
		if idle {
			// The group stays current across consecutive same-key brackets; anything
			// else ends it, trims whatever this pass did not revisit, and re-applies.
			return match op {
				Op::Begin(key) => {
					if self.bracket.as_ref().map_or(false, |bracket| bracket.key == key) {
						self.start_instance()
					} else {
						self.finalize_bracket()?;
						self.open_bracket(key)
					}
				}
				Op::End => Err(Error::EndWithoutBegin),
				op => {
					self.finalize_bracket()?;
					self.apply(op)
				}
			};
		}

		match op {
			Op::End => return self.end_instance(),
			Op::Begin(_) => return Err(Error::NestedBegin),
			Op::Child(_) => return Err(Error::UnsupportedInBracket("child")),
			Op::Prop(_) => return Err(Error::PropOutsideChild),
			_ => {}
		}

		let bracket = self.bracket.as_mut().ok_or(Error::EndWithoutBegin)?;
		match &mut bracket.state {
			BracketState::Build(builder) => build_op(&mut *self.inner, &self.owner, &self.root, &bracket.group.sentinel, builder, op),
			BracketState::Patch(patcher) => patch_op(&bracket.group, bracket.visited, patcher, op),
			BracketState::Idle => Err(Error::EndWithoutBegin),
		}
	}

	fn finalize_bracket(&mut self) -> Result<()> {
		let bracket = match self.bracket.take() {
			Some(bracket) => bracket,
			None => return Ok(()),
		};
		let Bracket { key, mut group, visited, state } = bracket;
		if !matches!(state, BracketState::Idle) {
			return Err(Error::UnclosedBegin(key));
		}
		if visited < group.instances.len() {
			trace!("Trimming group {:?} from {} to {} instance(s).", key, group.instances.len(), visited);
		}
		let released = group.trim_to(visited);
		self.inner.listeners.release(&released);
		// Step the cursor over the whole bracket so the enclosing structure keeps lining up.
		self.index += group.span();
		self.scope.groups.insert(key, group);
		Ok(())
	}

	// --- Children ---

	fn flush_child(&mut self) -> Result<()> {
		let PendingChild { name, props } = match self.pending_child.take() {
			Some(pending) => pending,
			None => return Ok(()),
		};
		let span = trace_span!("Resolving child", name = name.as_str());
		let _enter = span.enter();
		let mut registration = match self.inner.children.remove(&name) {
			Some(registration) => registration,
			None => {
				trace!("No child registered under this name. Skipping.");
				return Ok(());
			}
		};
		registration.props = props;
		let result = self.render_child(&name, &mut registration);
		self.inner.children.insert(name, registration);
		result
	}

	fn render_child(&mut self, name: &str, registration: &mut ChildRegistration) -> Result<()> {
		let rendered = registration
			.module
			.borrow_mut()
			.render(&mut Imports { frame: None }, &registration.props)?;
		match rendered {
			Rendered::Imports => {
				warn!("Child {:?} rendered through imports; children must return opcodes or a buffer. Skipping.", name);
				Ok(())
			}
			Rendered::Opcodes(ops) => {
				let mount = match registration.mount.clone() {
					Some(mount) => mount,
					None => {
						let mount = create_element(&self.inner.document, name);
						registration.mount = Some(mount.clone());
						mount
					}
				};
				let existing = self.parent.child_nodes().item(self.index);
				let already_placed = existing
					.as_ref()
					.map_or(false, |node| node.is_same_node(Some(mount.as_ref())));
				if !already_placed {
					let inserted = match &existing {
						Some(existing) => self.parent.insert_before(mount.as_ref(), Some(existing)),
						None => self.parent.append_child(mount.as_ref()),
					};
					if let Err(error) = inserted {
						error!("Failed to insert child mount point: {:?}", error);
					}
				}
				self.index += 1;
				let mut frame = self.child_frame(registration, mount, 0);
				for op in &ops {
					frame.apply(op.as_op())?;
				}
				frame.finish()
			}
			Rendered::Buffer(ptr) => {
				// The low-level variant splices inline: no mount element, the child's
				// opcodes continue at the parent's cursor with the child's own parts.
				let module = registration.module.clone();
				let module = module.borrow();
				let parent = self.parent.clone();
				let index = self.index;
				let mut frame = self.child_frame(registration, parent, index);
				let mut decoder = BufferDecoder::new(MemoryReader::new(module.memory()), ptr);
				while let Some(op) = decoder.next_op()? {
					frame.apply(op)?;
				}
				let result = frame.finish();
				let index = frame.index;
				drop(frame);
				self.index = index;
				result
			}
		}
	}

	// --- Templates ---

	pub(crate) fn ensure_template_instance(&mut self, id: u32) -> Result<()> {
		if self.inner.template_instances.contains_key(&id) {
			return Ok(());
		}
		let instance = crate::host::instantiate(&mut *self.inner, &self.owner, &self.root, id)?;
		self.inner.template_instances.insert(id, instance);
		Ok(())
	}
}

fn create_element(document: &web_sys::Document, tag: &str) -> web_sys::Element {
	match document.create_element(tag) {
		Ok(element) => element,
		Err(error) => throw_str(&format!("opdom: failed to create <{}>: {:?}", tag, error)),
	}
}

fn insert_into_instance(builder: &mut InstanceBuilder, sentinel: &web_sys::Comment, node: &web_sys::Node) {
	let inserted = if builder.stack.is_empty() {
		builder.parent.insert_before(node, Some(sentinel.as_ref()))
	} else {
		builder.parent.append_child(node)
	};
	match inserted {
		Ok(_) => {
			if builder.stack.is_empty() {
				builder.span += 1;
			}
		}
		Err(error) => error!("Failed to insert node into group instance: {:?}", error),
	}
}

fn build_op(
	inner: &mut HostInner,
	owner: &SharedModule,
	root: &SharedModule,
	sentinel: &web_sys::Comment,
	builder: &mut InstanceBuilder,
	op: Op<'_>,
) -> Result<()> {
	match op {
		Op::Open(tag) => {
			let element = create_element(&inner.document, tag);
			insert_into_instance(builder, sentinel, element.as_ref());
			builder.stack.push((builder.parent.clone(), builder.element.take()));
			builder.parent = element.clone();
			builder.element = Some(element);
		}
		Op::Close => {
			let (parent, element) = builder.stack.pop().ok_or(Error::CloseWithoutOpen)?;
			builder.parent = parent;
			builder.element = element;
		}
		Op::Attr { name, value } => {
			let element = builder.element.as_ref().ok_or(Error::AttrOutsideElement)?;
			if let Err(error) = element.set_attribute(name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
		}
		Op::Text(content) => {
			let text = inner.document.create_text_node(content);
			insert_into_instance(builder, sentinel, text.as_ref());
		}
		Op::Slot(content) => {
			let text = inner.document.create_text_node(content);
			insert_into_instance(builder, sentinel, text.as_ref());
			builder.parts.push(Part::Slot(text));
		}
		Op::AttrSlot { name, value } => {
			let element = builder.element.clone().ok_or(Error::AttrOutsideElement)?;
			if let Err(error) = element.set_attribute(name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
			builder.parts.push(Part::AttrSlot { element, name: name.to_owned() });
		}
		Op::Event { kind, handler } => {
			let element = builder.element.as_ref().ok_or(Error::EventOutsideElement)?;
			let (cell, key) = inner.listeners.bind(&inner.self_weak, owner, root, element, kind, handler);
			builder.cells.push(cell);
			builder.listener_keys.push(key);
		}
		// The caller routes these before dispatching here.
		Op::Begin(_) | Op::End | Op::Child(_) | Op::Prop(_) => unreachable!("routed by bracket_op"),
	}
	Ok(())
}

fn patch_op(group: &Group, visited: usize, patcher: &mut InstancePatcher, op: Op<'_>) -> Result<()> {
	let instance = match group.instances.get(visited) {
		Some(instance) => instance,
		None => return Err(Error::EndWithoutBegin),
	};
	match op {
		// Static structure is not revisited on a patch pass; it is only walked for depth
		// so the instance's `end` is recognized at the right level.
		Op::Open(_) => patcher.depth += 1,
		Op::Close => {
			if patcher.depth == 0 {
				return Err(Error::CloseWithoutOpen);
			}
			patcher.depth -= 1;
		}
		Op::Attr { .. } | Op::Text(_) => {}
		Op::Slot(content) => {
			let cursor = patcher.part_cursor;
			patcher.part_cursor += 1;
			match instance.parts.get(cursor) {
				Some(Part::Slot(text)) => {
					if text.data() != content {
						text.set_data(content);
					}
				}
				Some(Part::AttrSlot { .. }) => return Err(Error::PartKindMismatch { index: cursor }),
				None => return Err(Error::PartListExhausted { index: cursor }),
			}
		}
		Op::AttrSlot { name, value } => {
			let cursor = patcher.part_cursor;
			patcher.part_cursor += 1;
			match instance.parts.get(cursor) {
				Some(Part::AttrSlot { element, name: recorded }) => {
					if recorded != name {
						return Err(Error::PartKindMismatch { index: cursor });
					}
					if element.get_attribute(name).as_deref() != Some(value) {
						if let Err(error) = element.set_attribute(name, value) {
							error!("Failed to set attribute {:?}: {:?}", name, error);
						}
					}
				}
				Some(Part::Slot(_)) => return Err(Error::PartKindMismatch { index: cursor }),
				None => return Err(Error::PartListExhausted { index: cursor }),
			}
		}
		Op::Event { handler, .. } => {
			let cursor = patcher.cell_cursor;
			patcher.cell_cursor += 1;
			match instance.cells.get(cursor) {
				Some(cell) => {
					if *cell.borrow() != handler {
						trace!("Rebinding instance listener {} to {:?}.", cursor, handler);
						*cell.borrow_mut() = handler.to_owned();
					}
				}
				None => return Err(Error::ListenerListExhausted { index: cursor }),
			}
		}
		Op::Begin(_) | Op::End | Op::Child(_) | Op::Prop(_) => unreachable!("routed by bracket_op"),
	}
	Ok(())
}

/// The module → host import surface, scoped to one `init`, `render` or template call.
///
/// Structural calls made while a template is recording are captured into the recording
/// instead of applied to the document.
pub struct Imports<'a, 'h> {
	pub(crate) frame: Option<&'a mut RenderFrame<'h>>,
}
impl<'a, 'h> Imports<'a, 'h> {
	fn frame(&mut self) -> Result<&mut RenderFrame<'h>> {
		self.frame.as_deref_mut().ok_or(Error::ImportOutsideFrame)
	}

	pub fn open_element(&mut self, tag: &str) -> Result<()> {
		let frame = self.frame()?;
		if frame.inner.templates.is_recording() {
			frame.inner.templates.record(TemplateInstruction::Open(tag.to_owned()));
			return Ok(());
		}
		frame.apply(Op::Open(tag))
	}

	pub fn close_element(&mut self) -> Result<()> {
		let frame = self.frame()?;
		if frame.inner.templates.is_recording() {
			frame.inner.templates.record(TemplateInstruction::Close);
			return Ok(());
		}
		frame.apply(Op::Close)
	}

	pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
		let frame = self.frame()?;
		if frame.inner.templates.is_recording() {
			frame
				.inner
				.templates
				.record(TemplateInstruction::Attr { name: name.to_owned(), value: value.to_owned() });
			return Ok(());
		}
		frame.apply(Op::Attr { name, value })
	}

	pub fn text(&mut self, content: &str) -> Result<()> {
		let frame = self.frame()?;
		if frame.inner.templates.is_recording() {
			frame.inner.templates.record(TemplateInstruction::Text(content.to_owned()));
			return Ok(());
		}
		frame.apply(Op::Text(content))
	}

	pub fn on_event(&mut self, kind: &str, handler: &str) -> Result<()> {
		let frame = self.frame()?;
		if frame.inner.templates.is_recording() {
			frame
				.inner
				.templates
				.record(TemplateInstruction::Event { kind: kind.to_owned(), handler: handler.to_owned() });
			return Ok(());
		}
		frame.apply(Op::Event { kind, handler })
	}

	pub fn create_template(&mut self, id: u32) -> Result<()> {
		self.frame()?.inner.templates.begin_recording(id);
		Ok(())
	}

	pub fn slot(&mut self) -> Result<()> {
		let frame = self.frame()?;
		if frame.inner.templates.is_recording() {
			frame.inner.templates.record(TemplateInstruction::Slot);
		} else {
			warn!("`slot()` outside template recording. Ignoring.");
		}
		Ok(())
	}

	pub fn end_template(&mut self) -> Result<()> {
		self.frame()?.inner.templates.seal().map(|_| ())
	}

	/// Selects template `id` for slot updates, instantiating it on first use, and resets
	/// its slot cursor.
	pub fn update(&mut self, id: u32) -> Result<()> {
		let frame = self.frame()?;
		frame.ensure_template_instance(id)?;
		frame.update_target = Some(UpdateCursor { id, index: 0 });
		Ok(())
	}

	/// Writes the next slot of the template selected by [`update`](Self::update),
	/// advancing the cursor. Only touches the node when the content changed.
	pub fn value(&mut self, content: &str) -> Result<()> {
		let frame = self.frame()?;
		let target = frame.update_target.as_mut().ok_or(Error::ValueOutsideUpdate)?;
		let instance = frame
			.inner
			.template_instances
			.get(&target.id)
			.ok_or(Error::UnknownTemplate(target.id))?;
		let slot = instance
			.slots
			.get(target.index)
			.ok_or(Error::PartListExhausted { index: target.index })?;
		if slot.data() != content {
			slot.set_data(content);
		}
		target.index += 1;
		Ok(())
	}

	pub fn commit(&mut self) -> Result<()> {
		self.frame()?.update_target = None;
		Ok(())
	}

	/// Bulk slot update: reads `count` (offset, length) pairs starting at byte offset
	/// `parts_ptr` of `memory` (the calling module's own linear memory) and writes each
	/// decoded string into the corresponding slot of template `id`.
	pub fn update_template(&mut self, id: u32, memory: &[u8], parts_ptr: u32, count: u32) -> Result<()> {
		let frame = self.frame()?;
		frame.ensure_template_instance(id)?;
		let instance = frame
			.inner
			.template_instances
			.get(&id)
			.ok_or(Error::UnknownTemplate(id))?;
		let reader = MemoryReader::new(memory);
		let base = (parts_ptr >> 2) as usize;
		for i in 0..count as usize {
			let offset = reader.word(base + i * 2)?;
			let len = reader.word(base + i * 2 + 1)?;
			let content = reader.str_at(offset, len)?;
			let slot = instance.slots.get(i).ok_or(Error::PartListExhausted { index: i })?;
			if slot.data() != content {
				slot.set_data(content);
			}
		}
		Ok(())
	}
}

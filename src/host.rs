//! The host: owns the container element, the per-host side tables, and the render entry
//! points. One host owns one container subtree exclusively; nothing else may mutate it.

use crate::{
	error::Result,
	events::{EventContext, ListenerMap},
	groups::{Group, Part},
	interpret::{Imports, RenderFrame},
	memory::MemoryReader,
	module::{Rendered, SharedModule},
	opcode::{BufferDecoder, PropValue},
	templates::{TemplateCache, TemplateInstruction},
};
use hashbrown::HashMap;
use std::{
	cell::RefCell,
	mem,
	rc::{Rc, Weak},
};
use tracing::{error, info, trace_span};
use wasm_bindgen::{throw_str, UnwrapThrowExt};

/// Per-component state that outlives render calls: the root part list recorded on the
/// first build, the group table, and whether the first build happened yet.
#[derive(Default)]
pub(crate) struct ComponentScope {
	pub built: bool,
	pub parts: Vec<Part>,
	pub groups: HashMap<String, Group>,
}

/// A named child slot: the mounted module, its mount element (typed protocol only), its
/// own component scope, and the props collected on the parent's last render.
pub(crate) struct ChildRegistration {
	pub module: SharedModule,
	pub mount: Option<web_sys::Element>,
	pub scope: ComponentScope,
	pub props: Vec<PropValue>,
}

/// Materialized nodes of one template use: the slot text nodes in recording order.
pub(crate) struct TemplateInstance {
	pub slots: Vec<web_sys::Text>,
}

struct Mount {
	module: SharedModule,
	initialized: bool,
	scope: ComponentScope,
}

pub(crate) struct HostInner {
	pub document: web_sys::Document,
	pub container: web_sys::Element,
	/// Handed to listener closures so they can reach the host without keeping it alive.
	pub self_weak: Weak<RefCell<HostInner>>,
	pub templates: TemplateCache,
	pub template_instances: HashMap<u32, TemplateInstance>,
	pub listeners: ListenerMap,
	pub children: HashMap<String, ChildRegistration>,
	mounts: Vec<Mount>,
}

/// Attached to a specific [`web_sys::Element`], this `struct` renders mounted modules
/// into its [***childNodes***](https://developer.mozilla.org/en-US/docs/Web/API/Node/childNodes).
///
/// All side tables (template definitions and instances, groups, child registrations,
/// listeners) live for as long as the host does; nothing is persisted elsewhere.
///
/// # Correct Use
///
/// The host must own its container subtree exclusively. Dropping the host invalidates
/// its listener closures; listeners still attached to surviving DOM will start throwing
/// into JavaScript if the elements outlive the host and keep firing.
pub struct DomHost {
	inner: Rc<RefCell<HostInner>>,
}
impl DomHost {
	#[must_use]
	pub fn new_for_element(container: web_sys::Element) -> Self {
		let document = container
			.owner_document()
			.expect_throw("opdom: no owner document found for the container element");
		let inner = Rc::new(RefCell::new(HostInner {
			document,
			container,
			self_weak: Weak::new(),
			templates: TemplateCache::default(),
			template_instances: HashMap::new(),
			listeners: ListenerMap::default(),
			children: HashMap::new(),
			mounts: Vec::new(),
		}));
		let weak = Rc::downgrade(&inner);
		inner.borrow_mut().self_weak = weak;
		Self { inner }
	}

	/// Renders `module` into the container, running its `init` first if this is the
	/// module's first render on this host. Bound events re-enter this cycle on their own.
	pub fn render(&self, module: &SharedModule) -> Result<()> {
		render_shared(&self.inner, module)
	}

	/// Like [`render`](Self::render), but (re)registers named children first. A name is
	/// only rebuilt when it now maps to a different module; re-supplying the same module
	/// keeps its mount point and state.
	pub fn render_with_children<I>(&self, module: &SharedModule, children: I) -> Result<()>
	where
		I: IntoIterator<Item = (String, SharedModule)>,
	{
		{
			let mut inner = self.inner.borrow_mut();
			for (name, child) in children {
				match inner.children.get(&name) {
					Some(existing) if Rc::ptr_eq(&existing.module, &child) => {}
					_ => {
						inner.children.insert(
							name,
							ChildRegistration { module: child, mount: None, scope: ComponentScope::default(), props: Vec::new() },
						);
					}
				}
			}
		}
		render_shared(&self.inner, module)
	}

	/// Number of live native listeners. One per (element, event type) pair, no matter
	/// how often renders rebind handlers.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.inner.borrow().listeners.len()
	}
}

pub(crate) fn render_shared(inner_rc: &Rc<RefCell<HostInner>>, module: &SharedModule) -> Result<()> {
	let span = trace_span!("render");
	let _enter = span.enter();

	let mut guard = inner_rc.borrow_mut();
	let inner = &mut *guard;

	let index = match inner.mounts.iter().position(|mount| Rc::ptr_eq(&mount.module, module)) {
		Some(index) => index,
		None => {
			inner.mounts.push(Mount { module: module.clone(), initialized: false, scope: ComponentScope::default() });
			inner.mounts.len() - 1
		}
	};
	let initialized = inner.mounts[index].initialized;
	let mut scope = mem::take(&mut inner.mounts[index].scope);

	let result = (|| -> Result<()> {
		if !initialized {
			let mut frame = RenderFrame::new(&mut *inner, &mut scope, module.clone(), module.clone());
			module.borrow_mut().init(&mut Imports { frame: Some(&mut frame) })?;
		}

		let mut frame = RenderFrame::new(&mut *inner, &mut scope, module.clone(), module.clone());
		let rendered = module
			.borrow_mut()
			.render(&mut Imports { frame: Some(&mut frame) }, &[])?;
		match rendered {
			Rendered::Imports => {
				frame.finish()?;
				// The incremental protocol closes out the root level here; template
				// modules do not advance the cursor, so their DOM must not be trimmed.
				frame.trim_trailing();
			}
			Rendered::Opcodes(ops) => {
				for op in &ops {
					frame.apply(op.as_op())?;
				}
				frame.finish()?;
			}
			Rendered::Buffer(ptr) => {
				let module_ref = module.borrow();
				let mut decoder = BufferDecoder::new(MemoryReader::new(module_ref.memory()), ptr);
				while let Some(op) = decoder.next_op()? {
					frame.apply(op)?;
				}
				frame.finish()?;
			}
		}
		Ok(())
	})();

	inner.mounts[index].scope = scope;
	inner.mounts[index].initialized = true;
	info!("Listener count: {}", inner.listeners.len());
	result
}

/// One event dispatch: invoke the named handler on the owning module with a scoped event
/// read channel, then re-render unconditionally.
pub(crate) fn dispatch(
	inner: &Rc<RefCell<HostInner>>,
	owner: &SharedModule,
	root: &SharedModule,
	cell: &Rc<RefCell<String>>,
	event: web_sys::Event,
) {
	let handler = cell.borrow().clone();
	let span = trace_span!("dispatch", handler = handler.as_str());
	let _enter = span.enter();
	{
		// The read channel lives exactly as long as this synchronous call.
		let context = EventContext::new(&event);
		owner.borrow_mut().handle_event(&handler, &context);
	}
	if let Err(error) = render_shared(inner, root) {
		throw_str(&format!("opdom: re-render after {:?} failed: {}", handler, error));
	}
}

/// Replays a sealed template against the container, collecting slot nodes in encounter
/// order and binding recorded listeners to the concrete elements. Every call produces a
/// fresh instance; the caller decides whether to cache it.
pub(crate) fn instantiate(inner: &mut HostInner, owner: &SharedModule, root: &SharedModule, id: u32) -> Result<TemplateInstance> {
	let span = trace_span!("Instantiating template", id);
	let _enter = span.enter();

	let definition = inner.templates.get(id)?;
	let mut parent: web_sys::Element = inner.container.clone();
	let mut element: Option<web_sys::Element> = None;
	let mut stack: Vec<(web_sys::Element, Option<web_sys::Element>)> = Vec::new();
	let mut slots = Vec::new();

	for instruction in definition.instructions() {
		match instruction {
			TemplateInstruction::Open(tag) => {
				let created = match inner.document.create_element(tag) {
					Ok(created) => created,
					Err(error) => throw_str(&format!("opdom: failed to create <{}>: {:?}", tag, error)),
				};
				if let Err(error) = parent.append_child(created.as_ref()) {
					error!("Failed to insert <{}>: {:?}", tag, error);
				}
				stack.push((parent.clone(), element.take()));
				parent = created.clone();
				element = Some(created);
			}
			TemplateInstruction::Close => match stack.pop() {
				Some((popped_parent, popped_element)) => {
					parent = popped_parent;
					element = popped_element;
				}
				None => error!("Template {} has a surplus `close`.", id),
			},
			TemplateInstruction::Attr { name, value } => match &element {
				Some(element) => {
					if let Err(error) = element.set_attribute(name, value) {
						error!("Failed to set attribute {:?}: {:?}", name, error);
					}
				}
				None => error!("Template {} sets attribute {:?} before any element.", id, name),
			},
			TemplateInstruction::Text(content) => {
				let text = inner.document.create_text_node(content);
				if let Err(error) = parent.append_child(text.as_ref()) {
					error!("Failed to insert text node: {:?}", error);
				}
			}
			TemplateInstruction::Slot => {
				let text = inner.document.create_text_node("");
				if let Err(error) = parent.append_child(text.as_ref()) {
					error!("Failed to insert slot node: {:?}", error);
				}
				slots.push(text);
			}
			TemplateInstruction::Event { kind, handler } => match &element {
				Some(element) => {
					// Bound to the element now, resolved by handler name at fire time.
					let _ = inner.listeners.bind(&inner.self_weak, owner, root, element, kind, handler);
				}
				None => error!("Template {} binds {:?} before any element.", id, kind),
			},
		}
	}

	Ok(TemplateInstance { slots })
}

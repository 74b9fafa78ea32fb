#![doc(html_root_url = "https://docs.rs/opdom/0.1.0")]
#![warn(clippy::pedantic)]

//! An opcode-driven DOM patcher for WebAssembly UI modules.
//!
//! Modules describe the UI they want, on demand, through one of four cooperating
//! strategies; a [`DomHost`] reconciles each description against the live document with
//! minimal mutation. No virtual tree is retained: state lives in the document plus
//! small side tables.
//!
//! 1. **Incremental**: the module calls [`Imports`] during every `render` to describe
//!    the full tree; the host reuses matching nodes in place and trims the rest.
//! 2. **Templates**: the module records named static shapes once during `init`, then
//!    only streams slot values through `update`/`value`/`commit` (or `update_template`).
//! 3. **Opcode buffer**: `render` returns a pointer to a flat `u32` buffer in the
//!    module's linear memory; after the first build only slot values are read.
//! 4. **Typed opcodes**: `render` returns [`Opcode`]s, with `begin`/`end` group
//!    reconciliation for lists and `child`/`prop` composition for nested components.

pub mod error;
pub mod memory;

mod events;
mod groups;
mod host;
mod interpret;
mod module;
mod opcode;
mod templates;

pub use error::{Error, Result};
pub use events::EventContext;
pub use host::DomHost;
pub use interpret::Imports;
pub use module::{Module, Rendered, SharedModule};
pub use opcode::{Opcode, PropValue};

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

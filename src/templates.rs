//! The template cache: named, static DOM shapes recorded once during a module's
//! initialization phase and instantiated into real nodes on first use.
//!
//! Recording and sealing are DOM-free; instantiation (in `host`) replays the sealed
//! instruction list against the document and collects each `slot`'s text node in
//! encounter order.

use crate::error::{Error, Result};
use hashbrown::HashMap;
use tracing::warn;

/// One recorded structural instruction.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TemplateInstruction {
	Open(String),
	Close,
	Attr { name: String, value: String },
	Text(String),
	Slot,
	Event { kind: String, handler: String },
}

/// A sealed recording. Immutable once `end_template` produced it; its instruction
/// ordering fixes the part count and ordering of every instance.
#[derive(Debug)]
pub(crate) struct TemplateDefinition {
	instructions: Vec<TemplateInstruction>,
}
impl TemplateDefinition {
	pub fn instructions(&self) -> &[TemplateInstruction] {
		&self.instructions
	}
}

#[derive(Debug, Default)]
pub(crate) struct TemplateCache {
	definitions: HashMap<u32, TemplateDefinition>,
	recording: Option<(u32, Vec<TemplateInstruction>)>,
}
impl TemplateCache {
	/// Starts recording for `id`. Structural import calls are captured instead of applied
	/// until [`seal`](Self::seal).
	pub fn begin_recording(&mut self, id: u32) {
		if let Some((abandoned, _)) = self.recording.replace((id, Vec::new())) {
			warn!("`create_template({})` while template {} was still recording. The earlier recording is lost.", id, abandoned);
		}
	}

	pub fn is_recording(&self) -> bool {
		self.recording.is_some()
	}

	/// Captures one instruction into the active recording. Call only while
	/// [`is_recording`](Self::is_recording).
	pub fn record(&mut self, instruction: TemplateInstruction) {
		if let Some((_, instructions)) = &mut self.recording {
			instructions.push(instruction);
		}
	}

	/// Seals the active recording and returns its id.
	pub fn seal(&mut self) -> Result<u32> {
		let (id, instructions) = self.recording.take().ok_or(Error::EndTemplateWithoutRecording)?;
		self.definitions.insert(id, TemplateDefinition { instructions });
		Ok(id)
	}

	pub fn get(&self, id: u32) -> Result<&TemplateDefinition> {
		self.definitions.get(&id).ok_or(Error::UnknownTemplate(id))
	}

	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::{TemplateCache, TemplateInstruction};
	use crate::error::Error;

	#[test]
	fn records_in_order_and_seals() {
		let mut cache = TemplateCache::default();
		cache.begin_recording(1);
		assert!(cache.is_recording());
		cache.record(TemplateInstruction::Open("span".to_owned()));
		cache.record(TemplateInstruction::Slot);
		cache.record(TemplateInstruction::Close);
		assert_eq!(cache.seal().unwrap(), 1);
		assert!(!cache.is_recording());
		assert_eq!(
			cache.get(1).unwrap().instructions(),
			&[
				TemplateInstruction::Open("span".to_owned()),
				TemplateInstruction::Slot,
				TemplateInstruction::Close,
			],
		);
	}

	#[test]
	fn seal_without_recording_fails() {
		let mut cache = TemplateCache::default();
		assert!(matches!(cache.seal(), Err(Error::EndTemplateWithoutRecording)));
	}

	#[test]
	fn unknown_template_fails() {
		let cache = TemplateCache::default();
		assert!(matches!(cache.get(7), Err(Error::UnknownTemplate(7))));
	}

	#[test]
	fn a_new_recording_replaces_an_abandoned_one() {
		let mut cache = TemplateCache::default();
		cache.begin_recording(1);
		cache.record(TemplateInstruction::Text("lost".to_owned()));
		cache.begin_recording(2);
		cache.record(TemplateInstruction::Slot);
		assert_eq!(cache.seal().unwrap(), 2);
		assert!(cache.get(1).is_err());
		assert_eq!(cache.get(2).unwrap().instructions(), &[TemplateInstruction::Slot]);
	}
}

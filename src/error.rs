use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong while decoding or interpreting a module's render description.
///
/// Protocol-shape violations are deliberately fatal: the part lists recorded on the first
/// render only stay aligned with the document while the module keeps emitting the same
/// structural shape, so patching around a mismatch would misdirect every later write.
#[derive(Debug, Error)]
pub enum Error {
	#[error("string range {offset}+{len} is outside module memory of {size} bytes")]
	StringOutOfRange { offset: u32, len: u32, size: usize },

	#[error("string range {offset}+{len} is not valid UTF-8")]
	StringNotUtf8 { offset: u32, len: u32 },

	#[error("word {word} is outside module memory")]
	BufferOutOfRange { word: usize },

	#[error("unknown opcode tag {tag} at word {word}")]
	UnknownOpcode { tag: u32, word: usize },

	#[error("`close` with no open element")]
	CloseWithoutOpen,

	#[error("`attr` with no current element")]
	AttrOutsideElement,

	#[error("`event` with no current element")]
	EventOutsideElement,

	#[error("`end` with no open `begin` bracket")]
	EndWithoutBegin,

	#[error("`begin` bracket {0:?} was still open when the render pass ended")]
	UnclosedBegin(String),

	#[error("`begin` brackets cannot nest")]
	NestedBegin,

	#[error("`{0}` is not supported inside a `begin` bracket")]
	UnsupportedInBracket(&'static str),

	#[error("render pass ended with {0} unclosed element(s)")]
	UnclosedElements(usize),

	#[error("slot {index} has no recorded part")]
	PartListExhausted { index: usize },

	#[error("part {index} does not match the opcode consuming it")]
	PartKindMismatch { index: usize },

	#[error("event {index} has no recorded listener")]
	ListenerListExhausted { index: usize },

	#[error("`prop` outside a `child` mount")]
	PropOutsideChild,

	#[error("`value` outside an `update`…`commit` window")]
	ValueOutsideUpdate,

	#[error("`end_template` with no active recording")]
	EndTemplateWithoutRecording,

	#[error("template {0} is not defined")]
	UnknownTemplate(u32),

	#[error("import call outside an active render frame")]
	ImportOutsideFrame,
}

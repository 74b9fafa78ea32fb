//! The opcode vocabulary and its two encodings.
//!
//! A module describes its UI as a sequence of opcodes. The typed encoding is [`Opcode`],
//! an owned value the module hands over wholesale; the flat encoding is a zero-terminated
//! run of little-endian `u32` words in the module's own linear memory, with string
//! operands as (byte offset, byte length) pairs into that memory. Both decode to the
//! borrowed [`Op`] form, so the interpreter is written once.
//!
//! Flat word layout, tag first:
//!
//! | tag | operands            | meaning     |
//! |-----|---------------------|-------------|
//! | 0   | (none)              | end of buffer |
//! | 1   | ptr, len            | open        |
//! | 2   | (none)              | close       |
//! | 3   | nptr, nlen, vptr, vlen | attr     |
//! | 4   | ptr, len            | text        |
//! | 5   | ptr, len            | slot        |
//! | 6   | tptr, tlen, hptr, hlen | event    |
//! | 7   | ptr, len            | child       |
//! | 8   | nptr, nlen, vptr, vlen | attr slot |
//! | 9   | ptr, len            | begin       |
//! | 10  | (none)              | end         |
//! | 11  | value (as `i32`)    | prop        |
//! | 12  | ptr, len            | prop        |

use crate::{
	error::{Error, Result},
	memory::MemoryReader,
};

/// A value passed to a child component through a `prop` opcode.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
	I32(i32),
	F64(f64),
	Bool(bool),
	Str(String),
}

/// One instruction of a module's render description, in the typed (owned) encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Opcode {
	Open(String),
	Close,
	Attr(String, String),
	Text(String),
	Slot(String),
	AttrSlot(String, String),
	Event(String, String),
	Child(String),
	Prop(PropValue),
	Begin(String),
	End,
}
impl Opcode {
	pub(crate) fn as_op(&self) -> Op<'_> {
		match self {
			Opcode::Open(tag) => Op::Open(tag),
			Opcode::Close => Op::Close,
			Opcode::Attr(name, value) => Op::Attr { name, value },
			Opcode::Text(content) => Op::Text(content),
			Opcode::Slot(content) => Op::Slot(content),
			Opcode::AttrSlot(name, value) => Op::AttrSlot { name, value },
			Opcode::Event(kind, handler) => Op::Event { kind, handler },
			Opcode::Child(name) => Op::Child(name),
			Opcode::Prop(value) => Op::Prop(value.clone()),
			Opcode::Begin(key) => Op::Begin(key),
			Opcode::End => Op::End,
		}
	}
}

/// The borrowed form both encodings decode to.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op<'a> {
	Open(&'a str),
	Close,
	Attr { name: &'a str, value: &'a str },
	Text(&'a str),
	Slot(&'a str),
	AttrSlot { name: &'a str, value: &'a str },
	Event { kind: &'a str, handler: &'a str },
	Child(&'a str),
	Prop(PropValue),
	Begin(&'a str),
	End,
}

/// Decoder front-end for the flat encoding. Borrows every string straight out of the
/// module memory; nothing is copied until the interpreter writes into the document.
pub(crate) struct BufferDecoder<'a> {
	memory: MemoryReader<'a>,
	word: usize,
}
impl<'a> BufferDecoder<'a> {
	/// `ptr` is the byte offset of the buffer inside `memory`; word reads start at `ptr >> 2`.
	pub fn new(memory: MemoryReader<'a>, ptr: u32) -> Self {
		Self { memory, word: (ptr >> 2) as usize }
	}

	fn str_operand(&self, at: usize) -> Result<&'a str> {
		self.memory.str_at(self.memory.word(at)?, self.memory.word(at + 1)?)
	}

	/// Returns the next opcode, or `None` at the zero terminator.
	pub fn next_op(&mut self) -> Result<Option<Op<'a>>> {
		let word = self.word;
		let tag = self.memory.word(word)?;
		let (op, width) = match tag {
			0 => return Ok(None),
			1 => (Op::Open(self.str_operand(word + 1)?), 3),
			2 => (Op::Close, 1),
			3 => (
				Op::Attr {
					name: self.str_operand(word + 1)?,
					value: self.str_operand(word + 3)?,
				},
				5,
			),
			4 => (Op::Text(self.str_operand(word + 1)?), 3),
			5 => (Op::Slot(self.str_operand(word + 1)?), 3),
			6 => (
				Op::Event {
					kind: self.str_operand(word + 1)?,
					handler: self.str_operand(word + 3)?,
				},
				5,
			),
			7 => (Op::Child(self.str_operand(word + 1)?), 3),
			8 => (
				Op::AttrSlot {
					name: self.str_operand(word + 1)?,
					value: self.str_operand(word + 3)?,
				},
				5,
			),
			9 => (Op::Begin(self.str_operand(word + 1)?), 3),
			10 => (Op::End, 1),
			11 => (Op::Prop(PropValue::I32(self.memory.word(word + 1)? as i32)), 2),
			12 => (Op::Prop(PropValue::Str(self.str_operand(word + 1)?.to_owned())), 3),
			tag => return Err(Error::UnknownOpcode { tag, word }),
		};
		self.word = word + width;
		Ok(Some(op))
	}
}

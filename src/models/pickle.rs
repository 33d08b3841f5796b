//! Pickle opcode tokenizer
//!
//! Walks a pickle byte stream (protocols 0-5) one opcode at a time and
//! yields each opcode together with its operand bytes and stream offset.
//! Nothing is ever instantiated: there is no stack, no memo and no
//! global lookup, so an untrusted artifact cannot run code through it.

use thiserror::Error;

/// Errors raised while tokenizing a pickle stream
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickleError {
    #[error("unknown pickle opcode 0x{opcode:02x} at offset {pos}")]
    UnknownOpcode { opcode: u8, pos: usize },

    #[error("operand of {opcode} at offset {pos} runs past end of stream")]
    Truncated { opcode: &'static str, pos: usize },

    #[error("{opcode} at offset {pos} has negative length {len}")]
    NegativeLength {
        opcode: &'static str,
        pos: usize,
        len: i32,
    },

    #[error("{opcode} at offset {pos} is not valid UTF-8")]
    InvalidUtf8 { opcode: &'static str, pos: usize },

    #[error("{opcode} at offset {pos} has a malformed operand")]
    InvalidOperand { opcode: &'static str, pos: usize },

    #[error("pickle exhausted before seeing STOP")]
    MissingStop,
}

/// How an opcode's operand is laid out after the opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// No operand
    Empty,
    /// Fixed number of bytes
    Fixed(usize),
    /// Newline-terminated text
    Line,
    /// Two newline-terminated lines (module, name)
    TwoLines,
    /// 1-byte unsigned length prefix
    Len1,
    /// 4-byte little-endian unsigned length prefix
    Len4,
    /// 4-byte little-endian signed length prefix, negative is an error
    Len4Signed,
    /// 8-byte little-endian unsigned length prefix
    Len8,
}

/// Operand classification used by consumers of the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand
    None,
    /// Raw byte string (`bytes` or `bytearray` payload)
    Bytes,
    /// UTF-8 text payload
    Text,
    /// Anything else (integers, lines, frame sizes)
    Other,
}

/// A single decoded opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op<'a> {
    /// Opcode name as listed by Python's `pickletools`
    pub name: &'static str,
    /// Offset of the opcode byte in the stream
    pub pos: usize,
    /// Operand classification
    pub kind: OperandKind,
    /// Operand payload with any length prefix or trailing newline stripped
    pub operand: &'a [u8],
}

impl<'a> Op<'a> {
    /// Payload of a raw byte-string opcode, `None` for every other opcode
    pub fn byte_string(&self) -> Option<&'a [u8]> {
        match self.kind {
            OperandKind::Bytes => Some(self.operand),
            _ => None,
        }
    }
}

fn describe(code: u8) -> Option<(&'static str, Layout, OperandKind)> {
    use Layout::*;
    use OperandKind as K;

    let entry = match code {
        // protocol 0 and 1
        b'(' => ("MARK", Empty, K::None),
        b'.' => ("STOP", Empty, K::None),
        b'0' => ("POP", Empty, K::None),
        b'1' => ("POP_MARK", Empty, K::None),
        b'2' => ("DUP", Empty, K::None),
        b'F' => ("FLOAT", Line, K::Other),
        b'I' => ("INT", Line, K::Other),
        b'J' => ("BININT", Fixed(4), K::Other),
        b'K' => ("BININT1", Fixed(1), K::Other),
        b'L' => ("LONG", Line, K::Other),
        b'M' => ("BININT2", Fixed(2), K::Other),
        b'N' => ("NONE", Empty, K::None),
        b'P' => ("PERSID", Line, K::Other),
        b'Q' => ("BINPERSID", Empty, K::None),
        b'R' => ("REDUCE", Empty, K::None),
        b'S' => ("STRING", Line, K::Other),
        b'T' => ("BINSTRING", Len4Signed, K::Other),
        b'U' => ("SHORT_BINSTRING", Len1, K::Other),
        b'V' => ("UNICODE", Line, K::Other),
        b'X' => ("BINUNICODE", Len4, K::Text),
        b'a' => ("APPEND", Empty, K::None),
        b'b' => ("BUILD", Empty, K::None),
        b'c' => ("GLOBAL", TwoLines, K::Other),
        b'd' => ("DICT", Empty, K::None),
        b'}' => ("EMPTY_DICT", Empty, K::None),
        b'e' => ("APPENDS", Empty, K::None),
        b'g' => ("GET", Line, K::Other),
        b'h' => ("BINGET", Fixed(1), K::Other),
        b'i' => ("INST", TwoLines, K::Other),
        b'j' => ("LONG_BINGET", Fixed(4), K::Other),
        b'l' => ("LIST", Empty, K::None),
        b']' => ("EMPTY_LIST", Empty, K::None),
        b'o' => ("OBJ", Empty, K::None),
        b'p' => ("PUT", Line, K::Other),
        b'q' => ("BINPUT", Fixed(1), K::Other),
        b'r' => ("LONG_BINPUT", Fixed(4), K::Other),
        b's' => ("SETITEM", Empty, K::None),
        b't' => ("TUPLE", Empty, K::None),
        b')' => ("EMPTY_TUPLE", Empty, K::None),
        b'u' => ("SETITEMS", Empty, K::None),
        b'G' => ("BINFLOAT", Fixed(8), K::Other),
        // protocol 2
        0x80 => ("PROTO", Fixed(1), K::Other),
        0x81 => ("NEWOBJ", Empty, K::None),
        0x82 => ("EXT1", Fixed(1), K::Other),
        0x83 => ("EXT2", Fixed(2), K::Other),
        0x84 => ("EXT4", Fixed(4), K::Other),
        0x85 => ("TUPLE1", Empty, K::None),
        0x86 => ("TUPLE2", Empty, K::None),
        0x87 => ("TUPLE3", Empty, K::None),
        0x88 => ("NEWTRUE", Empty, K::None),
        0x89 => ("NEWFALSE", Empty, K::None),
        0x8a => ("LONG1", Len1, K::Other),
        0x8b => ("LONG4", Len4Signed, K::Other),
        // protocol 3
        b'B' => ("BINBYTES", Len4, K::Bytes),
        b'C' => ("SHORT_BINBYTES", Len1, K::Bytes),
        // protocol 4
        0x8c => ("SHORT_BINUNICODE", Len1, K::Text),
        0x8d => ("BINUNICODE8", Len8, K::Text),
        0x8e => ("BINBYTES8", Len8, K::Bytes),
        0x8f => ("EMPTY_SET", Empty, K::None),
        0x90 => ("ADDITEMS", Empty, K::None),
        0x91 => ("FROZENSET", Empty, K::None),
        0x92 => ("NEWOBJ_EX", Empty, K::None),
        0x93 => ("STACK_GLOBAL", Empty, K::None),
        0x94 => ("MEMOIZE", Empty, K::None),
        0x95 => ("FRAME", Fixed(8), K::Other),
        // protocol 5
        0x96 => ("BYTEARRAY8", Len8, K::Bytes),
        0x97 => ("NEXT_BUFFER", Empty, K::None),
        0x98 => ("READONLY_BUFFER", Empty, K::None),
        _ => return None,
    };
    Some(entry)
}

/// Decimal integer with an optional sign, surrounding blanks allowed
fn is_decimal(text: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(text) else {
        return false;
    };
    let text = text.trim();
    let digits = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Content check for newline-terminated operands of protocol 0 and 1
fn valid_line_operand(name: &str, line: &[u8]) -> bool {
    match name {
        "INT" => line == b"00" || line == b"01" || is_decimal(line),
        "LONG" => is_decimal(line.strip_suffix(b"L").unwrap_or(line)),
        "GET" | "PUT" => is_decimal(line),
        "FLOAT" => std::str::from_utf8(line)
            .is_ok_and(|text| text.trim().parse::<f64>().is_ok()),
        "STRING" => match (line.first(), line.last()) {
            (Some(&open), Some(&close)) => {
                line.len() >= 2 && (open == b'\'' || open == b'"') && open == close
            }
            _ => false,
        },
        _ => true,
    }
}

/// Iterator over the opcodes of a pickle stream.
///
/// Yields `Err` once and then stops if the stream is malformed. Iteration
/// ends after `STOP`; trailing bytes are never looked at.
pub struct OpcodeReader<'a> {
    data: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> OpcodeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            done: false,
        }
    }

    fn take(&mut self, n: usize, name: &'static str, pos: usize) -> Result<&'a [u8], PickleError> {
        let end = self
            .cursor
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(PickleError::Truncated { opcode: name, pos })?;
        let data: &'a [u8] = self.data;
        let slice = &data[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn take_line(&mut self, name: &'static str, pos: usize) -> Result<&'a [u8], PickleError> {
        let data: &'a [u8] = self.data;
        let rest = &data[self.cursor..];
        let newline = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(PickleError::Truncated { opcode: name, pos })?;
        self.cursor += newline + 1;
        Ok(&rest[..newline])
    }

    fn take_prefixed(
        &mut self,
        width: usize,
        name: &'static str,
        pos: usize,
    ) -> Result<&'a [u8], PickleError> {
        let prefix = self.take(width, name, pos)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(prefix);
        let len = u64::from_le_bytes(buf);
        let len = usize::try_from(len).map_err(|_| PickleError::Truncated { opcode: name, pos })?;
        self.take(len, name, pos)
    }

    fn read_op(&mut self) -> Result<Op<'a>, PickleError> {
        let data: &'a [u8] = self.data;
        let pos = self.cursor;
        let code = *data.get(pos).ok_or(PickleError::MissingStop)?;
        let (name, layout, kind) =
            describe(code).ok_or(PickleError::UnknownOpcode { opcode: code, pos })?;
        self.cursor += 1;

        let operand = match layout {
            Layout::Empty => &data[self.cursor..self.cursor],
            Layout::Fixed(n) => self.take(n, name, pos)?,
            Layout::Line => {
                let line = self.take_line(name, pos)?;
                if !valid_line_operand(name, line) {
                    return Err(PickleError::InvalidOperand { opcode: name, pos });
                }
                line
            }
            Layout::TwoLines => {
                let start = self.cursor;
                self.take_line(name, pos)?;
                self.take_line(name, pos)?;
                // module and name, newline separated, final newline dropped
                &data[start..self.cursor - 1]
            }
            Layout::Len1 => self.take_prefixed(1, name, pos)?,
            Layout::Len4 => self.take_prefixed(4, name, pos)?,
            Layout::Len8 => self.take_prefixed(8, name, pos)?,
            Layout::Len4Signed => {
                let prefix = self.take(4, name, pos)?;
                let len = i32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
                if len < 0 {
                    return Err(PickleError::NegativeLength {
                        opcode: name,
                        pos,
                        len,
                    });
                }
                self.take(len as usize, name, pos)?
            }
        };

        if kind == OperandKind::Text && std::str::from_utf8(operand).is_err() {
            return Err(PickleError::InvalidUtf8 { opcode: name, pos });
        }

        Ok(Op {
            name,
            pos,
            kind,
            operand,
        })
    }
}

impl<'a> Iterator for OpcodeReader<'a> {
    type Item = Result<Op<'a>, PickleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_op();
        match &result {
            Ok(op) if op.name == "STOP" => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

/// Tokenize a whole stream, failing on the first malformed opcode
pub fn opcodes(data: &[u8]) -> Result<Vec<Op<'_>>, PickleError> {
    OpcodeReader::new(data).collect()
}

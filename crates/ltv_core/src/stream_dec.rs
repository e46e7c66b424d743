//! The streaming decoder: a pull-based scanner over a generic byte source.

use std::io::{BufRead, BufReader, Read};

use crate::consts::{decode_tag, SizeCode, TypeCode, NOP_TAG};
use crate::decoder::materialize;
use crate::err::{LtvError, LtvResult};
use crate::stack::{NestingTracker, Role};
use crate::value::LtvValue;

/// Default bound on the size of values materialized by
/// [StreamDecoder::read_value]: 1 MiB.
pub const DEFAULT_MAX_VALUE_LEN: u64 = 1 << 20;

/// Descriptor for an element read from a byte source, annotated with its
/// structural position.
#[derive(Clone, Copy, Debug)]
pub struct ElementDesc {
    /// The raw tag byte.
    pub tag: u8,
    pub type_code: TypeCode,
    pub size_code: SizeCode,
    /// Payload length in bytes.
    pub length: u64,
    /// Stream offset of the tag byte.
    pub tag_offset: usize,
    /// Stream offset of the first payload byte.
    pub value_offset: usize,
    /// Semantic position within the enclosing container.
    pub role: Role,
    /// True for the first child of the enclosing container.
    pub first_element: bool,
    /// Nesting depth; end tags report the depth of the container they close.
    pub depth: usize,
}

impl ElementDesc {
    /// True when this descriptor surfaces a no-op byte
    /// (only produced with [StreamDecoder::return_nops] set).
    pub fn is_nop(&self) -> bool {
        self.tag == NOP_TAG
    }
}

/// A pull-based decoder over an [std::io::Read] source.
///
/// Elements are annotated with role/depth/first-element information, which
/// is what drives transcoders that need commas, colons and indentation.
pub struct StreamDecoder<R: Read> {
    r: BufReader<R>,
    offset: usize,
    tracker: NestingTracker,

    /// Surface no-op bytes to the caller instead of skipping them.
    pub return_nops: bool,

    /// Bound on the payload size [read_value](Self::read_value) will
    /// materialize. Hostile inputs cannot force larger allocations.
    pub max_value_len: u64,
}

impl<R: Read> StreamDecoder<R> {
    pub fn new(r: R) -> Self {
        Self {
            r: BufReader::new(r),
            offset: 0,
            tracker: NestingTracker::new(),
            return_nops: false,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
        }
    }

    /// Stream offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read exactly `buf.len()` bytes of payload from the source.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> LtvResult<()> {
        match self.r.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len();
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(LtvError::UnexpectedEof)
            }
            Err(e) => Err(LtvError::Io(e)),
        }
    }

    /// Read one byte; `Ok(None)` at end of stream.
    fn read_byte(&mut self) -> LtvResult<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.r.read_exact(&mut byte) {
            Ok(()) => {
                self.offset += 1;
                Ok(Some(byte[0]))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(LtvError::Io(e)),
        }
    }

    /// Read the next tag (and length prefix) from the stream. On return the
    /// source is positioned over the value.
    ///
    /// Returns `Ok(None)` at a clean end of stream; ends inside an element
    /// or with open containers are [LtvError::UnexpectedEof].
    pub fn next(&mut self) -> LtvResult<Option<ElementDesc>> {
        let mut tag_offset = self.offset;

        let tag = loop {
            match self.read_byte()? {
                None => {
                    return match self.tracker.is_balanced() {
                        true => Ok(None),
                        false => Err(LtvError::UnexpectedEof),
                    };
                }
                Some(NOP_TAG) => {
                    if self.return_nops {
                        return Ok(Some(ElementDesc {
                            tag: NOP_TAG,
                            type_code: TypeCode::Nil,
                            size_code: SizeCode::Single,
                            length: 0,
                            tag_offset,
                            value_offset: tag_offset,
                            role: Role::Value,
                            first_element: false,
                            depth: self.tracker.depth(),
                        }));
                    }
                    tag_offset = self.offset;
                }
                Some(byte) => break byte,
            }
        };

        let (type_code, size_code) = decode_tag(tag)?;
        let notes = self.tracker.process(type_code)?;

        let type_size = type_code.size() as u64;
        let mut desc = ElementDesc {
            tag,
            type_code,
            size_code,
            length: type_size,
            tag_offset,
            value_offset: match type_size {
                0 => tag_offset,
                _ => tag_offset + 1,
            },
            role: notes.role,
            first_element: notes.first_element,
            depth: notes.depth,
        };

        if size_code == SizeCode::Single {
            return Ok(Some(desc));
        }

        // Vector element: read the length field.
        let len_size = size_code.len_size();
        let mut field = [0u8; 8];
        self.read_exact(&mut field[..len_size])?;

        desc.length = match size_code {
            SizeCode::Size1 => u64::from(field[0]),
            SizeCode::Size2 => u64::from(u16::from_le_bytes([field[0], field[1]])),
            SizeCode::Size4 => {
                u64::from(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
            }
            _ => u64::from_le_bytes(field),
        };
        desc.value_offset = tag_offset + 1 + len_size;

        if desc.length % type_size != 0 {
            return Err(LtvError::InvalidVectorLen);
        }

        Ok(Some(desc))
    }

    /// Read the next element as a generic value.
    pub fn value(&mut self) -> LtvResult<Option<LtvValue>> {
        match self.next()? {
            Some(desc) => self.read_value(&desc).map(Some),
            None => Ok(None),
        }
    }

    /// Materialize the element described by `desc` as a generic value.
    ///
    /// Payloads larger than [max_value_len](Self::max_value_len) are
    /// refused with [LtvError::MaxValueLenExceeded].
    pub fn read_value(&mut self, desc: &ElementDesc) -> LtvResult<LtvValue> {
        match desc.type_code {
            TypeCode::Nil => Ok(LtvValue::Nil),
            TypeCode::End => Err(LtvError::ExpectedValue),
            TypeCode::Struct => {
                let mut s = crate::LtvStruct::new();
                loop {
                    let desc = self.require_next()?;
                    if desc.type_code == TypeCode::End {
                        break;
                    }

                    let key = match self.read_value(&desc)? {
                        LtvValue::String(key) => key,
                        _ => return Err(LtvError::BadKey),
                    };

                    let desc = self.require_next()?;
                    let value = self.read_value(&desc)?;
                    s.set(key, value)?;
                }
                Ok(LtvValue::Struct(s))
            }
            TypeCode::List => {
                let mut items = Vec::new();
                loop {
                    let desc = self.require_next()?;
                    if desc.type_code == TypeCode::End {
                        break;
                    }
                    items.push(self.read_value(&desc)?);
                }
                Ok(LtvValue::List(items))
            }
            _ => {
                if desc.length > self.max_value_len {
                    return Err(LtvError::MaxValueLenExceeded);
                }

                let mut payload = vec![0u8; desc.length as usize];
                self.read_exact(&mut payload)?;
                materialize(desc.type_code, desc.size_code, &payload)
            }
        }
    }

    /// Discard the payload of the element described by `desc`.
    pub fn skip_value(&mut self, desc: &ElementDesc) -> LtvResult<()> {
        let mut remaining = desc.length;
        while remaining > 0 {
            let chunk = self.r.fill_buf().map_err(LtvError::Io)?;
            if chunk.is_empty() {
                return Err(LtvError::UnexpectedEof);
            }

            let n = (chunk.len() as u64).min(remaining) as usize;
            self.r.consume(n);
            self.offset += n;
            remaining -= n as u64;
        }
        Ok(())
    }

    fn require_next(&mut self) -> LtvResult<ElementDesc> {
        match self.next()? {
            Some(desc) => Ok(desc),
            None => Err(LtvError::UnexpectedEof),
        }
    }
}

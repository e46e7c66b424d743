//! Streaming LTV to JSON transcoder.

use std::io::{BufWriter, Read, Write};

use ltv_core::{LtvValue, Role, StreamDecoder, TypeCode};

use crate::TranscodeResult;

const INDENT: &str = "    ";

fn indent<W: Write>(w: &mut W, depth: usize) -> std::io::Result<()> {
    writeln!(w)?;
    for _ in 0..depth {
        w.write_all(INDENT.as_bytes())?;
    }
    Ok(())
}

fn write_float<W: Write, F: Into<f64> + std::fmt::Display + Copy>(
    w: &mut W,
    v: F,
) -> std::io::Result<()> {
    let as64: f64 = v.into();
    if as64.is_nan() {
        write!(w, "\"NaN\"")
    } else if as64 == f64::INFINITY {
        write!(w, "\"Infinity\"")
    } else if as64 == f64::NEG_INFINITY {
        write!(w, "\"-Infinity\"")
    } else {
        write!(w, "{v}")
    }
}

/// Transcode a stream of LTV elements to JSON text.
///
/// The element roles drive the punctuation: commas before every non-first
/// element, a colon after each struct key. With `pretty` set, output is
/// indented four spaces per nesting level. 64-bit integers are emitted as
/// quoted decimal strings (beyond the interoperable JSON number range) and
/// non-finite floats as quoted names, matching what the reverse direction
/// sniffs back out.
pub fn ltv_to_json<R: Read, W: Write>(reader: R, writer: W, pretty: bool) -> TranscodeResult<()> {
    let mut w = BufWriter::new(writer);
    let mut s = StreamDecoder::new(reader);
    let mut scratch = [0u8; 8];
    let mut first_print = true;

    loop {
        let d = match s.next()? {
            Some(d) => d,
            None => {
                w.flush()?;
                return Ok(());
            }
        };

        match d.role {
            Role::StructEnd => {
                if pretty {
                    indent(&mut w, d.depth)?;
                }
                w.write_all(b"}")?;
                first_print = false;
                continue;
            }
            Role::ListEnd => {
                if pretty {
                    indent(&mut w, d.depth)?;
                }
                w.write_all(b"]")?;
                first_print = false;
                continue;
            }
            _ => (),
        }

        if d.role == Role::StructValue {
            w.write_all(b":")?;
        } else if !d.first_element {
            w.write_all(b",")?;
        }

        if pretty && d.role != Role::StructValue && !first_print {
            indent(&mut w, d.depth)?;
        }

        match d.type_code {
            TypeCode::Nil => {
                w.write_all(b"null")?;
                first_print = false;
                continue;
            }
            TypeCode::Struct => {
                w.write_all(b"{")?;
                first_print = false;
                continue;
            }
            TypeCode::List => {
                w.write_all(b"[")?;
                first_print = false;
                continue;
            }
            TypeCode::String => {
                // Materialize (bounded by the decoder's value limit) so the
                // text can be JSON-escaped.
                match s.read_value(&d)? {
                    LtvValue::String(text) => {
                        w.write_all(serde_json::to_string(&text)?.as_bytes())?;
                    }
                    _ => unreachable!("string descriptor materializes a string"),
                }
                first_print = false;
                continue;
            }
            _ => (),
        }

        // Bool and numeric forms: single values print bare, vectors print
        // as JSON arrays, element by element off the stream.
        let type_size = d.type_code.size();
        let vector = d.size_code != ltv_core::SizeCode::Single;

        if vector {
            w.write_all(b"[")?;
        }

        let mut read = 0u64;
        while read < d.length {
            s.read_exact(&mut scratch[..type_size])?;
            read += type_size as u64;

            if read > type_size as u64 {
                w.write_all(b", ")?;
            }

            let chunk = &scratch[..type_size];
            match d.type_code {
                TypeCode::Bool => match chunk[0] {
                    0 => w.write_all(b"false")?,
                    _ => w.write_all(b"true")?,
                },
                TypeCode::U8 => write!(w, "{}", chunk[0])?,
                TypeCode::U16 => write!(w, "{}", u16::from_le_bytes([chunk[0], chunk[1]]))?,
                TypeCode::U32 => {
                    write!(w, "{}", u32::from_le_bytes(chunk.try_into().unwrap()))?
                }
                TypeCode::U64 => {
                    write!(w, "\"{}\"", u64::from_le_bytes(chunk.try_into().unwrap()))?
                }
                TypeCode::I8 => write!(w, "{}", chunk[0] as i8)?,
                TypeCode::I16 => write!(w, "{}", i16::from_le_bytes([chunk[0], chunk[1]]))?,
                TypeCode::I32 => {
                    write!(w, "{}", i32::from_le_bytes(chunk.try_into().unwrap()))?
                }
                TypeCode::I64 => {
                    write!(w, "\"{}\"", i64::from_le_bytes(chunk.try_into().unwrap()))?
                }
                TypeCode::F32 => {
                    write_float(&mut w, f32::from_le_bytes(chunk.try_into().unwrap()))?
                }
                TypeCode::F64 => {
                    write_float(&mut w, f64::from_le_bytes(chunk.try_into().unwrap()))?
                }
                _ => unreachable!("containers were handled above"),
            }
        }

        if vector {
            w.write_all(b"]")?;
        }
        first_print = false;
    }
}

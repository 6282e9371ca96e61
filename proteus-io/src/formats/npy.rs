use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, value},
    multi::separated_list0,
    sequence::{delimited, separated_pair, terminated, tuple},
    IResult,
};
use proteus_core::{EmbeddingMatrix, ProteusError, ProteusResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Element types the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpyDtype {
    F4,
    F8,
}

impl NpyDtype {
    pub fn size(&self) -> usize {
        match self {
            NpyDtype::F4 => 4,
            NpyDtype::F8 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

/// Decoded `.npy` header dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    pub dtype: NpyDtype,
    big_endian: bool,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderValue {
    Str(String),
    Bool(bool),
    Shape(Vec<usize>),
}

fn ws_char<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    delimited(multispace0, char(c), multispace0)
}

/// Parse a single- or double-quoted Python string literal
fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))(input)
}

/// Parse a Python tuple of non-negative integers, e.g. `(500, 128)` or `(7,)`
fn shape_tuple(input: &str) -> IResult<&str, Vec<usize>> {
    delimited(
        terminated(char('('), multispace0),
        terminated(
            separated_list0(ws_char(','), map_res(digit1, str::parse::<usize>)),
            tuple((multispace0, opt(char(',')), multispace0)),
        ),
        char(')'),
    )(input)
}

fn header_value(input: &str) -> IResult<&str, HeaderValue> {
    alt((
        map(quoted, |s| HeaderValue::Str(s.to_string())),
        value(HeaderValue::Bool(true), tag("True")),
        value(HeaderValue::Bool(false), tag("False")),
        map(shape_tuple, HeaderValue::Shape),
    ))(input)
}

fn header_dict(input: &str) -> IResult<&str, Vec<(&str, HeaderValue)>> {
    delimited(
        terminated(char('{'), multispace0),
        terminated(
            separated_list0(ws_char(','), separated_pair(quoted, ws_char(':'), header_value)),
            tuple((multispace0, opt(char(',')), multispace0)),
        ),
        char('}'),
    )(input)
}

fn parse_descr(descr: &str) -> ProteusResult<(NpyDtype, bool)> {
    let mut chars = descr.chars();
    let order = chars.next();
    let big_endian = match order {
        Some('<') => false,
        Some('>') => true,
        Some('=') | Some('|') => cfg!(target_endian = "big"),
        _ => return Err(ProteusError::Parse(format!("unsupported npy dtype '{}'", descr))),
    };
    let dtype = match chars.as_str() {
        "f4" => NpyDtype::F4,
        "f8" => NpyDtype::F8,
        _ => {
            return Err(ProteusError::Parse(format!(
                "unsupported npy dtype '{}' (expected a float32 or float64 array)",
                descr
            )))
        }
    };
    Ok((dtype, big_endian))
}

/// Parse the textual header dictionary of an `.npy` file
pub fn parse_header(text: &str) -> ProteusResult<NpyHeader> {
    let (_, entries) = header_dict(text.trim_end())
        .map_err(|e| ProteusError::Parse(format!("malformed npy header: {}", e)))?;

    let mut descr = None;
    let mut fortran_order = None;
    let mut shape = None;
    for (key, val) in entries {
        match (key, val) {
            ("descr", HeaderValue::Str(s)) => descr = Some(s),
            ("fortran_order", HeaderValue::Bool(b)) => fortran_order = Some(b),
            ("shape", HeaderValue::Shape(s)) => shape = Some(s),
            (other, _) => {
                return Err(ProteusError::Parse(format!(
                    "unexpected npy header entry '{}'",
                    other
                )))
            }
        }
    }

    let descr = descr.ok_or_else(|| ProteusError::Parse("npy header lacks 'descr'".into()))?;
    let (dtype, big_endian) = parse_descr(&descr)?;
    Ok(NpyHeader {
        dtype,
        big_endian,
        fortran_order: fortran_order.unwrap_or(false),
        shape: shape.ok_or_else(|| ProteusError::Parse("npy header lacks 'shape'".into()))?,
    })
}

/// Split raw file bytes into the decoded header and the data section
fn split_file(bytes: &[u8]) -> ProteusResult<(NpyHeader, &[u8])> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(ProteusError::Parse("not an npy file (bad magic)".into()));
    }
    let major = bytes[6];
    let (header_len, prelude) = match major {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(ProteusError::Parse("truncated npy header".into()));
            }
            (LittleEndian::read_u32(&bytes[8..12]) as usize, 12)
        }
        v => return Err(ProteusError::Parse(format!("unsupported npy format version {}", v))),
    };
    let end = prelude + header_len;
    if bytes.len() < end {
        return Err(ProteusError::Parse("truncated npy header".into()));
    }
    let text = std::str::from_utf8(&bytes[prelude..end])
        .map_err(|e| ProteusError::Parse(format!("npy header is not text: {}", e)))?;
    Ok((parse_header(text)?, &bytes[end..]))
}

/// Decode an in-memory `.npy` file holding a 2-D float array
pub fn decode_npy(bytes: &[u8]) -> ProteusResult<EmbeddingMatrix> {
    let (header, data) = split_file(bytes)?;
    let (rows, cols) = match header.shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => {
            return Err(ProteusError::Parse(format!(
                "expected a 2-D embedding array, found shape {:?}",
                other
            )))
        }
    };

    let (count, needed) = rows
        .checked_mul(cols)
        .and_then(|count| Some((count, count.checked_mul(header.dtype.size())?)))
        .ok_or_else(|| {
            ProteusError::Parse(format!("npy shape {:?} overflows the address space", header.shape))
        })?;
    if data.len() < needed {
        return Err(ProteusError::Parse(format!(
            "npy data section holds {} bytes, shape {:?} needs {}",
            data.len(),
            header.shape,
            needed
        )));
    }
    let data = &data[..needed];

    let endian = if header.big_endian { Endian::Big } else { Endian::Little };
    let mut values = vec![0f32; count];
    match (header.dtype, endian) {
        (NpyDtype::F4, Endian::Little) => LittleEndian::read_f32_into(data, &mut values),
        (NpyDtype::F4, Endian::Big) => BigEndian::read_f32_into(data, &mut values),
        (NpyDtype::F8, _) => {
            let mut wide = vec![0f64; count];
            if endian == Endian::Big {
                BigEndian::read_f64_into(data, &mut wide);
            } else {
                LittleEndian::read_f64_into(data, &mut wide);
            }
            for (dst, src) in values.iter_mut().zip(wide) {
                *dst = src as f32;
            }
        }
    }

    if header.fortran_order {
        // Column-major on disk; reorder into rows
        let mut row_major = vec![0f32; count];
        for c in 0..cols {
            for r in 0..rows {
                row_major[r * cols + c] = values[c * rows + r];
            }
        }
        values = row_major;
    }

    EmbeddingMatrix::new(rows, cols, values)
}

/// Load a 2-D float `.npy` file through a memory map
pub fn read_npy<P: AsRef<Path>>(path: P) -> ProteusResult<EmbeddingMatrix> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ProteusError::NotFound(format!("embeddings file {}", path.display()))
        }
        _ => ProteusError::Io(e),
    })?;
    if file.metadata()?.len() == 0 {
        return Err(ProteusError::Parse(format!("{} is empty", path.display())));
    }
    let mmap = unsafe { Mmap::map(&file)? };
    decode_npy(&mmap)
}

/// Write a matrix as a version 1.0 `.npy` file with the given element type
pub fn write_npy<P: AsRef<Path>>(
    path: P,
    matrix: &EmbeddingMatrix,
    dtype: NpyDtype,
) -> ProteusResult<()> {
    let descr = match dtype {
        NpyDtype::F4 => "<f4",
        NpyDtype::F8 => "<f8",
    };
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({}, {}), }}",
        descr,
        matrix.rows(),
        matrix.cols()
    );
    // Pad so the data section starts on a 64-byte boundary
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(MAGIC)?;
    out.write_all(&[1, 0])?;
    out.write_u16::<LittleEndian>(header.len() as u16)?;
    out.write_all(header.as_bytes())?;
    for &v in matrix.as_slice() {
        match dtype {
            NpyDtype::F4 => out.write_f32::<LittleEndian>(v)?,
            NpyDtype::F8 => out.write_f64::<LittleEndian>(v as f64)?,
        }
    }
    out.flush()?;
    Ok(())
}

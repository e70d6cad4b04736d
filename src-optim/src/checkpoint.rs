//! Fixed-width binary checkpoint records
//!
//! Every record starts with an 11 byte header:
//!
//! | bytes | field                          |
//! |-------|--------------------------------|
//! | 4     | magic `b"APID"`                |
//! | 2     | format version (u16)           |
//! | 1     | engine tag (1 = PSO, 2 = DE)   |
//! | 2     | population size (u16)          |
//! | 2     | dimensions (u16)               |
//!
//! followed by the engine state, field by field, little endian. Indices are
//! u32, reals f64, flags u8. For a given engine and shape the record size is
//! fixed, so a short or long blob is rejected before any field is read.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array1, Array2};
use std::io::{self, Cursor};

use crate::error::{CheckpointError, Result as OptimResult};
use crate::store::BlobStore;
use crate::TrialPhase;

pub const MAGIC: [u8; 4] = *b"APID";
pub const FORMAT_VERSION: u16 = 2;
pub const HEADER_LEN: usize = 11;

/// Which engine wrote a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineTag {
    Pso = 1,
    De = 2,
}

/// Engine state that can be persisted as a checkpoint record
pub trait Checkpoint: Sized {
    const TAG: EngineTag;

    /// Size in bytes of the record body (without header) for this shape
    fn body_len(population: usize, dimensions: usize) -> usize;

    fn write_body(&self, w: &mut RecordWriter) -> io::Result<()>;

    fn read_body(
        r: &mut RecordReader<'_>,
        population: usize,
        dimensions: usize,
    ) -> Result<Self, CheckpointError>;

    /// Total record size for this shape
    fn record_len(population: usize, dimensions: usize) -> usize {
        HEADER_LEN + Self::body_len(population, dimensions)
    }

    /// Encode the full record, header included
    fn encode(&self, population: usize, dimensions: usize) -> io::Result<Vec<u8>> {
        let mut w = RecordWriter::with_capacity(Self::record_len(population, dimensions));
        w.header(Self::TAG, population, dimensions)?;
        self.write_body(&mut w)?;
        Ok(w.into_inner())
    }

    /// Decode a record written for the same engine and shape
    fn decode(bytes: &[u8], population: usize, dimensions: usize) -> Result<Self, CheckpointError> {
        let expected = Self::record_len(population, dimensions);
        if bytes.len() < HEADER_LEN {
            return Err(CheckpointError::SizeMismatch { expected, found: bytes.len() });
        }
        let mut r = RecordReader::new(bytes);
        r.header(Self::TAG, population, dimensions)?;
        if bytes.len() != expected {
            return Err(CheckpointError::SizeMismatch { expected, found: bytes.len() });
        }
        Self::read_body(&mut r, population, dimensions)
    }
}

/// Replace the blob `name` with the encoded record
///
/// The record is encoded before the old blob is removed, so an encode
/// failure leaves the previous checkpoint in place.
pub(crate) fn save_record<C, S>(
    store: &mut S,
    name: &str,
    state: &C,
    population: usize,
    dimensions: usize,
) -> OptimResult<()>
where
    C: Checkpoint,
    S: BlobStore + ?Sized,
{
    let bytes = state.encode(population, dimensions)?;
    if store.exists(name) {
        store.remove(name)?;
    }
    store.write(name, &bytes)?;
    Ok(())
}

/// Read and decode the blob `name`; `Ok(None)` when it does not exist
pub(crate) fn load_record<C, S>(
    store: &S,
    name: &str,
    population: usize,
    dimensions: usize,
) -> OptimResult<Option<C>>
where
    C: Checkpoint,
    S: BlobStore + ?Sized,
{
    if !store.exists(name) {
        return Ok(None);
    }
    let bytes = store.read(name)?;
    Ok(Some(C::decode(&bytes, population, dimensions)?))
}

/// Reject a decoded cursor outside `0..limit`
pub(crate) fn check_index(
    field: &'static str,
    value: usize,
    limit: usize,
) -> Result<usize, CheckpointError> {
    if value < limit {
        Ok(value)
    } else {
        Err(CheckpointError::IndexOutOfRange { field, value, limit })
    }
}

/// Little-endian field writer
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    fn with_capacity(n: usize) -> Self {
        Self { buf: Vec::with_capacity(n) }
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn header(&mut self, tag: EngineTag, population: usize, dimensions: usize) -> io::Result<()> {
        self.buf.extend_from_slice(&MAGIC);
        self.buf.write_u16::<LittleEndian>(FORMAT_VERSION)?;
        self.buf.write_u8(tag as u8)?;
        self.buf.write_u16::<LittleEndian>(to_u16(population)?)?;
        self.buf.write_u16::<LittleEndian>(to_u16(dimensions)?)
    }

    pub fn index(&mut self, v: usize) -> io::Result<()> {
        let v = u32::try_from(v).map_err(|_| io::Error::other("index does not fit in u32"))?;
        self.buf.write_u32::<LittleEndian>(v)
    }

    pub fn real(&mut self, v: f64) -> io::Result<()> {
        self.buf.write_f64::<LittleEndian>(v)
    }

    pub fn flag(&mut self, v: bool) -> io::Result<()> {
        self.buf.write_u8(u8::from(v))
    }

    pub fn phase(&mut self, v: TrialPhase) -> io::Result<()> {
        self.buf.write_u8(v as u8)
    }

    pub fn vector(&mut self, v: &Array1<f64>) -> io::Result<()> {
        v.iter().try_for_each(|&x| self.real(x))
    }

    /// Row-major, as laid out in memory
    pub fn matrix(&mut self, m: &Array2<f64>) -> io::Result<()> {
        m.rows().into_iter().try_for_each(|row| row.iter().try_for_each(|&x| self.real(x)))
    }
}

fn to_u16(v: usize) -> io::Result<u16> {
    u16::try_from(v).map_err(|_| io::Error::other("shape does not fit in u16"))
}

/// Little-endian field reader over a size-checked record
pub struct RecordReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> RecordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(bytes) }
    }

    fn header(
        &mut self,
        tag: EngineTag,
        population: usize,
        dimensions: usize,
    ) -> Result<(), CheckpointError> {
        let mut magic = [0u8; 4];
        for b in magic.iter_mut() {
            *b = self.byte()?;
        }
        if magic != MAGIC {
            return Err(CheckpointError::BadMagic { found: magic });
        }
        let version = self.cursor.read_u16::<LittleEndian>().map_err(|_| self.eof())?;
        if version != FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                expected: FORMAT_VERSION,
                found: version,
            });
        }
        let found_tag = self.byte()?;
        if found_tag != tag as u8 {
            return Err(CheckpointError::EngineMismatch { expected: tag as u8, found: found_tag });
        }
        let pop = self.cursor.read_u16::<LittleEndian>().map_err(|_| self.eof())? as usize;
        let dims = self.cursor.read_u16::<LittleEndian>().map_err(|_| self.eof())? as usize;
        if pop != population || dims != dimensions {
            return Err(CheckpointError::ShapeMismatch {
                expected_population: population,
                expected_dimensions: dimensions,
                population: pop,
                dimensions: dims,
            });
        }
        Ok(())
    }

    fn eof(&self) -> CheckpointError {
        let len = self.cursor.get_ref().len();
        CheckpointError::SizeMismatch { expected: len + 1, found: len }
    }

    fn byte(&mut self) -> Result<u8, CheckpointError> {
        self.cursor.read_u8().map_err(|_| self.eof())
    }

    pub fn index(&mut self) -> Result<usize, CheckpointError> {
        Ok(self.cursor.read_u32::<LittleEndian>().map_err(|_| self.eof())? as usize)
    }

    pub fn real(&mut self) -> Result<f64, CheckpointError> {
        self.cursor.read_f64::<LittleEndian>().map_err(|_| self.eof())
    }

    /// Any non-zero byte reads as `true`
    pub fn flag(&mut self) -> Result<bool, CheckpointError> {
        Ok(self.byte()? != 0)
    }

    pub fn phase(&mut self) -> Result<TrialPhase, CheckpointError> {
        let tag = self.byte()?;
        TrialPhase::from_tag(tag).ok_or(CheckpointError::InvalidPhase(tag))
    }

    pub fn vector(&mut self, len: usize) -> Result<Array1<f64>, CheckpointError> {
        let mut v = Array1::zeros(len);
        for x in v.iter_mut() {
            *x = self.real()?;
        }
        Ok(v)
    }

    pub fn matrix(&mut self, rows: usize, cols: usize) -> Result<Array2<f64>, CheckpointError> {
        let mut m = Array2::zeros((rows, cols));
        for x in m.iter_mut() {
            *x = self.real()?;
        }
        Ok(m)
    }
}

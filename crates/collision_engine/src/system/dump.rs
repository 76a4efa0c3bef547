//! Binary dump format for collision worlds
//!
//! A dump is a short fixed header followed by a `bincode` payload:
//!
//! ```text
//! magic    4 bytes  "CSYS"
//! version  u32, little-endian
//! payload  bincode (standard config) encoding of Vec<ShapeRecord>
//! ```
//!
//! Every restored shape is validated before it is handed back.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collision::{Shape, ShapeGeometry, ShapeValidationError};
use crate::foundation::math::{RigidTransform, Vec3};

/// File signature
pub const DUMP_MAGIC: [u8; 4] = *b"CSYS";

/// Current format version
pub const DUMP_VERSION: u32 = 2;

const HEADER_LEN: usize = DUMP_MAGIC.len() + std::mem::size_of::<u32>();

/// Dump and restore failures
#[derive(thiserror::Error, Debug)]
pub enum DumpError {
    /// Underlying IO failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Dumps never overwrite
    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),

    /// Restore source is missing
    #[error("dump file {0} does not exist")]
    NotFound(PathBuf),

    /// The file does not start with the signature
    #[error("not a collision dump (bad magic)")]
    BadMagic,

    /// Written by a newer or unknown format
    #[error("unsupported dump version {0}")]
    UnsupportedVersion(u32),

    /// The file ended early
    #[error("dump file is truncated")]
    Truncated,

    /// Bytes left over after the shape records
    #[error("{0} unexpected bytes after the shape records")]
    TrailingData(usize),

    /// Serializing the shape records failed
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// The payload is not a valid list of shape records
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// A restored shape failed validation
    #[error("shape {index} in dump is invalid: {source}")]
    InvalidShape {
        /// Position of the shape in the file
        index: usize,
        /// What was wrong with it
        source: ShapeValidationError,
    },
}

/// Everything needed to rebuild one shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ShapeRecord {
    geometry: ShapeGeometry,
    object_to_world: RigidTransform,
    user_flags: u64,
    debug_color: Vec3,
}

impl From<&Shape> for ShapeRecord {
    fn from(shape: &Shape) -> Self {
        Self {
            geometry: shape.geometry().clone(),
            object_to_world: *shape.object_to_world(),
            user_flags: shape.user_flags(),
            debug_color: shape.debug_color(),
        }
    }
}

impl From<ShapeRecord> for Shape {
    fn from(record: ShapeRecord) -> Self {
        Shape::new(record.geometry)
            .with_transform(record.object_to_world)
            .with_user_flags(record.user_flags)
            .with_debug_color(record.debug_color)
    }
}

/// Write every shape to `path`, which must not exist yet
pub fn dump_to_path<'a, I>(path: &Path, shapes: I) -> Result<usize, DumpError>
where
    I: IntoIterator<Item = &'a Shape>,
{
    let records: Vec<ShapeRecord> = shapes.into_iter().map(ShapeRecord::from).collect();
    let bytes = encode_records(&records)?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => DumpError::AlreadyExists(path.to_path_buf()),
            _ => DumpError::Io(e),
        })?;
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(records.len())
}

/// Read every shape from `path`
pub fn restore_from_path(path: &Path) -> Result<Vec<Shape>, DumpError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DumpError::NotFound(path.to_path_buf()),
        _ => DumpError::Io(e),
    })?;
    decode_shapes(&bytes)
}

/// Serialize shapes into a complete dump image
pub fn encode_shapes<'a, I>(shapes: I) -> Result<Vec<u8>, DumpError>
where
    I: IntoIterator<Item = &'a Shape>,
{
    let records: Vec<ShapeRecord> = shapes.into_iter().map(ShapeRecord::from).collect();
    encode_records(&records)
}

/// Parse and validate a complete dump image
pub fn decode_shapes(bytes: &[u8]) -> Result<Vec<Shape>, DumpError> {
    if bytes.len() < HEADER_LEN {
        return Err(DumpError::Truncated);
    }
    let (magic, rest) = bytes.split_at(DUMP_MAGIC.len());
    if magic != DUMP_MAGIC {
        return Err(DumpError::BadMagic);
    }
    let (version, payload) = rest.split_at(std::mem::size_of::<u32>());
    let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
    if version != DUMP_VERSION {
        return Err(DumpError::UnsupportedVersion(version));
    }

    let (records, read): (Vec<ShapeRecord>, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(|e| match e {
            bincode::error::DecodeError::UnexpectedEnd { .. } => DumpError::Truncated,
            other => DumpError::Decode(other),
        })?;
    if read != payload.len() {
        return Err(DumpError::TrailingData(payload.len() - read));
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let shape = Shape::from(record);
            shape
                .validate()
                .map_err(|source| DumpError::InvalidShape { index, source })?;
            Ok(shape)
        })
        .collect()
}

fn encode_records(records: &[ShapeRecord]) -> Result<Vec<u8>, DumpError> {
    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend_from_slice(&DUMP_MAGIC);
    bytes.extend_from_slice(&DUMP_VERSION.to_le_bytes());
    bytes.extend(bincode::serde::encode_to_vec(records, bincode::config::standard())?);
    Ok(bytes)
}

//! On-disk layout of a persisted index.
//!
//! A directory holds one `metadata.json` sidecar and the `vectors-<hash>.bin`
//! file it names. The binary file is `SKBV`, a `u32` format version, a `u32`
//! dimension, a `u64` count, then `count * dim` little-endian `f32`s.
//!
//! Both files are written to temporaries in the same directory and renamed
//! into place, vectors first. Renaming the sidecar is the commit point: until
//! it happens the previous sidecar still names the previous vectors file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use supportkb_core::error::Error;
use supportkb_core::types::DocumentMetadata;

pub const SIDECAR_FILE: &str = "metadata.json";
const MAGIC: &[u8; 4] = b"SKBV";
const FORMAT_VERSION: u32 = 1;
const VECTORS_PREFIX: &str = "vectors-";
const VECTORS_SUFFIX: &str = ".bin";

/// JSON record stored next to the vectors file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    pub documents: Vec<String>,
    pub metadata: Vec<DocumentMetadata>,
    pub model_name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub total_documents: usize,
    pub dimension: usize,
    pub vectors_file: String,
    #[serde(default)]
    pub kb_fingerprint: Option<String>,
}

/// A sidecar plus its decoded, row-major vectors.
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub sidecar: Sidecar,
    pub vectors: Vec<f32>,
}

/// Writes `sidecar` and `vectors` under `dir` and removes superseded vector
/// files. The `vectors_file` and `total_documents` fields are filled in here.
pub fn write(dir: &Path, mut sidecar: Sidecar, vectors: &[f32]) -> Result<Sidecar> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let count = sidecar.documents.len();
    if sidecar.metadata.len() != count || vectors.len() != count * sidecar.dimension {
        return Err(Error::IndexFormat(format!(
            "refusing to persist inconsistent index: {} documents, {} metadata, {} floats at dim {}",
            count,
            sidecar.metadata.len(),
            vectors.len(),
            sidecar.dimension
        ))
        .into());
    }

    let bytes = encode_vectors(sidecar.dimension, count, vectors)?;
    let hash = blake3::hash(&bytes).to_hex();
    let vectors_file = format!("{VECTORS_PREFIX}{}{VECTORS_SUFFIX}", &hash.as_str()[..16]);

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(&vectors_file))?;

    sidecar.vectors_file = vectors_file.clone();
    sidecar.total_documents = count;
    let json = serde_json::to_vec_pretty(&sidecar)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(SIDECAR_FILE))?;
    debug!(dir = %dir.display(), file = %vectors_file, count, "index committed");

    remove_superseded(dir, &vectors_file);
    Ok(sidecar)
}

fn remove_superseded(dir: &Path, keep: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not list index directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(VECTORS_PREFIX) && name.ends_with(VECTORS_SUFFIX) && name != keep {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(file = %name, error = %e, "could not remove superseded vectors file");
            }
        }
    }
}

/// Reads the committed index under `dir`. `Ok(None)` when nothing was ever
/// committed there.
pub fn read(dir: &Path) -> Result<Option<PersistedIndex>> {
    let sidecar_path = dir.join(SIDECAR_FILE);
    if !sidecar_path.exists() {
        return Ok(None);
    }
    let raw = fs::read(&sidecar_path).with_context(|| format!("reading {}", sidecar_path.display()))?;
    let sidecar: Sidecar = serde_json::from_slice(&raw)
        .map_err(|e| Error::IndexFormat(format!("{}: {}", sidecar_path.display(), e)))?;

    let name = sidecar.vectors_file.as_str();
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(Error::IndexFormat(format!("invalid vectors file name '{name}'")).into());
    }
    let bytes = fs::read(dir.join(name)).with_context(|| format!("reading vectors file {name}"))?;
    let (dim, count, vectors) = decode_vectors(&bytes)?;

    let n = sidecar.documents.len();
    if dim != sidecar.dimension
        || count != n
        || sidecar.metadata.len() != n
        || sidecar.total_documents != n
    {
        return Err(Error::IndexFormat(format!(
            "count mismatch: {} documents, {} metadata, total_documents {}, {} vectors (dim {} vs {})",
            n,
            sidecar.metadata.len(),
            sidecar.total_documents,
            count,
            dim,
            sidecar.dimension
        ))
        .into());
    }
    Ok(Some(PersistedIndex { sidecar, vectors }))
}

fn encode_vectors(dim: usize, count: usize, vectors: &[f32]) -> Result<Vec<u8>> {
    let dim32 = u32::try_from(dim).map_err(|_| Error::IndexFormat(format!("dimension {dim} too large")))?;
    let mut bytes = Vec::with_capacity(20 + std::mem::size_of_val(vectors));
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dim32.to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for &value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

fn decode_vectors(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    let mut r = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(format_err)?;
    if &magic != MAGIC {
        return Err(Error::IndexFormat("bad magic in vectors file".into()).into());
    }
    let version = read_u32(&mut r)?;
    if version != FORMAT_VERSION {
        return Err(Error::IndexFormat(format!("unsupported vectors format version {version}")).into());
    }
    let dim = read_u32(&mut r)? as usize;
    let count = usize::try_from(read_u64(&mut r)?).map_err(|_| Error::IndexFormat("count overflows usize".into()))?;

    let body = &bytes[r.position() as usize..];
    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::IndexFormat("vectors size overflows".into()))?;
    if body.len() != expected {
        return Err(Error::IndexFormat(format!(
            "vectors file truncated: expected {expected} bytes, got {}",
            body.len()
        ))
        .into());
    }
    let mut vectors = Vec::with_capacity(count * dim);
    for chunk in body.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            return Err(Error::IndexFormat("vectors file contains non-finite values".into()).into());
        }
        vectors.push(value);
    }
    Ok((dim, count, vectors))
}

fn format_err(e: std::io::Error) -> Error {
    Error::IndexFormat(e.to_string())
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(format_err)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(format_err)?;
    Ok(u64::from_le_bytes(buf))
}

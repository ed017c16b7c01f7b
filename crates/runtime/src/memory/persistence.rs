//! Typed binary + JSON sidecar persistence for [`super::VectorMemoryStore`].
//!
//! The on-disk format deliberately avoids any generic object deserialization:
//! the embedding matrix is a flat sequence of little-endian `f32`s behind a
//! fixed header, and record metadata is a plain JSON array. Writes go
//! through a temp file in the same directory followed by a rename so a
//! crash mid-write never leaves a truncated store in place.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{MemoryError, MemoryId, MemoryRecord};

const MAGIC: &[u8; 4] = b"PAGM";
const FORMAT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct RecordMeta {
    id: MemoryId,
    text: String,
    created_at: u64,
    tags: HashMap<String, String>,
}

fn sidecar_path(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".meta.json");
    os.into()
}

pub fn save(path: &Path, dimension: usize, records: &[MemoryRecord]) -> Result<(), MemoryError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut bin = Vec::with_capacity(9 + records.len() * dimension * 4);
    bin.extend_from_slice(MAGIC);
    bin.push(FORMAT_VERSION);
    bin.extend_from_slice(&(dimension as u32).to_le_bytes());
    bin.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for record in records {
        for value in &record.embedding {
            bin.extend_from_slice(&value.to_le_bytes());
        }
    }
    write_atomic(path, &bin)?;

    let metas: Vec<RecordMeta> = records
        .iter()
        .map(|r| RecordMeta {
            id: r.id,
            text: r.text.clone(),
            created_at: r.created_at,
            tags: r.tags.clone(),
        })
        .collect();
    let json = serde_json::to_vec_pretty(&metas)
        .map_err(|e| MemoryError::Serialization(e.to_string()))?;
    write_atomic(&sidecar_path(path), &json)?;

    Ok(())
}

pub fn load(
    path: &Path,
    expected_dimension: Option<usize>,
) -> Result<(Option<usize>, Vec<MemoryRecord>), MemoryError> {
    let mut file = std::fs::File::open(path)?;
    let mut bin = Vec::new();
    file.read_to_end(&mut bin)?;

    if bin.len() < 13 || &bin[0..4] != MAGIC {
        return Err(MemoryError::CorruptStore("bad magic header".into()));
    }
    let version = bin[4];
    if version != FORMAT_VERSION {
        return Err(MemoryError::CorruptStore(format!(
            "unsupported format version {version}"
        )));
    }
    let dimension = u32::from_le_bytes(bin[5..9].try_into().unwrap()) as usize;
    let count = u32::from_le_bytes(bin[9..13].try_into().unwrap()) as usize;

    if let Some(expected) = expected_dimension {
        if dimension != 0 && expected != dimension {
            return Err(MemoryError::DimensionMismatch {
                expected,
                got: dimension,
            });
        }
    }

    let floats_start = 13;
    let expected_len = floats_start + count * dimension * 4;
    if bin.len() != expected_len {
        return Err(MemoryError::CorruptStore(
            "embedding matrix length does not match header".into(),
        ));
    }

    let mut embeddings = Vec::with_capacity(count);
    let mut cursor = floats_start;
    for _ in 0..count {
        let mut vec = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            let bytes: [u8; 4] = bin[cursor..cursor + 4].try_into().unwrap();
            vec.push(f32::from_le_bytes(bytes));
            cursor += 4;
        }
        embeddings.push(vec);
    }

    let sidecar = sidecar_path(path);
    let json = std::fs::read_to_string(&sidecar)?;
    let metas: Vec<RecordMeta> =
        serde_json::from_str(&json).map_err(|e| MemoryError::Serialization(e.to_string()))?;
    if metas.len() != embeddings.len() {
        return Err(MemoryError::CorruptStore(
            "sidecar record count does not match embedding matrix".into(),
        ));
    }

    let records = metas
        .into_iter()
        .zip(embeddings)
        .map(|(meta, embedding)| MemoryRecord {
            id: meta.id,
            text: meta.text,
            embedding,
            created_at: meta.created_at,
            tags: meta.tags,
        })
        .collect();

    let dim = if count > 0 { Some(dimension) } else { None };
    Ok((dim, records))
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), MemoryError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| MemoryError::Io(e.error))?;
    Ok(())
}

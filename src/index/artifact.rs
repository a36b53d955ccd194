//! On-disk index artifact
//!
//! Little-endian layout:
//!
//! ```text
//! magic      8 bytes   "UALRIDX\0"
//! version    u32       1
//! dimension  u32
//! count      u64
//! build_id   16 bytes  UUID shared with the metadata artifact
//! rows       count x (id: u64, dimension x f32)
//! digest     32 bytes  BLAKE3 of everything above
//! ```

use super::IndexError;
use ahash::AHashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const MAGIC: &[u8; 8] = b"UALRIDX\0";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 8 + 16;
const DIGEST_LEN: usize = 32;

/// Document vectors plus the build id that ties them to a metadata artifact
#[derive(Debug, Clone)]
pub struct IndexArtifact {
    dimension: usize,
    build_id: Uuid,
    ids: Vec<u64>,
    /// Row-major, `ids.len() * dimension` values
    vectors: Vec<f32>,
}

impl IndexArtifact {
    /// Create an artifact with a fresh build id
    pub fn new(dimension: usize, rows: Vec<(u64, Vec<f32>)>) -> Result<Self, IndexError> {
        Self::with_build_id(dimension, Uuid::new_v4(), rows)
    }

    pub fn with_build_id(
        dimension: usize,
        build_id: Uuid,
        rows: Vec<(u64, Vec<f32>)>,
    ) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Build(
                "Dimension must be greater than 0".to_string(),
            ));
        }

        let mut seen = AHashSet::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len() * dimension);

        for (id, vector) in rows {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::Build(format!(
                    "Vector for document {} has non-finite values",
                    id
                )));
            }
            if !seen.insert(id) {
                return Err(IndexError::Build(format!("Duplicate document id {}", id)));
            }
            ids.push(id);
            vectors.extend_from_slice(&vector);
        }

        Ok(Self {
            dimension,
            build_id,
            ids,
            vectors,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Vector of the `row`-th document in file order
    pub fn row(&self, row: usize) -> &[f32] {
        &self.vectors[row * self.dimension..(row + 1) * self.dimension]
    }

    pub fn into_parts(self) -> (Vec<u64>, Vec<f32>) {
        (self.ids, self.vectors)
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(HEADER_LEN + self.ids.len() * (8 + self.dimension * 4) + DIGEST_LEN);

        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        buf.extend_from_slice(&(self.ids.len() as u64).to_le_bytes());
        buf.extend_from_slice(self.build_id.as_bytes());

        for (row, id) in self.ids.iter().enumerate() {
            buf.extend_from_slice(&id.to_le_bytes());
            for value in self.row(row) {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }

        let digest = blake3::hash(&buf);
        buf.extend_from_slice(digest.as_bytes());
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN + DIGEST_LEN {
            return Err(IndexError::Format(format!(
                "File too short ({} bytes)",
                bytes.len()
            )));
        }

        let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);
        if blake3::hash(body).as_bytes() != digest {
            return Err(IndexError::Format("Checksum mismatch".to_string()));
        }

        let mut reader = Reader { bytes: body, pos: 0 };

        if reader.take(8)? != MAGIC {
            return Err(IndexError::Format("Not an index artifact".to_string()));
        }
        let version = reader.u32()?;
        if version != FORMAT_VERSION {
            return Err(IndexError::Format(format!(
                "Unsupported format version {}",
                version
            )));
        }

        let dimension = reader.u32()? as usize;
        let count = reader.u64()? as usize;
        let build_id = Uuid::from_slice(reader.take(16)?)
            .map_err(|e| IndexError::Format(e.to_string()))?;

        let expected = dimension
            .checked_mul(4)
            .and_then(|row| row.checked_add(8))
            .and_then(|row| count.checked_mul(row))
            .and_then(|rows| rows.checked_add(HEADER_LEN))
            .ok_or_else(|| IndexError::Format("Row count overflow".to_string()))?;
        if body.len() != expected {
            return Err(IndexError::Format(format!(
                "Expected {} bytes for {} rows of dimension {}, found {}",
                expected,
                count,
                dimension,
                body.len()
            )));
        }

        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            let id = reader.u64()?;
            let mut vector = Vec::with_capacity(dimension);
            for _ in 0..dimension {
                vector.push(reader.f32()?);
            }
            rows.push((id, vector));
        }

        Self::with_build_id(dimension, build_id, rows).map_err(|e| match e {
            IndexError::Build(message) => IndexError::Format(message),
            other => other,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], IndexError> {
        let end = self.pos + len;
        if end > self.bytes.len() {
            return Err(IndexError::Format("Unexpected end of file".to_string()));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], IndexError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, IndexError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, IndexError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, IndexError> {
        Ok(f32::from_le_bytes(self.array()?))
    }
}

/// Write an index artifact atomically (temp file, then rename)
pub fn write_index(path: &Path, artifact: &IndexArtifact) -> Result<(), IndexError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to create index directory: {}", parent.display()),
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| IndexError::Io {
        source: e,
        context: format!("Failed to create temp index file: {}", temp_path.display()),
    })?;
    file.write_all(&artifact.encode())
        .and_then(|_| file.sync_all())
        .map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to write index file: {}", temp_path.display()),
        })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| IndexError::Io {
        source: e,
        context: format!(
            "Failed to rename temp index to final location: {} -> {}",
            temp_path.display(),
            path.display()
        ),
    })?;

    tracing::debug!(
        "Wrote index artifact {} ({} vectors, {}D)",
        path.display(),
        artifact.len(),
        artifact.dimension()
    );
    Ok(())
}

/// Read and verify an index artifact
pub fn read_index(path: &Path) -> Result<IndexArtifact, IndexError> {
    let bytes = fs::read(path).map_err(|e| IndexError::Io {
        source: e,
        context: format!("Failed to read index file: {}", path.display()),
    })?;
    IndexArtifact::decode(&bytes)
        .map_err(|e| match e {
            IndexError::Format(message) => {
                IndexError::Format(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
}

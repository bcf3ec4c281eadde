//! Flat L2 vector index with its aligned passage list
//!
//! Vector `i` always belongs to passage `i`. The index is exhaustive: every
//! search scores every vector by squared Euclidean distance.
//!
//! ## Persisted format
//!
//! `<id>.index` is little-endian binary:
//!
//! ```text
//! magic "DQIX" | u32 version | u32 dimension | u64 count | count * dimension f32
//! ```
//!
//! `<id>.passages` is a JSON document `{ version, created_at, count, passages }`.
//! The passage file is committed first and the index file last, so a session
//! whose index file exists is complete.

use std::cmp::Ordering;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::device::ComputeDevice;
use super::error::{DocQaError, DocQaResult};
use super::session::SessionPaths;
use super::types::Neighbor;

const INDEX_MAGIC: &[u8; 4] = b"DQIX";
const INDEX_FORMAT_VERSION: u32 = 1;
const INDEX_HEADER_LEN: usize = 4 + 4 + 4 + 8;
const PASSAGES_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PassageFile {
    version: u32,
    #[serde(default)]
    created_at: Option<String>,
    count: usize,
    passages: Vec<String>,
}

/// One session's vector index and passages
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStore {
    dimension: usize,
    /// Row-major `len() * dimension` values
    vectors: Vec<f32>,
    passages: Vec<String>,
}

impl IndexStore {
    /// Build a flat index; `vectors[i]` must embed `passages[i]`
    pub fn build(vectors: Vec<Vec<f32>>, passages: Vec<String>) -> DocQaResult<Self> {
        if vectors.len() != passages.len() {
            return Err(DocQaError::InvariantViolation(format!(
                "{} vectors for {} passages",
                vectors.len(),
                passages.len()
            )));
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 && !vectors.is_empty() {
            return Err(DocQaError::InvariantViolation(
                "vectors have zero dimensions".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for (i, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(DocQaError::InvariantViolation(format!(
                    "vector {} has {} dimensions, expected {}",
                    i,
                    vector.len(),
                    dimension
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(DocQaError::InvariantViolation(format!(
                    "vector {} contains NaN or Infinity",
                    i
                )));
            }
            flat.extend_from_slice(&vector);
        }

        Ok(Self {
            dimension,
            vectors: flat,
            passages,
        })
    }

    /// Build with the index materialized on `device` for the duration of the build
    pub fn build_on(
        device: &dyn ComputeDevice,
        vectors: Vec<Vec<f32>>,
        passages: Vec<String>,
    ) -> DocQaResult<Self> {
        let bytes = vectors.iter().map(|v| v.len()).sum::<usize>() * std::mem::size_of::<f32>();
        let _lease = device.acquire(bytes)?;
        Self::build(vectors, passages)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    pub fn passage(&self, index: usize) -> Option<&str> {
        self.passages.get(index).map(String::as_str)
    }

    /// Device memory needed to hold the vectors
    pub fn footprint_bytes(&self) -> usize {
        self.vectors.len() * std::mem::size_of::<f32>()
    }

    fn vector(&self, index: usize) -> &[f32] {
        &self.vectors[index * self.dimension..(index + 1) * self.dimension]
    }

    /// The `min(k, len())` nearest passages by ascending squared L2 distance.
    /// Equal distances are ordered by lower passage index.
    pub fn search(&self, query: &[f32], k: usize) -> DocQaResult<Vec<Neighbor>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(DocQaError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(DocQaError::InvariantViolation(
                "query vector contains NaN or Infinity".to_string(),
            ));
        }

        let mut hits: Vec<Neighbor> = (0..self.len())
            .map(|i| Neighbor {
                passage_index: i,
                distance: squared_l2(query, self.vector(i)),
            })
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank);
            hits.truncate(k);
        }
        hits.sort_by(rank);

        Ok(hits)
    }

    /// Search with the index materialized on `device`; the lease ends with the call
    pub fn search_on(
        &self,
        device: &dyn ComputeDevice,
        query: &[f32],
        k: usize,
    ) -> DocQaResult<Vec<Neighbor>> {
        let _lease = device.acquire(self.footprint_bytes())?;
        self.search(query, k)
    }

    /// Write both artifacts under the session's key
    pub async fn persist(&self, paths: &SessionPaths) -> DocQaResult<()> {
        if let Some(dir) = paths.dir() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let passage_file = PassageFile {
            version: PASSAGES_FORMAT_VERSION,
            created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            count: self.passages.len(),
            passages: self.passages.clone(),
        };
        let passages_json = serde_json::to_vec(&passage_file)
            .map_err(|e| DocQaError::InvariantViolation(format!("passage encoding: {}", e)))?;

        // Index last: its presence marks the session as committed
        write_atomic(&paths.passages, &passages_json).await?;
        if let Err(e) = write_atomic(&paths.index, &self.encode_index()).await {
            let _ = tokio::fs::remove_file(&paths.passages).await;
            return Err(e);
        }

        log::debug!(
            "Persisted session {} ({} vectors) to {}",
            paths.session_id,
            self.len(),
            paths.index.display()
        );
        Ok(())
    }

    /// Read both artifacts back
    pub async fn load(paths: &SessionPaths) -> DocQaResult<Self> {
        let session_id = paths.session_id.to_string();

        let index_bytes = match tokio::fs::read(&paths.index).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocQaError::NotFound { session_id });
            }
            Err(e) => {
                return Err(DocQaError::corrupt(
                    session_id,
                    format!("index file unreadable: {}", e),
                ));
            }
        };
        let (dimension, count, vectors) = decode_index(&session_id, &index_bytes)?;

        let passages_bytes = match tokio::fs::read(&paths.passages).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocQaError::corrupt(session_id, "passage list is missing"));
            }
            Err(e) => {
                return Err(DocQaError::corrupt(
                    session_id,
                    format!("passage list unreadable: {}", e),
                ));
            }
        };
        let passages = decode_passages(&session_id, &passages_bytes)?;

        if passages.len() != count {
            return Err(DocQaError::corrupt(
                session_id,
                format!("index holds {} vectors but {} passages", count, passages.len()),
            ));
        }

        Ok(Self {
            dimension,
            vectors,
            passages,
        })
    }

    fn encode_index(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(INDEX_HEADER_LEN + self.footprint_bytes());
        bytes.extend_from_slice(INDEX_MAGIC);
        bytes.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.vectors {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.passage_index.cmp(&b.passage_index))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn decode_index(session_id: &str, bytes: &[u8]) -> DocQaResult<(usize, usize, Vec<f32>)> {
    if bytes.len() < INDEX_HEADER_LEN || &bytes[..4] != INDEX_MAGIC {
        return Err(DocQaError::corrupt(session_id, "index file has no DQIX header"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != INDEX_FORMAT_VERSION {
        return Err(DocQaError::UnsupportedFormat {
            artifact: "index",
            found: version,
            supported: INDEX_FORMAT_VERSION,
        });
    }

    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = usize::try_from(u64::from_le_bytes(count_bytes))
        .map_err(|_| DocQaError::corrupt(session_id, "vector count overflows"))?;

    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
        .ok_or_else(|| DocQaError::corrupt(session_id, "index size overflows"))?;
    let body = &bytes[INDEX_HEADER_LEN..];
    if body.len() != expected_len {
        return Err(DocQaError::corrupt(
            session_id,
            format!(
                "index body is {} bytes, expected {} for {}x{}",
                body.len(),
                expected_len,
                count,
                dimension
            ),
        ));
    }
    if count > 0 && dimension == 0 {
        return Err(DocQaError::corrupt(session_id, "index has zero dimensions"));
    }

    let vectors: Vec<f32> = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if let Some(pos) = vectors.iter().position(|v| !v.is_finite()) {
        return Err(DocQaError::corrupt(
            session_id,
            format!("vector {} contains NaN or Infinity", pos / dimension),
        ));
    }

    Ok((dimension, count, vectors))
}

fn decode_passages(session_id: &str, bytes: &[u8]) -> DocQaResult<Vec<String>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| DocQaError::corrupt(session_id, format!("passage list: {}", e)))?;

    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| DocQaError::corrupt(session_id, "passage list has no version"))?;
    if version != u64::from(PASSAGES_FORMAT_VERSION) {
        return Err(DocQaError::UnsupportedFormat {
            artifact: "passages",
            found: u32::try_from(version).unwrap_or(u32::MAX),
            supported: PASSAGES_FORMAT_VERSION,
        });
    }

    let file: PassageFile = serde_json::from_value(value)
        .map_err(|e| DocQaError::corrupt(session_id, format!("passage list: {}", e)))?;
    if file.count != file.passages.len() {
        return Err(DocQaError::corrupt(
            session_id,
            format!(
                "passage list declares {} entries but holds {}",
                file.count,
                file.passages.len()
            ),
        ));
    }

    Ok(file.passages)
}

/// Write to a temp file, fsync, then rename into place
async fn write_atomic(path: &Path, bytes: &[u8]) -> DocQaResult<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(DocQaError::Io(e));
    }
    Ok(())
}

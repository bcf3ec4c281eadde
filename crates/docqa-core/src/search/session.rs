//! Session identifiers and their on-disk locations
//!
//! Every upload gets a fresh random token. Both artifacts of a session are
//! named after that token inside the data directory:
//!
//! ```text
//! <data_dir>/<session_id>.index      vector index
//! <data_dir>/<session_id>.passages   ordered passage list
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::error::{DocQaError, DocQaResult};

const INDEX_EXTENSION: &str = "index";
const PASSAGES_EXTENSION: &str = "passages";

/// Opaque session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Parse a client-supplied token.
    /// Anything that is not a UUID can never name a stored session.
    pub fn parse(raw: &str) -> DocQaResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(SessionId)
            .map_err(|_| DocQaError::NotFound {
                session_id: raw.to_string(),
            })
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Storage addresses of one session's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub session_id: SessionId,
    pub index: PathBuf,
    pub passages: PathBuf,
}

impl SessionPaths {
    pub fn dir(&self) -> Option<&Path> {
        self.index.parent()
    }
}

/// Allocates session ids and maps them to artifact locations
#[derive(Debug, Clone)]
pub struct SessionManager {
    data_dir: PathBuf,
}

impl SessionManager {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Allocate a fresh session id (no collision check against stored sessions)
    pub fn new_session(&self) -> SessionId {
        SessionId(Uuid::new_v4())
    }

    /// Artifact locations for a session
    pub fn locate(&self, session_id: &SessionId) -> SessionPaths {
        let key = session_id.to_string();
        SessionPaths {
            session_id: *session_id,
            index: self.data_dir.join(format!("{}.{}", key, INDEX_EXTENSION)),
            passages: self.data_dir.join(format!("{}.{}", key, PASSAGES_EXTENSION)),
        }
    }

    /// Whether the session's index has been committed
    pub async fn exists(&self, session_id: &SessionId) -> bool {
        tokio::fs::try_exists(self.locate(session_id).index)
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_shares_key() {
        let manager = SessionManager::new(PathBuf::from("/data"));
        let id = SessionId::parse("0b7f3a52-5c1e-4f57-9d0e-2b8f0e6b4a11").unwrap();
        let paths = manager.locate(&id);

        assert_eq!(
            paths.index,
            PathBuf::from("/data/0b7f3a52-5c1e-4f57-9d0e-2b8f0e6b4a11.index")
        );
        assert_eq!(
            paths.passages,
            PathBuf::from("/data/0b7f3a52-5c1e-4f57-9d0e-2b8f0e6b4a11.passages")
        );
        assert_eq!(paths.dir(), Some(Path::new("/data")));
    }

    #[test]
    fn test_locate_is_deterministic() {
        let manager = SessionManager::new(PathBuf::from("/data"));
        let id = manager.new_session();
        assert_eq!(manager.locate(&id), manager.locate(&id));
    }

    #[test]
    fn test_new_sessions_are_unique() {
        let manager = SessionManager::new(PathBuf::from("/data"));
        let a = manager.new_session();
        let b = manager.new_session();
        assert_ne!(a, b);
        assert_eq!(SessionId::parse(&a.to_string()).unwrap(), a);
    }

    #[test]
    fn test_parse_rejects_non_uuid_as_not_found() {
        for raw in ["nonexistent-id", "../../etc/passwd", ""] {
            let err = SessionId::parse(raw).unwrap_err();
            assert!(matches!(err, DocQaError::NotFound { .. }), "{}", raw);
        }
    }
}

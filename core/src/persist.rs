use std::fs;
use std::io;
use std::path::Path;

use crate::error::ServiceError;
use crate::index::InvertedIndex;

/// Write the full index state to `path`, replacing whatever was there.
///
/// The bytes go to a sibling temp file first and are renamed into place,
/// so a crash mid-write never leaves a torn snapshot behind.
pub fn save_snapshot(path: &Path, index: &InvertedIndex) -> Result<(), ServiceError> {
    let write = || -> io::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let bytes = index
            .serialize()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    };
    write().map_err(|source| ServiceError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a snapshot, `Ok(None)` if the file does not exist yet. A missing
/// snapshot at startup is normal: the service starts with an empty index.
pub fn load_snapshot(path: &Path) -> Result<Option<InvertedIndex>, ServiceError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ServiceError::SnapshotRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let index = InvertedIndex::deserialize(&bytes).map_err(|source| ServiceError::SnapshotDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(index))
}

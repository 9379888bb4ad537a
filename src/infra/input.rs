use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on a single document, matching the upload limit of the service.
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is too large ({size} bytes, max {max} bytes)", path.display())]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("{} is not valid UTF-8 text (invalid byte at offset {offset})", path.display())]
    NotUtf8 { path: PathBuf, offset: usize },
}

/// Read a text document, `-` meaning stdin, enforcing the size bound and UTF-8.
pub fn read_document(path: &Path, max_bytes: u64) -> Result<String, InputError> {
    let read_err = |source| InputError::Read {
        path: path.to_path_buf(),
        source,
    };

    // Read one byte past the bound so oversize input is detected without
    // loading all of it.
    let mut bytes = Vec::new();
    if path == Path::new("-") {
        std::io::stdin()
            .lock()
            .take(max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(read_err)?;
    } else {
        std::fs::File::open(path)
            .map_err(read_err)?
            .take(max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(read_err)?;
    }

    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(InputError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: max_bytes,
        });
    }

    String::from_utf8(bytes).map_err(|e| InputError::NotUtf8 {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
    })
}

//! Loading of packaged model assets.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::{Error, Result};

/// Path of the default generator model, relative to the working directory.
pub const DEFAULT_MODEL_ASSET: &str = "models/generator.onnx";

/// An immutable, fully-read model file.
///
/// The bytes are handed to the inference runtime exactly as stored on disk; the ONNX container
/// defines its own byte order, so no reordering happens here.
pub struct ModelBytes {
    data: Box<[u8]>,
}

impl ModelBytes {
    /// Returns the raw model bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the size of the model file in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads the model asset at `path` fully into memory.
///
/// Fails with [`Error::AssetNotFound`] if `path` does not resolve to a file, and with
/// [`Error::Io`] on any other read failure. Partial reads are not possible; on success the
/// returned buffer holds the entire file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ModelBytes> {
    load_impl(path.as_ref())
}

fn load_impl(path: &Path) -> Result<ModelBytes> {
    let data = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::AssetNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })?;

    log::debug!("read model asset '{}' ({} bytes)", path.display(), data.len());

    Ok(ModelBytes {
        data: data.into_boxed_slice(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset() {
        match load("does/not/exist.onnx") {
            Err(Error::AssetNotFound { path }) => {
                assert_eq!(path, Path::new("does/not/exist.onnx"));
            }
            other => panic!("expected `AssetNotFound`, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn reads_whole_file() {
        let path = std::env::temp_dir().join("facegen-asset-test.bin");
        fs::write(&path, [1, 2, 3, 4, 5]).unwrap();
        let bytes = load(&path).unwrap();
        assert_eq!(bytes.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(bytes.len(), 5);
        fs::remove_file(&path).ok();
    }
}

//! Opening PICA+ dumps, transparently decompressing gzip files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{PicaError, Result};

/// Open `path` for reading; files ending in `.gz` are decompressed on the fly.
///
/// # Errors
///
/// Returns [`PicaError::Source`] if the file cannot be opened.
pub fn open(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path).map_err(|source| PicaError::Source {
        path: path.to_path_buf(),
        source,
    })?;

    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

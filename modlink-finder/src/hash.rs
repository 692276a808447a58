//! A [`HashSupplier`] that streams an archive's bytes through SHA-256 on
//! demand (spec §3's `hash(algorithm) -> bytes`, §11's default algorithm).

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::error::{FinderError, Result};
use crate::reference::HashSupplier;

#[derive(Debug)]
pub struct FileHashSupplier {
    path: PathBuf,
}

impl FileHashSupplier {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HashSupplier for FileHashSupplier {
    fn hash(&self) -> Result<[u8; 32]> {
        let mut file =
            File::open(&self.path).map_err(|e| FinderError::io(self.path.clone(), e))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = read_chunk(&mut file, &mut buf)
                .map_err(|e| FinderError::io(self.path.clone(), e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hasher.finalize().into())
    }
}

fn read_chunk(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    file.read(buf)
}

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use relay_thermostat_common::{
    store::{checked_range, LAYOUT_LEN},
    ByteStore, StoreError,
};

/// Settings image kept in a small file, patched in place one field at a time.
///
/// Bytes past the end of the file, or a file that does not exist yet, read as
/// erased (`0xFF`).
#[derive(Debug, Clone)]
pub struct FileByteStore {
    path: PathBuf,
}

impl FileByteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for FileByteStore {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        checked_range(offset, buf.len(), LAYOUT_LEN)?;
        buf.fill(0xFF);

        let mut file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        file.seek(SeekFrom::Start(offset as u64))?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(())
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        checked_range(offset, bytes.len(), LAYOUT_LEN)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(bytes)?;
        file.sync_data()?;
        Ok(())
    }
}

//! Size-rotated log file
//!
//! `<dir>/<name>.log` is moved to `<name>.log.1` once it would grow past the
//! size limit; older files shift up to `<name>.log.<max_files>` and the oldest
//! is dropped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct RollingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    file: File,
    size: u64,
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl RollingFileWriter {
    /// Open (or create) `path`, appending to existing content
    pub fn open(path: PathBuf, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let (file, size) = open_append(&path)?;
        Ok(Self {
            path,
            max_bytes,
            max_files,
            file,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the n-th rotated file
    pub fn rotated_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate_if_needed(&mut self, incoming: u64) -> io::Result<()> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        if self.size > 0 && self.size.saturating_add(incoming) > self.max_bytes {
            self.rotate()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files == 0 {
            remove_if_exists(&self.path)?;
        } else {
            remove_if_exists(&self.rotated_path(self.max_files))?;
            for index in (1..self.max_files).rev() {
                let from = self.rotated_path(index);
                if from.exists() {
                    fs::rename(from, self.rotated_path(index + 1))?;
                }
            }
            fs::rename(&self.path, self.rotated_path(1))?;
        }

        let (file, size) = open_append(&self.path)?;
        self.file = file;
        self.size = size;
        Ok(())
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.rotate_if_needed(buf.len() as u64)?;
        self.file.write_all(buf)?;
        self.size = self.size.saturating_add(buf.len() as u64);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_without_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = RollingFileWriter::open(dir.path().join("app.log"), 1024, 2).unwrap();
        w.write_all(b"one\n").unwrap();
        w.write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(w.path()).unwrap(), "one\ntwo\n");
        assert!(!w.rotated_path(1).exists());
    }

    #[test]
    fn test_rotates_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = RollingFileWriter::open(dir.path().join("app.log"), 8, 2).unwrap();
        for line in ["aaaaaa\n", "bbbbbb\n", "cccccc\n", "dddddd\n"] {
            w.write_all(line.as_bytes()).unwrap();
        }
        assert_eq!(fs::read_to_string(w.path()).unwrap(), "dddddd\n");
        assert_eq!(fs::read_to_string(w.rotated_path(1)).unwrap(), "cccccc\n");
        assert_eq!(fs::read_to_string(w.rotated_path(2)).unwrap(), "bbbbbb\n");
        assert!(!w.rotated_path(3).exists());
    }

    #[test]
    fn test_zero_max_files_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = RollingFileWriter::open(dir.path().join("app.log"), 4, 0).unwrap();
        w.write_all(b"old\n").unwrap();
        w.write_all(b"new\n").unwrap();
        assert_eq!(fs::read_to_string(w.path()).unwrap(), "new\n");
        assert!(!w.rotated_path(1).exists());
    }
}

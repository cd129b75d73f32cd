use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Whether the containing directory of a new tempfile should be created first.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContainingDirectory {
    /// Assume the directory already exists.
    Exists,
    /// Create the directory (and its parents) if missing.
    CreateAllRaceproof,
}

/// A registered, writable tempfile that is removed on drop unless [`persist`][Handle::persist]
/// is called, and is removed by the global signal handler if the process is killed first.
pub struct Handle {
    file: fs::File,
    temp_path: PathBuf,
    id: usize,
    persisted: bool,
}

impl Handle {
    pub(crate) fn new(at: &Path, containing_dir: ContainingDirectory) -> io::Result<Self> {
        if containing_dir == ContainingDirectory::CreateAllRaceproof {
            if let Some(parent) = at.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut temp_path = at.to_owned();
        let file_name = format!(
            "{}.tmp-{}",
            at.file_name().and_then(|s| s.to_str()).unwrap_or("tempfile"),
            std::process::id()
        );
        temp_path.set_file_name(file_name);
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        let id = crate::register(temp_path.clone());
        Ok(Handle {
            file,
            temp_path,
            id,
            persisted: false,
        })
    }

    /// The path of the underlying temporary file, before it's persisted.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush and rename the tempfile into place at `target`, consuming the handle.
    pub fn persist(mut self, target: impl AsRef<Path>) -> io::Result<fs::File> {
        self.file.flush()?;
        self.file.sync_all()?;
        fs::rename(&self.temp_path, target.as_ref())?;
        self.persisted = true;
        crate::deregister(self.id);
        fs::File::open(target.as_ref())
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.temp_path);
            crate::deregister(self.id);
        }
    }
}

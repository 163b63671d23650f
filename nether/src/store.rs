use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use mockall::automock;
use nether_core::{error::StoreError, types::DocumentTitle};

/// Local documents storage
#[automock]
pub trait FileStore {
    fn exists(&self, title: &DocumentTitle) -> bool;
    fn read(&self, title: &DocumentTitle) -> Result<String, StoreError>;
    /// Overwrite content of an existing document
    fn write(&self, title: &DocumentTitle, content: &str) -> Result<(), StoreError>;
    fn create(&self, title: &DocumentTitle, content: &str) -> Result<(), StoreError>;
}

/// Documents are `.md` files of a folder (and its sub folders)
pub struct LocalFolder {
    folder_path: PathBuf,
}

impl LocalFolder {
    pub fn new(folder_path: PathBuf) -> Self {
        Self { folder_path }
    }

    pub fn path(&self, title: &DocumentTitle) -> Result<PathBuf, StoreError> {
        if !title.is_valid() {
            return Err(StoreError::InvalidTitle(title.clone()));
        }

        Ok(self.folder_path.join(title.relative_path()))
    }
}

impl FileStore for LocalFolder {
    fn exists(&self, title: &DocumentTitle) -> bool {
        match self.path(title) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }

    fn read(&self, title: &DocumentTitle) -> Result<String, StoreError> {
        let path = self.path(title)?;
        fs::read_to_string(&path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(title.clone()),
            _ => StoreError::Io(path, error),
        })
    }

    fn write(&self, title: &DocumentTitle, content: &str) -> Result<(), StoreError> {
        let path = self.path(title)?;
        fs::write(&path, content).map_err(|error| StoreError::Io(path, error))
    }

    fn create(&self, title: &DocumentTitle, content: &str) -> Result<(), StoreError> {
        let path = self.path(title)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| StoreError::Io(parent.to_path_buf(), error))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|error| match error.kind() {
                io::ErrorKind::AlreadyExists => StoreError::AlreadyExist(title.clone()),
                _ => StoreError::Io(path.clone(), error),
            })?;
        file.write_all(content.as_bytes())
            .map_err(|error| StoreError::Io(path, error))
    }
}

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("device I/O error: {0}")]
    Io(String),
    #[error("sector {0} out of range")]
    InvalidSector(usize),
    #[error("not enough free sectors")]
    OutOfSpace,
    #[error("no such file or directory")]
    NotFound,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("directory has no free entry")]
    DirectoryFull,
    #[error("invalid file name")]
    InvalidFileName,
    #[error("path is not absolute")]
    InvalidPath,
    #[error("file size exceeds the maximum the header tree can index")]
    FileTooLarge,
    #[error("open-file table is full")]
    TooManyOpenFiles,
    #[error("invalid open-file id {0}")]
    BadFileId(usize),
}

pub type Result<T> = std::result::Result<T, FsError>;

use thiserror::Error;

/// Failure to obtain a usable image for a drill, the logo or the cover.
///
/// The composer never surfaces these; it swaps in the placeholder instead.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Failed to fetch image: {0}")]
    FetchError(String),
    #[error("Failed to decode image: {0}")]
    DecodeError(String),
}

/// Failure of the document as a whole. Nothing is written when this occurs.
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Failed to load font: {0}")]
    FontError(String),
    #[error("Failed to generate QR code: {0}")]
    QrError(String),
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {key}: {reason}")]
    ReadError { key: String, reason: String },
    #[error("Failed to write {key}: {reason}")]
    WriteError { key: String, reason: String },
    #[error("Corrupt data in {key}: {reason}")]
    CorruptError { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read drill catalog: {0}")]
    CatalogError(String),
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    #[error("Session error: {0}")]
    SessionError(String),
    #[error("Unknown drill id: {0}")]
    UnknownDrill(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom dell'applicazione.
//!
//! ## Livelli di errore:
//! - **Per-file** (recuperabili): `Probe`, `Resize`, `Compression`, `MissingDependency`.
//!   Vengono loggati e il file successivo viene elaborato.
//! - **Discovery di sottocartelle**: loggati da `FileManager` e saltati, mai propagati.
//! - **Pipeline** (fatali): `Discovery` e `Validation`. Risalgono fino a `main` e
//!   terminano il processo con exit code diverso da zero.
//!
//! ## Esempio:
//! ```ignore
//! if !root.is_dir() {
//!     return Err(OptimizeError::Discovery(format!("{} is not a directory", root.display())));
//! }
//! ```

/// Custom error types for image shrinking
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Resize failed: {0}")]
    Resize(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Configuration error: {0}")]
    Validation(String),
}

impl OptimizeError {
    /// True for errors that must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Discovery(_) | Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_tiers() {
        assert!(OptimizeError::Discovery("gone".into()).is_fatal());
        assert!(OptimizeError::Validation("bad".into()).is_fatal());
        assert!(!OptimizeError::Probe("corrupt".into()).is_fatal());
        assert!(!OptimizeError::MissingDependency("pngquant".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = OptimizeError::Compression("pngquant exited with status 99".into());
        assert_eq!(err.to_string(), "Compression failed: pngquant exited with status 99");
    }
}

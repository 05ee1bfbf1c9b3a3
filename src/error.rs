use std::path::PathBuf;

/// Failures surfaced by [`crate::generator::NocGenerator`].
#[derive(Debug, thiserror::Error)]
pub enum NocError {
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot load template {}: {source:#}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot save {}: {source:#}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    /// A template failed to parse or render; carries the full tera cause chain
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Reading the template override directory failed
    #[error("Override directory: {0}")]
    IoError(#[from] std::io::Error),
}

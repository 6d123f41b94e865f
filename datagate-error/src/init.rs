use thiserror::Error;

/// Error type for application context initialization
#[derive(Error, Debug)]
pub enum InitContextError {
    /// Returned when the context is initialized more than once
    #[error("context already initialized")]
    AlreadyInitialized,
    /// Returned when a component is requested before it was installed
    #[error("component not available: {0}")]
    MissingComponent(String),
    /// Returned when a primitive error occurs
    #[error("primitive error: {0}")]
    Primitive(String),
}

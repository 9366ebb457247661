/// Errors raised while mounting or driving a scene
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Scene name did not match any [`crate::SceneKind`]
    #[error("unknown scene: {0}")]
    UnknownScene(String),

    /// Container has no area to size the camera against
    #[error("render surface has no measurable area ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    /// Rendering context could not be created or used
    #[error("renderer unavailable: {0}")]
    Renderer(String),

    /// Host environment refused an operation (DOM, terminal, frame clock)
    #[error("host environment error: {0}")]
    Environment(String),
}

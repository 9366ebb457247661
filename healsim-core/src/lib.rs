/// Healing Simulator Core Library - scenes, scene graph and scene lifecycle
///
/// This library holds everything that does not depend on where the scene is
/// drawn: the three procedural scenes, the geometry and camera math they are
/// built from, and the mount/dispose lifecycle driven through the
/// [`Environment`] seam that the web and terminal front ends implement.

pub mod environment;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod host;
pub mod kind;
pub mod lifecycle;
pub mod material;
pub mod projection;
pub mod scenes;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use environment::{Environment, FrameCallback, FrameId, ListenerId, Renderer, RendererOptions, ResizeCallback};
pub use error::SceneError;
pub use geometry::{Geometry, Topology, Triangle, Vertex};
pub use graph::{Drawable, Fog, GeometryKey, Light, LightRig, MaterialKey, NodeId, NodeKind, SceneGraph};
pub use host::SceneHost;
pub use kind::SceneKind;
pub use lifecycle::{CancelToken, RenderLoop, SceneHandle};
pub use material::{Color, Material, PointsMaterial, StandardMaterial};
pub use projection::{Camera, Viewport};
pub use scenes::{Scene, SceneRng};
pub use transform::{RotationState, Transform};

/// Scene selection tag
use std::fmt;
use std::str::FromStr;

use crate::error::SceneError;

/// The three selectable background scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SceneKind {
    #[default]
    Starlight,
    Forest,
    Ocean,
}

impl SceneKind {
    /// Every kind, in toolbar order
    pub const ALL: [SceneKind; 3] = [SceneKind::Starlight, SceneKind::Forest, SceneKind::Ocean];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Starlight => "starlight",
            SceneKind::Forest => "forest",
            SceneKind::Ocean => "ocean",
        }
    }

    /// Button caption
    pub fn label(self) -> &'static str {
        match self {
            SceneKind::Starlight => "✨ Starlight",
            SceneKind::Forest => "🌲 Forest",
            SceneKind::Ocean => "🌊 Ocean",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SceneKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SceneError::UnknownScene(wanted.to_string()))
    }
}

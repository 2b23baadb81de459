use serde::{Deserialize, Serialize};

const FALLBACK_NAME: &str = "friend";

/// What we know about the user: an optional name and an optional wallpaper
/// URL. Both start out unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: Option<String>,
    pub wallpaper: Option<String>,
}

impl Profile {
    /// The name to address the user with, with a generic stand-in until one
    /// has been captured.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_NAME)
    }
}

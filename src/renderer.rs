//! Interface to the scene renderer that draws face anchors.

use crate::geometry::WorldPoint;
use crate::Result;
use std::fmt;

/// Opaque reference to an anchor node owned by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorHandle(pub u64);

impl fmt::Display for AnchorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Scene-graph operations on face anchors.
///
/// Every call happens on the presentation thread, in submission order. A handle
/// the renderer no longer knows must be reported as
/// [`Error::StaleHandle`](crate::Error::StaleHandle).
pub trait AnchorRenderer: Send {
    /// Add a labelled anchor node at `position`
    fn create_anchor(&mut self, label: &str, position: WorldPoint) -> Result<AnchorHandle>;

    /// Animate the anchor to a new position
    fn move_anchor(&mut self, handle: AnchorHandle, position: WorldPoint) -> Result<()>;

    fn show_anchor(&mut self, handle: AnchorHandle) -> Result<()>;

    fn hide_anchor(&mut self, handle: AnchorHandle) -> Result<()>;

    /// Detach the anchor from the scene; the handle is invalid afterwards
    fn remove_anchor(&mut self, handle: AnchorHandle) -> Result<()>;

    /// Replace the anchor's text. Renderers with static labels can ignore it.
    fn relabel_anchor(&mut self, _handle: AnchorHandle, _label: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(AnchorHandle(7).to_string(), "anchor#7");
    }
}

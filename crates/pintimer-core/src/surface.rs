//! Widget geometry, size classes, controls and visual nodes.
//!
//! [`WidgetNodes`] is the widget's visual tree. It is one owned value
//! that moves between surfaces; identity is the move itself, witnessed
//! by a tag that never changes. Its origin is always in primary-surface
//! coordinates. A pinned context renders the nodes at its own fixed
//! placement and never consults the origin, which is what lets a
//! restored widget reappear exactly where it was.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Widget size classes and their cell dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn extent(self) -> Extent {
        match self {
            SizeClass::Small => Extent {
                width: 24,
                height: 6,
            },
            SizeClass::Medium => Extent {
                width: 30,
                height: 7,
            },
            SizeClass::Large => Extent {
                width: 40,
                height: 9,
            },
        }
    }
}

/// Fixed extent of a pinned surface. Pinned contexts do not resize.
pub const PINNED_EXTENT: Extent = Extent {
    width: 30,
    height: 7,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub width: u16,
    pub height: u16,
}

/// Staggered origin for the `index`-th widget opened on a surface, so
/// new widgets do not stack exactly on top of each other. Wraps after
/// eight placements.
pub fn staggered_origin(index: usize) -> Position {
    let step = (index % 8) as i32;
    Position {
        x: 2 + step * 4,
        y: 1 + step * 2,
    }
}

/// Interactive controls of a widget. Every control is bound on whichever
/// surface currently hosts the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    StartStop,
    Reset,
    AdjustPlus,
    AdjustMinus,
    SizeSmall,
    SizeMedium,
    SizeLarge,
    Pin,
    Close,
    /// Drag handle. Also the widget's title region.
    Header,
}

impl ControlId {
    /// All controls, in binding order.
    pub const ALL: [ControlId; 10] = [
        ControlId::StartStop,
        ControlId::Reset,
        ControlId::AdjustPlus,
        ControlId::AdjustMinus,
        ControlId::SizeSmall,
        ControlId::SizeMedium,
        ControlId::SizeLarge,
        ControlId::Pin,
        ControlId::Close,
        ControlId::Header,
    ];
}

/// Widget color palette, copied onto a pinned surface when one is
/// created. Plain RGB so front-ends map it to their own color types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub background: (u8, u8, u8),
    pub foreground: (u8, u8, u8),
    pub accent: (u8, u8, u8),
    pub alarm: (u8, u8, u8),
}

impl Default for Theme {
    fn default() -> Self {
        // The dark widget palette: near-black card, white digits, green
        // start accent, red time-up face.
        Self {
            background: (33, 33, 33),
            foreground: (255, 255, 255),
            accent: (76, 175, 80),
            alarm: (255, 82, 82),
        }
    }
}

/// The widget's visual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetNodes {
    tag: Uuid,
    /// Top-left corner, in primary-surface coordinates.
    pub origin: Position,
    pub size: SizeClass,
    display: String,
    running: bool,
    expired: bool,
    hidden: HashSet<ControlId>,
}

impl WidgetNodes {
    pub fn new(origin: Position) -> Self {
        Self {
            tag: Uuid::new_v4(),
            origin,
            size: SizeClass::Medium,
            display: String::new(),
            running: false,
            expired: false,
            hidden: HashSet::new(),
        }
    }

    /// Identity witness. Stable for the life of the widget, across any
    /// number of surface moves.
    pub fn tag(&self) -> Uuid {
        self.tag
    }

    pub fn extent(&self) -> Extent {
        self.size.extent()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Update the time face. Returns whether anything changed, so a
    /// second render with the same value is a no-op.
    pub fn set_display(&mut self, display: &str) -> bool {
        if self.display == display {
            return false;
        }
        self.display = display.to_string();
        true
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn set_expired(&mut self, expired: bool) {
        self.expired = expired;
    }

    pub fn set_size(&mut self, size: SizeClass) {
        self.size = size;
    }

    pub fn set_hidden(&mut self, control: ControlId, hidden: bool) {
        if hidden {
            self.hidden.insert(control);
        } else {
            self.hidden.remove(&control);
        }
    }

    pub fn is_hidden(&self, control: ControlId) -> bool {
        self.hidden.contains(&control)
    }

    /// Move the widget, clamping so it stays fully inside the viewport.
    /// A widget larger than the viewport pins to the top-left edge.
    pub fn drag_to(&mut self, target: Position, viewport: Extent) {
        let extent = self.extent();
        let max_x = i32::from(viewport.width).saturating_sub(i32::from(extent.width));
        let max_y = i32::from(viewport.height).saturating_sub(i32::from(extent.height));
        self.origin = Position {
            x: target.x.clamp(0, max_x.max(0)),
            y: target.y.clamp(0, max_y.max(0)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Extent = Extent {
        width: 120,
        height: 40,
    };

    #[test]
    fn size_classes_are_ordered() {
        let small = SizeClass::Small.extent();
        let medium = SizeClass::Medium.extent();
        let large = SizeClass::Large.extent();
        assert!(small.width < medium.width && medium.width < large.width);
        assert!(small.height < medium.height && medium.height < large.height);
    }

    #[test]
    fn stagger_offsets_distinct_then_wrap() {
        let first = staggered_origin(0);
        let second = staggered_origin(1);
        assert_ne!(first, second);
        assert_eq!(staggered_origin(0), staggered_origin(8));
    }

    #[test]
    fn drag_clamps_to_viewport() {
        let mut nodes = WidgetNodes::new(Position { x: 0, y: 0 });
        nodes.drag_to(Position { x: 500, y: 500 }, VIEWPORT);
        let extent = nodes.extent();
        assert_eq!(
            nodes.origin,
            Position {
                x: i32::from(VIEWPORT.width) - i32::from(extent.width),
                y: i32::from(VIEWPORT.height) - i32::from(extent.height),
            }
        );
        nodes.drag_to(Position { x: -50, y: -50 }, VIEWPORT);
        assert_eq!(nodes.origin, Position { x: 0, y: 0 });
    }

    #[test]
    fn drag_with_oversized_widget_pins_to_origin() {
        let mut nodes = WidgetNodes::new(Position { x: 3, y: 3 });
        nodes.set_size(SizeClass::Large);
        let tiny = Extent {
            width: 10,
            height: 4,
        };
        nodes.drag_to(Position { x: 7, y: 7 }, tiny);
        assert_eq!(nodes.origin, Position { x: 0, y: 0 });
    }

    #[test]
    fn display_update_is_idempotent() {
        let mut nodes = WidgetNodes::new(Position { x: 0, y: 0 });
        assert!(nodes.set_display("03:00"));
        assert!(!nodes.set_display("03:00"));
        assert!(nodes.set_display("02:59"));
    }

    #[test]
    fn hidden_controls_toggle() {
        let mut nodes = WidgetNodes::new(Position { x: 0, y: 0 });
        assert!(!nodes.is_hidden(ControlId::Pin));
        nodes.set_hidden(ControlId::Pin, true);
        assert!(nodes.is_hidden(ControlId::Pin));
        nodes.set_hidden(ControlId::Pin, false);
        assert!(!nodes.is_hidden(ControlId::Pin));
    }

    #[test]
    fn tag_survives_moves() {
        let nodes = WidgetNodes::new(Position { x: 0, y: 0 });
        let tag = nodes.tag();
        let moved = nodes;
        assert_eq!(moved.tag(), tag);
    }
}

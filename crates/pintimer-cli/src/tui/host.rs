//! The terminal as a surface host.
//!
//! [`TerminalHost`] implements the core host traits for a ratatui
//! session. The primary surface is a scrollable page pane that widgets
//! float over; the pinned surface is a single overlay layer drawn after
//! everything else on every frame, which is what "always on top" means
//! inside one terminal. Input bindings are registry entries resolved
//! against per-frame hit regions.

use std::collections::HashMap;

use ratatui::layout::Rect;
use tracing::warn;

use pintimer_core::{
    ContextId, ControlId, Extent, InputRouter, Position, RelocateError, SubscriptionId,
    SurfaceHost, SurfaceLocation, Theme, WidgetId, WidgetNodes,
};

/// One clickable region from the last draw pass.
#[derive(Debug, Clone, Copy)]
pub struct HitRegion {
    pub widget: WidgetId,
    pub control: ControlId,
    pub location: SurfaceLocation,
    pub area: Rect,
}

/// A widget box's full footprint, for focus-on-click.
#[derive(Debug, Clone, Copy)]
pub struct BodyRegion {
    pub widget: WidgetId,
    pub area: Rect,
}

/// The single overlay context. Whichever widget holds it renders over
/// the page at a fixed placement, ignoring the nodes' page origin.
pub struct PinnedSurface {
    pub context: ContextId,
    pub widget: WidgetId,
    pub extent: Extent,
    pub theme: Theme,
    pub nodes: Option<WidgetNodes>,
}

pub struct TerminalHost {
    /// Whether the overlay layer is offered at all. Off it makes every
    /// pin attempt degrade silently to staying on the page.
    pub capability: bool,
    next_context: u32,
    next_subscription: u64,
    pinned: Option<PinnedSurface>,
    primary_slots: HashMap<WidgetId, WidgetNodes>,
    placeholders: HashMap<WidgetId, String>,
    bindings: HashMap<SubscriptionId, (WidgetId, SurfaceLocation, ControlId)>,
    claims: HashMap<SubscriptionId, (WidgetId, SurfaceLocation)>,
    close_signals: Vec<ContextId>,
    page_area: Rect,
    page_lines: Vec<String>,
    page_scroll: u16,
    hits: Vec<HitRegion>,
    bodies: Vec<BodyRegion>,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self {
            capability: true,
            next_context: 0,
            next_subscription: 0,
            pinned: None,
            primary_slots: HashMap::new(),
            placeholders: HashMap::new(),
            bindings: HashMap::new(),
            claims: HashMap::new(),
            close_signals: Vec::new(),
            page_area: Rect::new(0, 0, 120, 40),
            page_lines: page_text(),
            page_scroll: 0,
            hits: Vec::new(),
            bodies: Vec::new(),
        }
    }

    // ── Frame state ──────────────────────────────────────────────────

    /// Record the page area for this frame. The draw pass calls this
    /// first; drag clamping and coordinate conversion use it.
    pub fn begin_frame(&mut self, page_area: Rect) {
        self.page_area = page_area;
    }

    /// Replace the clickable regions with this frame's set, given in
    /// draw order. Stored reversed so lookups find the topmost first.
    pub fn install_hits(&mut self, mut hits: Vec<HitRegion>, mut bodies: Vec<BodyRegion>) {
        hits.reverse();
        bodies.reverse();
        self.hits = hits;
        self.bodies = bodies;
    }

    /// Topmost clickable region under a point.
    pub fn hit_at(&self, x: u16, y: u16) -> Option<HitRegion> {
        let point = ratatui::layout::Position { x, y };
        self.hits.iter().find(|h| h.area.contains(point)).copied()
    }

    /// Topmost widget box under a point, ignoring controls.
    pub fn body_at(&self, x: u16, y: u16) -> Option<WidgetId> {
        let point = ratatui::layout::Position { x, y };
        self.bodies
            .iter()
            .find(|b| b.area.contains(point))
            .map(|b| b.widget)
    }

    /// Screen coordinates to page coordinates.
    pub fn to_page(&self, column: u16, row: u16) -> (i32, i32) {
        (
            i32::from(column) - i32::from(self.page_area.x),
            i32::from(row) - i32::from(self.page_area.y),
        )
    }

    // ── Page pane ────────────────────────────────────────────────────

    pub fn page_lines(&self) -> &[String] {
        &self.page_lines
    }

    pub fn page_scroll(&self) -> u16 {
        self.page_scroll
    }

    pub fn scroll_page(&mut self, delta: i32) {
        let max = self.page_lines.len().saturating_sub(1) as i32;
        let next = i32::from(self.page_scroll) + delta;
        self.page_scroll = next.clamp(0, max) as u16;
    }

    // ── Queries for the owner loop and the draw pass ─────────────────

    pub fn pinned(&self) -> Option<&PinnedSurface> {
        self.pinned.as_ref()
    }

    pub fn primary_nodes_of(&self, widget: WidgetId) -> Option<&WidgetNodes> {
        self.primary_slots.get(&widget)
    }

    pub fn placeholder_of(&self, widget: WidgetId) -> Option<&str> {
        self.placeholders.get(&widget).map(String::as_str)
    }

    pub fn origin_of(&self, widget: WidgetId) -> Option<Position> {
        self.primary_slots.get(&widget).map(|nodes| nodes.origin)
    }

    /// Contexts closed on the host side since the last drain. The owner
    /// loop delivers each to its widget's `on_pinned_closed`.
    pub fn take_close_signals(&mut self) -> Vec<ContextId> {
        std::mem::take(&mut self.close_signals)
    }

    /// Whether a press routed through a last-frame hit region still has
    /// a live binding behind it.
    pub fn binding_live(
        &self,
        widget: WidgetId,
        control: ControlId,
        location: SurfaceLocation,
    ) -> bool {
        self.bindings
            .values()
            .any(|(w, scope, c)| *w == widget && *scope == location && *c == control)
    }

    /// Whether the widget holds a live shortcut claim. Keys are routed
    /// only to claim holders.
    pub fn has_claim(&self, widget: WidgetId) -> bool {
        self.claims.values().any(|(w, _)| *w == widget)
    }

    /// Close an occupied overlay: the nodes go straight back to the
    /// widget's primary slot and the owner is signalled.
    fn evict(&mut self, surface: PinnedSurface) {
        if let Some(nodes) = surface.nodes {
            self.primary_slots.insert(surface.widget, nodes);
        }
        self.close_signals.push(surface.context);
    }
}

impl SurfaceHost for TerminalHost {
    fn pinned_capability(&self) -> bool {
        self.capability
    }

    fn request_pinned(
        &mut self,
        widget: WidgetId,
        extent: Extent,
    ) -> Result<ContextId, RelocateError> {
        if self.pinned.as_ref().is_some_and(|p| p.widget == widget) {
            return Err(RelocateError::AlreadyPinned);
        }
        // Single overlay: pinning evicts the current occupant through
        // the normal close path.
        if let Some(existing) = self.pinned.take() {
            self.evict(existing);
        }
        self.next_context += 1;
        let context = ContextId(self.next_context);
        self.pinned = Some(PinnedSurface {
            context,
            widget,
            extent,
            theme: Theme::default(),
            nodes: None,
        });
        Ok(context)
    }

    fn close_pinned(&mut self, context: ContextId) {
        if self.pinned.as_ref().is_some_and(|p| p.context == context) {
            if let Some(surface) = self.pinned.take() {
                self.evict(surface);
            }
        }
    }

    fn install_theme(&mut self, context: ContextId, theme: &Theme) -> Result<(), RelocateError> {
        match self.pinned.as_mut() {
            Some(surface) if surface.context == context => {
                surface.theme = *theme;
                Ok(())
            }
            _ => Err(RelocateError::SurfaceRequest(
                "no open pinned context".into(),
            )),
        }
    }

    fn take_nodes(&mut self, widget: WidgetId, from: SurfaceLocation) -> Option<WidgetNodes> {
        match from {
            SurfaceLocation::Primary => self.primary_slots.remove(&widget),
            SurfaceLocation::Pinned(context) => match self.pinned.as_mut() {
                Some(surface) if surface.context == context && surface.widget == widget => {
                    surface.nodes.take()
                }
                _ => None,
            },
        }
    }

    fn adopt_nodes(
        &mut self,
        widget: WidgetId,
        to: SurfaceLocation,
        nodes: WidgetNodes,
    ) -> Result<(), RelocateError> {
        match to {
            SurfaceLocation::Primary => {
                self.primary_slots.insert(widget, nodes);
                Ok(())
            }
            SurfaceLocation::Pinned(context) => match self.pinned.as_mut() {
                Some(surface) if surface.context == context && surface.widget == widget => {
                    surface.nodes = Some(nodes);
                    Ok(())
                }
                _ => {
                    // Custody contract: a failed adoption parks the
                    // nodes back at Primary.
                    warn!("pinned adoption without a live context; nodes parked at primary");
                    self.primary_slots.insert(widget, nodes);
                    Err(RelocateError::SurfaceRequest(
                        "pinned context is gone".into(),
                    ))
                }
            },
        }
    }

    fn nodes_mut(&mut self, widget: WidgetId) -> Option<&mut WidgetNodes> {
        if let Some(nodes) = self.primary_slots.get_mut(&widget) {
            return Some(nodes);
        }
        self.pinned
            .as_mut()
            .filter(|surface| surface.widget == widget)
            .and_then(|surface| surface.nodes.as_mut())
    }

    fn set_placeholder(&mut self, widget: WidgetId, text: Option<String>) {
        match text {
            Some(text) => {
                self.placeholders.insert(widget, text);
            }
            None => {
                self.placeholders.remove(&widget);
            }
        }
    }

    fn primary_viewport(&self) -> Extent {
        Extent {
            width: self.page_area.width,
            height: self.page_area.height,
        }
    }
}

impl InputRouter for TerminalHost {
    fn bind(
        &mut self,
        widget: WidgetId,
        scope: SurfaceLocation,
        control: ControlId,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.bindings.insert(id, (widget, scope, control));
        id
    }

    fn unbind(&mut self, subscription: SubscriptionId) {
        self.bindings.remove(&subscription);
    }

    fn claim_shortcuts(&mut self, widget: WidgetId, scope: SurfaceLocation) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.claims.insert(id, (widget, scope));
        id
    }

    fn release_shortcuts(&mut self, subscription: SubscriptionId) {
        self.claims.remove(&subscription);
    }
}

/// Filler page the widgets float over, so scrolling and dragging have
/// something to happen against.
fn page_text() -> Vec<String> {
    let mut lines = Vec::new();
    for section in 1..=15 {
        lines.push(format!("## Section {section}"));
        lines.push(String::new());
        for row in 1..=6 {
            lines.push(format!(
                "Paragraph {row} of section {section}. The page scrolls underneath the \
                 timers; widgets keep their place in the viewport."
            ));
        }
        lines.push(String::new());
    }
    lines
}

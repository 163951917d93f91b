//! Host seams: surfaces and input routing.
//!
//! A front-end implements [`SurfaceHost`] and [`InputRouter`] for its
//! rendering environment. The core never holds callbacks; input bindings
//! are registry entries (widget, scope, control) that the host resolves
//! back to [`TimerWidget::press`](crate::widget::TimerWidget::press)
//! calls when input arrives. That keeps every widget an explicit record
//! instead of a web of closures, and makes "exactly one live binding per
//! control" a countable fact.

use serde::{Deserialize, Serialize};

use crate::error::RelocateError;
use crate::surface::{Extent, Theme, WidgetNodes};
use crate::widget::WidgetId;

/// Identifies one pinned rendering context minted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u32);

/// Identifies one live input binding in the host's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Which rendering context a binding or a widget's nodes live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceLocation {
    Primary,
    Pinned(ContextId),
}

impl SurfaceLocation {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceLocation::Primary => "primary",
            SurfaceLocation::Pinned(_) => "pinned",
        }
    }
}

/// Rendering contexts and node custody.
///
/// Node custody contract: a widget's [`WidgetNodes`] live in exactly one
/// slot at a time, keyed by location. [`adopt_nodes`](Self::adopt_nodes)
/// takes them by value; on failure the implementation must place them
/// back into the widget's primary slot before returning the error, so
/// nodes are never lost. Adopting to `Primary` always succeeds.
pub trait SurfaceHost {
    /// Whether this host can provide always-on-top pinned contexts at
    /// all. Checked before any relocation work begins.
    fn pinned_capability(&self) -> bool;

    /// Open a pinned context of the given fixed extent for a widget.
    fn request_pinned(
        &mut self,
        widget: WidgetId,
        extent: Extent,
    ) -> Result<ContextId, RelocateError>;

    /// Close a pinned context. Idempotent; closing an unknown or
    /// already-closed context is a no-op.
    fn close_pinned(&mut self, context: ContextId);

    /// Copy the widget's palette into a fresh pinned context so it
    /// matches the primary rendering.
    fn install_theme(&mut self, context: ContextId, theme: &Theme) -> Result<(), RelocateError>;

    /// Detach a widget's nodes from a location, if they are there.
    fn take_nodes(&mut self, widget: WidgetId, from: SurfaceLocation) -> Option<WidgetNodes>;

    /// Attach a widget's nodes to a location. See the custody contract
    /// on the trait.
    fn adopt_nodes(
        &mut self,
        widget: WidgetId,
        to: SurfaceLocation,
        nodes: WidgetNodes,
    ) -> Result<(), RelocateError>;

    /// Mutable access to a widget's nodes wherever they currently live.
    fn nodes_mut(&mut self, widget: WidgetId) -> Option<&mut WidgetNodes>;

    /// Show (`Some`) or remove (`None`) the static placeholder at
    /// Primary while the widget lives elsewhere.
    fn set_placeholder(&mut self, widget: WidgetId, text: Option<String>);

    /// Current primary viewport, for drag clamping.
    fn primary_viewport(&self) -> Extent;
}

/// Input binding registry.
///
/// Binding and claiming are infallible bookkeeping. The relocation
/// protocol depends on that: every step that can fail happens before any
/// existing binding is removed, so there is no window with zero live
/// bindings.
pub trait InputRouter {
    /// Register a control binding scoped to a surface.
    fn bind(
        &mut self,
        widget: WidgetId,
        scope: SurfaceLocation,
        control: crate::surface::ControlId,
    ) -> SubscriptionId;

    /// Remove a control binding. Idempotent.
    fn unbind(&mut self, subscription: SubscriptionId);

    /// Claim the widget's global shortcuts for a surface. The claim is
    /// the ownership token: whichever scope holds the live claim is the
    /// one that receives shortcut input.
    fn claim_shortcuts(&mut self, widget: WidgetId, scope: SurfaceLocation) -> SubscriptionId;

    /// Release a shortcut claim. Idempotent.
    fn release_shortcuts(&mut self, subscription: SubscriptionId);
}

#[cfg(test)]
pub(crate) mod sim {
    //! An in-memory host that records every call for ordering and
    //! counting assertions.

    use std::collections::HashMap;

    use super::*;
    use crate::surface::ControlId;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum HostOp {
        RequestPinned(ContextId),
        ClosePinned(ContextId),
        InstallTheme(ContextId),
        TakeNodes(SurfaceLocation),
        AdoptNodes(SurfaceLocation),
        SetPlaceholder(bool),
        Bind(ControlId, SurfaceLocation),
        Unbind(ControlId, SurfaceLocation),
        Claim(SurfaceLocation),
        Release(SurfaceLocation),
    }

    #[derive(Default)]
    pub(crate) struct SimHost {
        pub capability: bool,
        /// Mimic hosts that move pinned nodes back to the primary slot
        /// themselves when the pinned context closes.
        pub auto_readopt: bool,
        pub fail_request: bool,
        pub fail_theme: bool,
        pub fail_pinned_adopt: bool,
        next_context: u32,
        next_subscription: u64,
        open_contexts: Vec<ContextId>,
        themes: HashMap<ContextId, Theme>,
        primary_slots: HashMap<WidgetId, WidgetNodes>,
        pinned_slots: HashMap<ContextId, (WidgetId, WidgetNodes)>,
        placeholders: HashMap<WidgetId, String>,
        bindings: HashMap<SubscriptionId, (WidgetId, SurfaceLocation, ControlId)>,
        claims: HashMap<SubscriptionId, (WidgetId, SurfaceLocation)>,
        pub ops: Vec<HostOp>,
    }

    impl SimHost {
        pub fn with_capability() -> Self {
            Self {
                capability: true,
                ..Self::default()
            }
        }

        pub fn live_bindings(&self, widget: WidgetId, control: ControlId) -> Vec<SurfaceLocation> {
            self.bindings
                .values()
                .filter(|(w, _, c)| *w == widget && *c == control)
                .map(|(_, scope, _)| *scope)
                .collect()
        }

        pub fn total_bindings(&self, widget: WidgetId) -> usize {
            self.bindings.values().filter(|(w, _, _)| *w == widget).count()
        }

        pub fn shortcut_scopes(&self, widget: WidgetId) -> Vec<SurfaceLocation> {
            self.claims
                .values()
                .filter(|(w, _)| *w == widget)
                .map(|(_, scope)| *scope)
                .collect()
        }

        pub fn placeholder(&self, widget: WidgetId) -> Option<&str> {
            self.placeholders.get(&widget).map(String::as_str)
        }

        pub fn open_contexts(&self) -> &[ContextId] {
            &self.open_contexts
        }

        pub fn theme_of(&self, context: ContextId) -> Option<&Theme> {
            self.themes.get(&context)
        }

        pub fn primary_nodes(&self, widget: WidgetId) -> Option<&WidgetNodes> {
            self.primary_slots.get(&widget)
        }

        pub fn pinned_nodes(&self, context: ContextId) -> Option<&WidgetNodes> {
            self.pinned_slots.get(&context).map(|(_, nodes)| nodes)
        }

        /// Index of the first op matching `pred`, for ordering checks.
        pub fn first_op<F: Fn(&HostOp) -> bool>(&self, pred: F) -> Option<usize> {
            self.ops.iter().position(pred)
        }

        pub fn last_op<F: Fn(&HostOp) -> bool>(&self, pred: F) -> Option<usize> {
            self.ops.iter().rposition(pred)
        }
    }

    impl SurfaceHost for SimHost {
        fn pinned_capability(&self) -> bool {
            self.capability
        }

        fn request_pinned(
            &mut self,
            _widget: WidgetId,
            _extent: Extent,
        ) -> Result<ContextId, RelocateError> {
            if self.fail_request {
                return Err(RelocateError::SurfaceRequest("host refused".into()));
            }
            self.next_context += 1;
            let context = ContextId(self.next_context);
            self.open_contexts.push(context);
            self.ops.push(HostOp::RequestPinned(context));
            Ok(context)
        }

        fn close_pinned(&mut self, context: ContextId) {
            if let Some(index) = self.open_contexts.iter().position(|c| *c == context) {
                self.open_contexts.remove(index);
                self.ops.push(HostOp::ClosePinned(context));
                if self.auto_readopt {
                    if let Some((widget, nodes)) = self.pinned_slots.remove(&context) {
                        self.primary_slots.insert(widget, nodes);
                    }
                }
                // Otherwise the nodes stay in the pinned slot, still
                // reachable through take_nodes during the teardown
                // signal, like a closing window whose tree remains
                // readable until teardown completes.
            }
        }

        fn install_theme(
            &mut self,
            context: ContextId,
            theme: &Theme,
        ) -> Result<(), RelocateError> {
            if self.fail_theme {
                return Err(RelocateError::SurfaceRequest("stylesheet copy failed".into()));
            }
            self.themes.insert(context, *theme);
            self.ops.push(HostOp::InstallTheme(context));
            Ok(())
        }

        fn take_nodes(&mut self, widget: WidgetId, from: SurfaceLocation) -> Option<WidgetNodes> {
            let nodes = match from {
                SurfaceLocation::Primary => self.primary_slots.remove(&widget),
                SurfaceLocation::Pinned(context) => match self.pinned_slots.remove(&context) {
                    Some((w, nodes)) if w == widget => Some(nodes),
                    Some(other) => {
                        self.pinned_slots.insert(context, other);
                        None
                    }
                    None => None,
                },
            };
            if nodes.is_some() {
                self.ops.push(HostOp::TakeNodes(from));
            }
            nodes
        }

        fn adopt_nodes(
            &mut self,
            widget: WidgetId,
            to: SurfaceLocation,
            nodes: WidgetNodes,
        ) -> Result<(), RelocateError> {
            match to {
                SurfaceLocation::Primary => {
                    self.ops.push(HostOp::AdoptNodes(to));
                    self.primary_slots.insert(widget, nodes);
                    Ok(())
                }
                SurfaceLocation::Pinned(context) => {
                    if self.fail_pinned_adopt {
                        // Custody contract: failed adoption parks the
                        // nodes back at Primary.
                        self.primary_slots.insert(widget, nodes);
                        return Err(RelocateError::SurfaceRequest("adoption failed".into()));
                    }
                    self.ops.push(HostOp::AdoptNodes(to));
                    self.pinned_slots.insert(context, (widget, nodes));
                    Ok(())
                }
            }
        }

        fn nodes_mut(&mut self, widget: WidgetId) -> Option<&mut WidgetNodes> {
            if let Some(nodes) = self.primary_slots.get_mut(&widget) {
                return Some(nodes);
            }
            self.pinned_slots
                .values_mut()
                .find(|(w, _)| *w == widget)
                .map(|(_, nodes)| nodes)
        }

        fn set_placeholder(&mut self, widget: WidgetId, text: Option<String>) {
            self.ops.push(HostOp::SetPlaceholder(text.is_some()));
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
                width: 120,
                height: 40,
            }
        }
    }

    impl InputRouter for SimHost {
        fn bind(
            &mut self,
            widget: WidgetId,
            scope: SurfaceLocation,
            control: ControlId,
        ) -> SubscriptionId {
            self.next_subscription += 1;
            let id = SubscriptionId(self.next_subscription);
            self.bindings.insert(id, (widget, scope, control));
            self.ops.push(HostOp::Bind(control, scope));
            id
        }

        fn unbind(&mut self, subscription: SubscriptionId) {
            if let Some((_, scope, control)) = self.bindings.remove(&subscription) {
                self.ops.push(HostOp::Unbind(control, scope));
            }
        }

        fn claim_shortcuts(&mut self, widget: WidgetId, scope: SurfaceLocation) -> SubscriptionId {
            self.next_subscription += 1;
            let id = SubscriptionId(self.next_subscription);
            self.claims.insert(id, (widget, scope));
            self.ops.push(HostOp::Claim(scope));
            id
        }

        fn release_shortcuts(&mut self, subscription: SubscriptionId) {
            if let Some((_, scope)) = self.claims.remove(&subscription) {
                self.ops.push(HostOp::Release(scope));
            }
        }
    }
}

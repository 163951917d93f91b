//! Surface relocation.
//!
//! [`SurfaceBinding`] tracks which rendering context owns a widget's
//! nodes and input bindings, and moves both between the primary surface
//! and a pinned always-on-top context.
//!
//! Two rules shape the protocol:
//!
//! - Every step that can fail (capability check, surface request, theme
//!   install, node move) happens before any existing binding is touched.
//!   Binding and claiming are infallible registry inserts, so there is
//!   no window in which a control has zero live bindings.
//! - Restore is guarded by a latch. The pinned context's teardown signal
//!   may arrive more than once, and the host may or may not have moved
//!   the nodes back itself; the restore runs exactly once per pinned
//!   session either way.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::RelocateError;
use crate::host::{ContextId, InputRouter, SubscriptionId, SurfaceHost, SurfaceLocation};
use crate::surface::{ControlId, Theme, PINNED_EXTENT};
use crate::widget::WidgetId;

/// Text shown at Primary while the widget lives on a pinned surface.
pub const PLACEHOLDER_TEXT: &str = "Timer pinned on top";

/// Which context owns a widget's nodes and bindings.
#[derive(Debug)]
pub struct SurfaceBinding {
    location: SurfaceLocation,
    controls: HashMap<ControlId, SubscriptionId>,
    /// Ownership token for global shortcuts. Exactly one claim is live
    /// at any time, scoped to the surface that owns input.
    shortcuts: Option<SubscriptionId>,
    /// Latch: true once the current pinned session has been restored
    /// (or when there is no pinned session to restore).
    restore_done: bool,
}

impl SurfaceBinding {
    /// Bind every control and claim shortcuts at Primary.
    pub fn bind_primary(widget: WidgetId, router: &mut impl InputRouter) -> Self {
        let mut binding = Self {
            location: SurfaceLocation::Primary,
            controls: HashMap::new(),
            shortcuts: None,
            restore_done: true,
        };
        binding.rebind(widget, router, SurfaceLocation::Primary);
        binding
    }

    pub fn location(&self) -> SurfaceLocation {
        self.location
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self.location, SurfaceLocation::Pinned(_))
    }

    pub fn pinned_context(&self) -> Option<ContextId> {
        match self.location {
            SurfaceLocation::Pinned(context) => Some(context),
            SurfaceLocation::Primary => None,
        }
    }

    pub fn live_control_count(&self) -> usize {
        self.controls.len()
    }

    /// Drop all bindings at the current scope and register fresh ones at
    /// `scope`. Stale subscriptions are removed before any new one is
    /// created, and the shortcut claim is released before it is
    /// re-claimed, so neither scope ever holds input twice.
    fn rebind(&mut self, widget: WidgetId, router: &mut impl InputRouter, scope: SurfaceLocation) {
        for control in ControlId::ALL {
            if let Some(subscription) = self.controls.remove(&control) {
                router.unbind(subscription);
            }
        }
        if let Some(claim) = self.shortcuts.take() {
            router.release_shortcuts(claim);
        }
        for control in ControlId::ALL {
            let subscription = router.bind(widget, scope, control);
            self.controls.insert(control, subscription);
        }
        self.shortcuts = Some(router.claim_shortcuts(widget, scope));
    }

    /// Move the widget onto a fresh pinned context.
    ///
    /// On any error the widget remains fully bound at its current
    /// location, and any partially-created pinned context is closed.
    pub fn relocate_to_pinned<H: SurfaceHost + InputRouter>(
        &mut self,
        widget: WidgetId,
        theme: &Theme,
        host: &mut H,
    ) -> Result<ContextId, RelocateError> {
        if self.is_pinned() {
            return Err(RelocateError::AlreadyPinned);
        }
        if !host.pinned_capability() {
            return Err(RelocateError::CapabilityUnavailable);
        }

        let context = host.request_pinned(widget, PINNED_EXTENT)?;
        if let Err(e) = host.install_theme(context, theme) {
            host.close_pinned(context);
            return Err(e);
        }
        let nodes = match host.take_nodes(widget, SurfaceLocation::Primary) {
            Some(nodes) => nodes,
            None => {
                host.close_pinned(context);
                return Err(RelocateError::NodesUnavailable {
                    surface: SurfaceLocation::Primary.name(),
                });
            }
        };
        if let Err(e) = host.adopt_nodes(widget, SurfaceLocation::Pinned(context), nodes) {
            // Adoption failure parks the nodes back at Primary.
            host.close_pinned(context);
            return Err(e);
        }
        // The pinned chrome owns closing; the widget's own pin and close
        // controls disappear until restore.
        if let Some(nodes) = host.nodes_mut(widget) {
            nodes.set_hidden(ControlId::Pin, true);
            nodes.set_hidden(ControlId::Close, true);
        }

        // Past this point nothing can fail.
        self.rebind(widget, host, SurfaceLocation::Pinned(context));
        host.set_placeholder(widget, Some(PLACEHOLDER_TEXT.to_string()));
        self.location = SurfaceLocation::Pinned(context);
        self.restore_done = false;
        debug!(?context, "widget relocated to pinned surface");
        Ok(context)
    }

    /// Restore the widget to Primary after its pinned context closed.
    ///
    /// Returns whether a restore was performed. Signals for a context
    /// the widget no longer occupies, and repeats of a signal already
    /// handled, return false and change nothing.
    pub fn on_pinned_closed<H: SurfaceHost + InputRouter>(
        &mut self,
        widget: WidgetId,
        context: ContextId,
        host: &mut H,
    ) -> bool {
        if self.location != SurfaceLocation::Pinned(context) {
            return false;
        }
        if self.restore_done {
            return false;
        }
        self.restore_done = true;

        // The host may have moved the nodes back to Primary itself
        // during teardown; recover them from wherever they are.
        match host.take_nodes(widget, SurfaceLocation::Pinned(context)) {
            Some(mut nodes) => {
                nodes.set_hidden(ControlId::Pin, false);
                nodes.set_hidden(ControlId::Close, false);
                if let Err(e) = host.adopt_nodes(widget, SurfaceLocation::Primary, nodes) {
                    // Custody contract parks them at Primary regardless.
                    warn!(error = %e, "primary adoption reported failure during restore");
                }
            }
            None => match host.nodes_mut(widget) {
                Some(nodes) => {
                    nodes.set_hidden(ControlId::Pin, false);
                    nodes.set_hidden(ControlId::Close, false);
                }
                None => {
                    warn!("widget nodes lost during pinned teardown");
                }
            },
        }
        host.set_placeholder(widget, None);
        self.rebind(widget, host, SurfaceLocation::Primary);
        // Idempotent; covers restores initiated from the widget side.
        host.close_pinned(context);
        self.location = SurfaceLocation::Primary;
        debug!(?context, "widget restored to primary surface");
        true
    }

    /// Release everything this binding holds. Called when the widget is
    /// closed; afterwards no binding, claim, context or placeholder of
    /// this widget survives in the host.
    pub fn teardown<H: SurfaceHost + InputRouter>(&mut self, widget: WidgetId, host: &mut H) {
        for control in ControlId::ALL {
            if let Some(subscription) = self.controls.remove(&control) {
                host.unbind(subscription);
            }
        }
        if let Some(claim) = self.shortcuts.take() {
            host.release_shortcuts(claim);
        }
        if let SurfaceLocation::Pinned(context) = self.location {
            host.take_nodes(widget, SurfaceLocation::Pinned(context));
            host.close_pinned(context);
            host.set_placeholder(widget, None);
        } else {
            host.take_nodes(widget, SurfaceLocation::Primary);
        }
        self.restore_done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{HostOp, SimHost};
    use crate::surface::{Position, WidgetNodes};

    fn setup(host: &mut SimHost) -> (WidgetId, SurfaceBinding) {
        let widget = WidgetId::new();
        let nodes = WidgetNodes::new(Position { x: 2, y: 1 });
        host.adopt_nodes(widget, SurfaceLocation::Primary, nodes)
            .expect("primary adoption cannot fail");
        let binding = SurfaceBinding::bind_primary(widget, host);
        (widget, binding)
    }

    #[test]
    fn bind_primary_covers_every_control() {
        let mut host = SimHost::with_capability();
        let (widget, binding) = setup(&mut host);
        assert_eq!(binding.live_control_count(), ControlId::ALL.len());
        for control in ControlId::ALL {
            assert_eq!(
                host.live_bindings(widget, control),
                vec![SurfaceLocation::Primary]
            );
        }
        assert_eq!(host.shortcut_scopes(widget), vec![SurfaceLocation::Primary]);
    }

    #[test]
    fn pin_moves_every_binding_to_pinned() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        let context = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();

        for control in ControlId::ALL {
            assert_eq!(
                host.live_bindings(widget, control),
                vec![SurfaceLocation::Pinned(context)]
            );
        }
        assert_eq!(
            host.shortcut_scopes(widget),
            vec![SurfaceLocation::Pinned(context)]
        );
        assert_eq!(host.placeholder(widget), Some(PLACEHOLDER_TEXT));
        assert!(host.theme_of(context).is_some());
        let nodes = host.pinned_nodes(context).unwrap();
        assert!(nodes.is_hidden(ControlId::Pin));
        assert!(nodes.is_hidden(ControlId::Close));
        assert!(host.primary_nodes(widget).is_none());
    }

    #[test]
    fn round_trip_restores_identical_binding_set() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        let tag = host.primary_nodes(widget).unwrap().tag();

        let context = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();
        assert!(binding.on_pinned_closed(widget, context, &mut host));

        assert_eq!(binding.location(), SurfaceLocation::Primary);
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
        for control in ControlId::ALL {
            assert_eq!(
                host.live_bindings(widget, control),
                vec![SurfaceLocation::Primary]
            );
        }
        assert_eq!(host.shortcut_scopes(widget), vec![SurfaceLocation::Primary]);
        assert_eq!(host.placeholder(widget), None);
        assert!(host.open_contexts().is_empty());

        let nodes = host.primary_nodes(widget).unwrap();
        assert_eq!(nodes.tag(), tag);
        assert!(!nodes.is_hidden(ControlId::Pin));
        assert!(!nodes.is_hidden(ControlId::Close));
    }

    #[test]
    fn fallible_steps_precede_any_unbind() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();

        let first_unbind = host
            .first_op(|op| matches!(op, HostOp::Unbind(..)))
            .unwrap();
        for op in [
            host.first_op(|op| matches!(op, HostOp::RequestPinned(_))),
            host.first_op(|op| matches!(op, HostOp::InstallTheme(_))),
            host.first_op(|op| matches!(op, HostOp::TakeNodes(SurfaceLocation::Primary))),
            host.first_op(|op| matches!(op, HostOp::AdoptNodes(SurfaceLocation::Pinned(_)))),
        ] {
            assert!(op.unwrap() < first_unbind);
        }
    }

    #[test]
    fn shortcut_claim_released_before_reclaimed() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();

        let release = host
            .last_op(|op| matches!(op, HostOp::Release(SurfaceLocation::Primary)))
            .unwrap();
        let claim = host
            .first_op(|op| matches!(op, HostOp::Claim(SurfaceLocation::Pinned(_))))
            .unwrap();
        assert!(release < claim);

        let first_unbind = host
            .first_op(|op| matches!(op, HostOp::Unbind(..)))
            .unwrap();
        let first_pinned_bind = host
            .first_op(|op| matches!(op, HostOp::Bind(_, SurfaceLocation::Pinned(_))))
            .unwrap();
        assert!(first_unbind < first_pinned_bind);
    }

    #[test]
    fn duplicate_close_signal_restores_once() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        let context = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();

        assert!(binding.on_pinned_closed(widget, context, &mut host));
        assert!(!binding.on_pinned_closed(widget, context, &mut host));
        assert!(!binding.on_pinned_closed(widget, context, &mut host));

        // No duplicated bindings from the repeated signals.
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
        assert_eq!(host.shortcut_scopes(widget), vec![SurfaceLocation::Primary]);
    }

    #[test]
    fn close_signal_for_stale_context_is_ignored() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        let context = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();

        assert!(!binding.on_pinned_closed(widget, ContextId(context.0 + 40), &mut host));
        assert!(binding.is_pinned());
    }

    #[test]
    fn close_signal_while_primary_is_ignored() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        assert!(!binding.on_pinned_closed(widget, ContextId(1), &mut host));
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
    }

    #[test]
    fn auto_readopting_host_round_trips_cleanly() {
        let mut host = SimHost::with_capability();
        host.auto_readopt = true;
        let (widget, mut binding) = setup(&mut host);
        let tag = host.primary_nodes(widget).unwrap().tag();
        let context = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();

        // Host closes the context itself and readopts the nodes, then
        // delivers the teardown signal.
        host.close_pinned(context);
        assert!(binding.on_pinned_closed(widget, context, &mut host));

        let nodes = host.primary_nodes(widget).unwrap();
        assert_eq!(nodes.tag(), tag);
        assert!(!nodes.is_hidden(ControlId::Pin));
        assert!(!nodes.is_hidden(ControlId::Close));
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
    }

    #[test]
    fn missing_capability_keeps_primary_untouched() {
        let mut host = SimHost::default();
        let (widget, mut binding) = setup(&mut host);
        let result = binding.relocate_to_pinned(widget, &Theme::default(), &mut host);
        assert_eq!(result.unwrap_err(), RelocateError::CapabilityUnavailable);
        assert_eq!(binding.location(), SurfaceLocation::Primary);
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
        assert!(host.first_op(|op| matches!(op, HostOp::RequestPinned(_))).is_none());
    }

    #[test]
    fn surface_request_failure_keeps_primary_untouched() {
        let mut host = SimHost::with_capability();
        host.fail_request = true;
        let (widget, mut binding) = setup(&mut host);
        let result = binding.relocate_to_pinned(widget, &Theme::default(), &mut host);
        assert!(matches!(result, Err(RelocateError::SurfaceRequest(_))));
        assert_eq!(binding.location(), SurfaceLocation::Primary);
        assert!(host.primary_nodes(widget).is_some());
        assert_eq!(host.placeholder(widget), None);
        assert!(host.first_op(|op| matches!(op, HostOp::Unbind(..))).is_none());
    }

    #[test]
    fn theme_failure_closes_fresh_context() {
        let mut host = SimHost::with_capability();
        host.fail_theme = true;
        let (widget, mut binding) = setup(&mut host);
        let result = binding.relocate_to_pinned(widget, &Theme::default(), &mut host);
        assert!(result.is_err());
        assert!(host.open_contexts().is_empty());
        assert!(host.primary_nodes(widget).is_some());
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
    }

    #[test]
    fn adoption_failure_rolls_back_to_primary() {
        let mut host = SimHost::with_capability();
        host.fail_pinned_adopt = true;
        let (widget, mut binding) = setup(&mut host);
        let tag = host.primary_nodes(widget).unwrap().tag();
        let result = binding.relocate_to_pinned(widget, &Theme::default(), &mut host);
        assert!(result.is_err());
        assert_eq!(binding.location(), SurfaceLocation::Primary);
        assert!(host.open_contexts().is_empty());
        let nodes = host.primary_nodes(widget).unwrap();
        assert_eq!(nodes.tag(), tag);
        assert!(!nodes.is_hidden(ControlId::Pin));
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
        assert_eq!(host.placeholder(widget), None);
    }

    #[test]
    fn pin_while_pinned_is_rejected() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();
        let result = binding.relocate_to_pinned(widget, &Theme::default(), &mut host);
        assert_eq!(result.unwrap_err(), RelocateError::AlreadyPinned);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();
        binding.teardown(widget, &mut host);

        assert_eq!(host.total_bindings(widget), 0);
        assert!(host.shortcut_scopes(widget).is_empty());
        assert!(host.open_contexts().is_empty());
        assert_eq!(host.placeholder(widget), None);
        assert!(host.primary_nodes(widget).is_none());
    }

    #[test]
    fn repin_after_restore_works() {
        let mut host = SimHost::with_capability();
        let (widget, mut binding) = setup(&mut host);
        let first = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();
        assert!(binding.on_pinned_closed(widget, first, &mut host));
        let second = binding
            .relocate_to_pinned(widget, &Theme::default(), &mut host)
            .unwrap();
        assert_ne!(first, second);
        assert!(binding.is_pinned());
        assert_eq!(host.total_bindings(widget), ControlId::ALL.len());
    }
}

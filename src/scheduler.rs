//! The entry point for hosts.

use crate::component_descriptor::ComponentDescriptorRegistry;
use crate::differ::DifferentiatorMode;
use crate::layout::{LayoutConstraints, LayoutEngine};
use crate::mounting_coordinator::MountingCoordinator;
use crate::shadow_tree::CommitStatus;
use crate::ui_manager::{UIManager, UIManagerConfig, UIManagerDelegate, UIManagerError};
use crate::SurfaceId;
use core::fmt;
use log::{info, trace};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Scheduler configuration.
#[derive(Clone)]
pub struct SchedulerConfig {
    pub differentiator_mode: DifferentiatorMode,
    /// Progress every committed node to the most recent state of its family.
    pub enable_state_reconciliation: bool,
    /// Layout engine run on every commit. Without one, frames are taken as given.
    pub layout_engine: Option<Arc<dyn LayoutEngine>>,
}

impl Default for SchedulerConfig {
    fn default() -> SchedulerConfig {
        SchedulerConfig {
            differentiator_mode: DifferentiatorMode::default(),
            enable_state_reconciliation: true,
            layout_engine: None,
        }
    }
}

impl fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("differentiator_mode", &self.differentiator_mode)
            .field("enable_state_reconciliation", &self.enable_state_reconciliation)
            .field("layout_engine", &self.layout_engine.is_some())
            .finish()
    }
}

/// Receives a mounting coordinator whenever one of its surfaces has a new transaction.
///
/// Called on the committing thread; implementations should schedule a pull rather than mount
/// synchronously.
pub trait SchedulerDelegate: Send + Sync {
    fn scheduler_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>);
}

/// Owns the [`UIManager`] and forwards finished transactions to the host.
pub struct Scheduler {
    ui_manager: Arc<UIManager>,
    delegate: RwLock<Option<Weak<dyn SchedulerDelegate>>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, registry: Arc<ComponentDescriptorRegistry>) -> Arc<Scheduler> {
        let ui_manager = UIManager::new(
            registry,
            UIManagerConfig {
                differentiator_mode: config.differentiator_mode,
                enable_state_reconciliation: config.enable_state_reconciliation,
                layout_engine: config.layout_engine,
            },
        );
        let scheduler = Arc::new(Scheduler {
            ui_manager,
            delegate: RwLock::new(None),
        });
        let delegate: Weak<Scheduler> = Arc::downgrade(&scheduler);
        scheduler.ui_manager.set_delegate(delegate);
        scheduler
    }

    pub fn ui_manager(&self) -> &Arc<UIManager> {
        &self.ui_manager
    }

    pub fn set_delegate(&self, delegate: Weak<dyn SchedulerDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    /// Starts a surface. The returned coordinator is where its transactions can be pulled.
    pub fn start_surface(
        &self,
        surface_id: SurfaceId,
        layout_constraints: LayoutConstraints,
    ) -> Result<Arc<MountingCoordinator>, UIManagerError> {
        info!("starting surface {}", surface_id);
        self.ui_manager.start_surface(surface_id, layout_constraints)
    }

    /// Stops a surface. Transactions not pulled yet are dropped.
    pub fn stop_surface(&self, surface_id: SurfaceId) -> Result<(), UIManagerError> {
        info!("stopping surface {}", surface_id);
        self.ui_manager.stop_surface(surface_id)
    }

    /// Changes the layout constraints of a surface.
    pub fn constrain_layout(
        &self,
        surface_id: SurfaceId,
        layout_constraints: LayoutConstraints,
    ) -> Result<CommitStatus, UIManagerError> {
        self.ui_manager.set_constraints(surface_id, layout_constraints)
    }
}

impl UIManagerDelegate for Scheduler {
    fn ui_manager_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>) {
        let delegate = self.delegate.read().as_ref().and_then(Weak::upgrade);
        match delegate {
            Some(delegate) => delegate.scheduler_did_finish_transaction(coordinator),
            None => trace!(
                "surface {}: no scheduler delegate; transaction stays queued",
                coordinator.surface_id()
            ),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("ui_manager", &self.ui_manager)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FillLayout;
    use crate::mutation::ShadowViewMutation;
    use crate::raw_props::RawProps;
    use crate::rect::Rect;
    use cgmath::Vector2;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Host {
        notified: Mutex<Vec<(SurfaceId, usize)>>,
    }

    impl SchedulerDelegate for Host {
        fn scheduler_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>) {
            let pulled = coordinator.pull().map_or(0, |t| t.mutations().len());
            self.notified.lock().push((coordinator.surface_id(), pulled));
        }
    }

    #[test]
    fn test_delegate_chain() {
        let scheduler = Scheduler::new(
            SchedulerConfig {
                layout_engine: Some(Arc::new(FillLayout)),
                ..SchedulerConfig::default()
            },
            Arc::new(ComponentDescriptorRegistry::with_defaults()),
        );
        let host = Arc::new(Host::default());
        let weak_host: Weak<Host> = Arc::downgrade(&host);
        scheduler.set_delegate(weak_host);

        let coordinator = scheduler
            .start_surface(1, LayoutConstraints::exact(Vector2::new(320., 480.)))
            .expect("surface should start");
        assert_eq!(
            coordinator.pull().map(|t| t.number()),
            Some(0),
            "the initial transaction is queued without a commit"
        );

        let ui_manager = scheduler.ui_manager();
        let child = ui_manager
            .create_node(2, "View", 1, &RawProps::new())
            .expect("View should be registered");
        assert_eq!(
            ui_manager.complete_surface(1, vec![child]),
            Ok(CommitStatus::Succeeded)
        );
        assert_eq!(*host.notified.lock(), vec![(1, 3)], "create, insert and the layout update");

        let status = scheduler
            .constrain_layout(1, LayoutConstraints::exact(Vector2::new(480., 320.)))
            .expect("surface is running");
        assert_eq!(status, CommitStatus::Succeeded);
        let child = ui_manager.find_node(1, 2).expect("child should be committed");
        assert_eq!(child.layout_metrics().frame, Rect::from_xywh(0., 0., 480., 320.));

        scheduler.stop_surface(1).expect("surface is running");
        assert!(coordinator.is_revoked());
        assert_eq!(
            scheduler.constrain_layout(1, LayoutConstraints::default()),
            Err(UIManagerError::NoSuchSurface(1))
        );
    }

    #[test]
    fn test_transactions_wait_without_delegate() {
        let scheduler = Scheduler::new(
            SchedulerConfig::default(),
            Arc::new(ComponentDescriptorRegistry::with_defaults()),
        );
        let coordinator = scheduler
            .start_surface(3, LayoutConstraints::default())
            .expect("surface should start");
        let child = scheduler
            .ui_manager()
            .create_node(4, "View", 3, &RawProps::new())
            .expect("View should be registered");
        scheduler
            .ui_manager()
            .complete_surface(3, vec![child])
            .expect("surface is running");

        let transaction = coordinator.pull().expect("transactions should be queued");
        assert_eq!(transaction.number(), 1);
        assert!(matches!(
            transaction.mutations().first(),
            Some(ShadowViewMutation::Create { .. })
        ));
    }
}

use crate::backend::HeadlessBackend;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use weft::mounting_transaction::TransactionNumber;
use weft::{MountingCoordinator, MountingManager, SchedulerDelegate, SurfaceId};

type Managers = Arc<Mutex<HashMap<SurfaceId, MountingManager<HeadlessBackend>>>>;

enum Message {
    Mount(Weak<MountingCoordinator>),
    Stop,
}

/// Mounts surfaces into headless backends on a dedicated thread.
///
/// Register it as the scheduler delegate and attach every surface after starting it. Each
/// notification makes the mount thread pull from the surface's coordinator and apply what it got.
pub struct HeadlessHost {
    sender: Sender<Message>,
    mounted: Receiver<(SurfaceId, TransactionNumber)>,
    managers: Managers,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl HeadlessHost {
    /// Creates a new host and starts its mount thread.
    pub fn new() -> Arc<HeadlessHost> {
        let (sender, receiver) = channel::unbounded();
        let (mounted_sender, mounted) = channel::unbounded();
        let managers: Managers = Arc::new(Mutex::new(HashMap::new()));

        let thread = {
            let managers = Arc::clone(&managers);
            thread::spawn(move || mount_loop(receiver, mounted_sender, managers))
        };

        Arc::new(HeadlessHost {
            sender,
            mounted,
            managers,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Starts mounting a surface, beginning with whatever its coordinator has queued.
    pub fn attach(&self, coordinator: &Arc<MountingCoordinator>) {
        let surface_id = coordinator.surface_id();
        self.managers
            .lock()
            .entry(surface_id)
            .or_insert_with(|| MountingManager::new(surface_id, HeadlessBackend::new()));
        self.schedule(coordinator);
    }

    /// Stops mounting a surface and drops its views.
    pub fn detach(&self, surface_id: SurfaceId) {
        self.managers.lock().remove(&surface_id);
    }

    fn schedule(&self, coordinator: &Arc<MountingCoordinator>) {
        if self.sender.send(Message::Mount(Arc::downgrade(coordinator))).is_err() {
            warn!(
                "surface {}: mount thread is gone; transaction stays queued",
                coordinator.surface_id()
            );
        }
    }

    /// The last transaction mounted for a surface.
    pub fn last_transaction(&self, surface_id: SurfaceId) -> Option<TransactionNumber> {
        self.managers
            .lock()
            .get(&surface_id)
            .and_then(|manager| manager.last_transaction())
    }

    /// Waits until transaction `number` (or a newer one) of a surface has been mounted.
    ///
    /// Returns false on timeout.
    pub fn wait_for_transaction(
        &self,
        surface_id: SurfaceId,
        number: TransactionNumber,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.last_transaction(surface_id).map_or(false, |last| last >= number) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.mounted.recv_timeout(remaining) {
                Ok(_) => (),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return self.last_transaction(surface_id).map_or(false, |last| last >= number)
                }
            }
        }
    }

    /// Renders the mounted hierarchy of a surface.
    pub fn describe(&self, surface_id: SurfaceId) -> Option<String> {
        self.managers
            .lock()
            .get(&surface_id)
            .map(|manager| manager.backend().describe(surface_id))
    }

    /// Runs a closure with the backend of a surface.
    pub fn with_backend<F, R>(&self, surface_id: SurfaceId, f: F) -> Option<R>
    where
        F: FnOnce(&HeadlessBackend) -> R,
    {
        self.managers
            .lock()
            .get(&surface_id)
            .map(|manager| f(manager.backend()))
    }

    /// Stops the mount thread. Transactions that were not mounted yet stay in their coordinators.
    pub fn shutdown(&self) {
        let _ = self.sender.send(Message::Stop);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                error!("mount thread panicked");
            }
        }
    }
}

impl SchedulerDelegate for HeadlessHost {
    fn scheduler_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>) {
        self.schedule(coordinator);
    }
}

impl Drop for HeadlessHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn mount_loop(
    receiver: Receiver<Message>,
    mounted: Sender<(SurfaceId, TransactionNumber)>,
    managers: Managers,
) {
    loop {
        let coordinator = match receiver.recv() {
            Ok(Message::Mount(coordinator)) => coordinator,
            Ok(Message::Stop) | Err(_) => break,
        };
        let coordinator = match coordinator.upgrade() {
            Some(coordinator) => coordinator,
            None => continue,
        };
        let surface_id = coordinator.surface_id();
        let mut managers = managers.lock();
        // not attached yet, or detached; attach() reschedules the pull
        let manager = match managers.get_mut(&surface_id) {
            Some(manager) => manager,
            None => {
                debug!("surface {}: not attached, leaving transactions queued", surface_id);
                continue;
            }
        };
        // earlier notifications may already have taken everything
        let transaction = match coordinator.pull() {
            Some(transaction) => transaction,
            None => continue,
        };
        match manager.apply(&transaction) {
            Ok(()) => {
                let _ = mounted.send((surface_id, transaction.number()));
            }
            Err(err) => error!(
                "surface {}: failed to mount transaction {}: {}",
                surface_id,
                transaction.number(),
                err
            ),
        }
    }
    debug!("mount thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector2;
    use weft::layout::FillLayout;
    use weft::{
        CommitStatus, ComponentDescriptorRegistry, LayoutConstraints, RawProps, Scheduler,
        SchedulerConfig,
    };

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn setup() -> (Arc<Scheduler>, Arc<HeadlessHost>) {
        let scheduler = Scheduler::new(
            SchedulerConfig {
                layout_engine: Some(Arc::new(FillLayout)),
                ..SchedulerConfig::default()
            },
            Arc::new(ComponentDescriptorRegistry::with_defaults()),
        );
        let host = HeadlessHost::new();
        let delegate: Weak<HeadlessHost> = Arc::downgrade(&host);
        scheduler.set_delegate(delegate);
        (scheduler, host)
    }

    #[test]
    fn test_end_to_end() {
        let (scheduler, host) = setup();
        let coordinator = scheduler
            .start_surface(1, LayoutConstraints::exact(Vector2::new(200., 100.)))
            .expect("surface should start");
        host.attach(&coordinator);
        assert!(host.wait_for_transaction(1, 0, TIMEOUT), "root should be mounted");

        let ui_manager = scheduler.ui_manager();
        let mut container = ui_manager
            .create_node(2, "View", 1, &RawProps::new())
            .expect("View should be registered");
        let child = ui_manager
            .create_node(3, "View", 1, &RawProps::new().with("opacity", 0.5))
            .expect("View should be registered");
        ui_manager
            .append_child(&mut container, child)
            .expect("fresh node should be exclusively owned");
        assert_eq!(
            ui_manager.complete_surface(1, vec![container]),
            Ok(CommitStatus::Succeeded)
        );
        assert!(host.wait_for_transaction(1, 1, TIMEOUT), "commit should be mounted");
        assert_eq!(
            host.describe(1).as_deref(),
            Some("RootView [1] 0,0 200x100\n  View [2] 0,0 200x100\n    View [3] 0,0 200x100 opacity 0.5\n")
        );

        scheduler
            .constrain_layout(1, LayoutConstraints::exact(Vector2::new(50., 60.)))
            .expect("surface is running");
        assert!(host.wait_for_transaction(1, 2, TIMEOUT), "resize should be mounted");
        assert_eq!(
            host.with_backend(1, |backend| backend.root(1).map(|root| root.frame.size)),
            Some(Some(Vector2::new(50., 60.)))
        );

        let root = ui_manager
            .shadow_tree(1)
            .expect("surface is running")
            .root();
        let unchanged = ui_manager.complete_surface(1, root.children().to_vec());
        assert_eq!(
            unchanged,
            Ok(CommitStatus::Succeeded),
            "a new root revision is committed even with the same children"
        );
        assert!(host.wait_for_transaction(1, 3, TIMEOUT));
        assert_eq!(
            host.with_backend(1, |backend| backend.view_count()),
            Some(3),
            "no views are recreated for an identical tree"
        );
    }

    #[test]
    fn test_commit_before_attach() {
        let (scheduler, host) = setup();
        let coordinator = scheduler
            .start_surface(7, LayoutConstraints::exact(Vector2::new(30., 40.)))
            .expect("surface should start");
        let child = scheduler
            .ui_manager()
            .create_node(8, "View", 7, &RawProps::new())
            .expect("View should be registered");
        assert_eq!(
            scheduler.ui_manager().complete_surface(7, vec![child]),
            Ok(CommitStatus::Succeeded)
        );
        // let the mount thread see the notification for the unattached surface
        thread::sleep(Duration::from_millis(50));
        assert!(coordinator.has_pending_transactions(), "nothing is pulled before attach");

        host.attach(&coordinator);
        assert!(host.wait_for_transaction(7, 1, TIMEOUT), "queued commits mount after attach");
        assert_eq!(
            host.describe(7).as_deref(),
            Some("RootView [7] 0,0 30x40\n  View [8] 0,0 30x40\n")
        );
    }

    #[test]
    fn test_surfaces_are_independent() {
        let (scheduler, host) = setup();
        for surface_id in [10, 20] {
            let coordinator = scheduler
                .start_surface(surface_id, LayoutConstraints::exact(Vector2::new(10., 10.)))
                .expect("surface should start");
            host.attach(&coordinator);
            let child = scheduler
                .ui_manager()
                .create_node(surface_id + 1, "View", surface_id, &RawProps::new())
                .expect("View should be registered");
            scheduler
                .ui_manager()
                .complete_surface(surface_id, vec![child])
                .expect("surface is running");
        }
        assert!(host.wait_for_transaction(10, 1, TIMEOUT));
        assert!(host.wait_for_transaction(20, 1, TIMEOUT));
        assert_eq!(
            host.describe(20).as_deref(),
            Some("RootView [20] 0,0 10x10\n  View [21] 0,0 10x10\n")
        );

        scheduler.stop_surface(10).expect("surface is running");
        host.detach(10);
        assert_eq!(host.describe(10), None);
        assert!(host.describe(20).is_some(), "other surfaces keep running");

        host.shutdown();
        assert!(!host.wait_for_transaction(20, 5, Duration::from_millis(10)));
    }
}

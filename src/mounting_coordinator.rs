use crate::mounting_transaction::MountingTransaction;
use crate::SurfaceId;
use core::sync::atomic::{AtomicBool, Ordering};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::debug;
use parking_lot::Mutex;
use std::time::Duration;

/// Hands mounting transactions of one surface from the committing side to the mounting side.
///
/// Transactions are queued in commit order. A pull takes everything that is queued and merges
/// it into a single transaction carrying the newest transaction number, so a slow consumer
/// skips numbers but never sees them out of order and never loses mutations.
///
/// Once revoked (when the surface stops), pending transactions are dropped and pulls return
/// nothing.
pub struct MountingCoordinator {
    surface_id: SurfaceId,
    sender: Sender<MountingTransaction>,
    receiver: Receiver<MountingTransaction>,
    pull_lock: Mutex<()>,
    revoked: AtomicBool,
}

impl MountingCoordinator {
    pub fn new(surface_id: SurfaceId) -> MountingCoordinator {
        let (sender, receiver) = channel::unbounded();
        MountingCoordinator {
            surface_id,
            sender,
            receiver,
            pull_lock: Mutex::new(()),
            revoked: AtomicBool::new(false),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Queues a transaction.
    ///
    /// # Panics
    /// - if the transaction belongs to another surface
    pub fn push(&self, transaction: MountingTransaction) {
        assert_eq!(
            transaction.surface_id(),
            self.surface_id,
            "transaction pushed to the coordinator of another surface"
        );
        if self.is_revoked() {
            debug!(
                "surface {}: dropping transaction {} pushed after revocation",
                self.surface_id,
                transaction.number()
            );
            return;
        }
        // the receiver lives as long as the sender, so this can not fail
        let _ = self.sender.send(transaction);
    }

    /// Takes all pending transactions, merged into one. Does not block.
    pub fn pull(&self) -> Option<MountingTransaction> {
        let _lock = self.pull_lock.lock();
        if self.is_revoked() {
            self.drain();
            return None;
        }
        let transaction = match self.receiver.try_recv() {
            Ok(transaction) => transaction,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        };
        Some(self.coalesce(transaction))
    }

    /// Like [`pull`](MountingCoordinator::pull), but waits up to `timeout` for a transaction to
    /// arrive.
    pub fn pull_timeout(&self, timeout: Duration) -> Option<MountingTransaction> {
        let _lock = self.pull_lock.lock();
        if self.is_revoked() {
            self.drain();
            return None;
        }
        let transaction = match self.receiver.recv_timeout(timeout) {
            Ok(transaction) => transaction,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
        };
        if self.is_revoked() {
            self.drain();
            return None;
        }
        Some(self.coalesce(transaction))
    }

    fn coalesce(&self, mut transaction: MountingTransaction) -> MountingTransaction {
        let first = transaction.number();
        let mut count = 1;
        loop {
            match self.receiver.try_recv() {
                Ok(next) => {
                    transaction.merge(next);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if count > 1 {
            debug!(
                "surface {}: coalesced {} transactions ({}..={})",
                self.surface_id,
                count,
                first,
                transaction.number()
            );
        }
        transaction
    }

    fn drain(&self) {
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            debug!(
                "surface {}: dropped {} pending transactions",
                self.surface_id, dropped
            );
        }
    }

    /// Returns true if a pull would return something right now.
    pub fn has_pending_transactions(&self) -> bool {
        !self.is_revoked() && !self.receiver.is_empty()
    }

    /// Drops pending transactions and makes all further pulls return nothing.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
        let _lock = self.pull_lock.lock();
        self.drain();
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }
}

use crate::mutation::ShadowViewMutationList;
use crate::telemetry::TransactionTelemetry;
use crate::SurfaceId;

/// Sequence number of a transaction within a surface.
pub type TransactionNumber = u64;

/// The mutations produced by one or more commits of a surface, in order.
#[derive(Debug, Clone)]
pub struct MountingTransaction {
    surface_id: SurfaceId,
    number: TransactionNumber,
    mutations: ShadowViewMutationList,
    telemetry: TransactionTelemetry,
}

impl MountingTransaction {
    pub fn new(
        surface_id: SurfaceId,
        number: TransactionNumber,
        mutations: ShadowViewMutationList,
        telemetry: TransactionTelemetry,
    ) -> MountingTransaction {
        MountingTransaction {
            surface_id,
            number,
            mutations,
            telemetry,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// The number of the newest commit in this transaction.
    pub fn number(&self) -> TransactionNumber {
        self.number
    }

    pub fn mutations(&self) -> &ShadowViewMutationList {
        &self.mutations
    }

    /// Telemetry of the newest commit in this transaction.
    pub fn telemetry(&self) -> &TransactionTelemetry {
        &self.telemetry
    }

    pub fn into_mutations(self) -> ShadowViewMutationList {
        self.mutations
    }

    /// Appends a newer transaction to this one.
    ///
    /// # Panics
    /// - if the transactions belong to different surfaces
    /// - if `next` is not newer than this transaction
    pub fn merge(&mut self, next: MountingTransaction) {
        assert_eq!(
            self.surface_id, next.surface_id,
            "can not merge transactions of different surfaces"
        );
        assert!(
            next.number > self.number,
            "transaction {} can not be merged into newer transaction {}",
            next.number,
            self.number
        );
        self.number = next.number;
        self.mutations.extend(next.mutations);
        self.telemetry = next.telemetry;
    }
}

//! Result Assembler

use super::types::{FinalizedTransactions, TransferParams, TransferResult};

/// Package reference IDs with the finalized entries. Pure, cannot fail.
pub fn assemble(params: &TransferParams, finalized: FinalizedTransactions) -> TransferResult {
    TransferResult {
        source_reference_id: params.source_reference_id,
        destination_reference_id: params.destination_reference_id,
        fee_reference_id: params.fee_reference_id,
        source_transaction: finalized.outbound,
        destination_transaction: finalized.inbound,
        fee_transaction: finalized.fee,
    }
}

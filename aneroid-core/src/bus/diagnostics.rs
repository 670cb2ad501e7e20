//! Snapshot of the most recent bus transaction

/// Diagnostics for the most recent transaction
///
/// Overwritten (not appended) at the start of every transaction that
/// passes argument validation. Write and read legs are tracked
/// independently; abort bits are OR-accumulated across both legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransactionDiagnostics {
    /// Target 7-bit address
    pub address: u8,
    /// Bytes requested by the write leg
    pub write_requested: usize,
    /// Bytes the write leg actually moved
    pub write_completed: usize,
    /// Bytes requested by the read leg
    pub read_requested: usize,
    /// Bytes the read leg actually moved
    pub read_completed: usize,
    /// Raw result of the last leg (byte count, or negative fault code)
    pub controller_result: i32,
    /// Accumulated abort-source bits
    pub abort_source: u32,
    /// Transaction held the bus between legs (repeated start)
    pub nostop: bool,
}

impl TransactionDiagnostics {
    /// Start a fresh record for a new transaction
    pub(crate) fn begin(address: u8, write_requested: usize, read_requested: usize, nostop: bool) -> Self {
        Self {
            address,
            write_requested,
            read_requested,
            nostop,
            ..Self::default()
        }
    }

    /// Whether any abort was latched during the transaction
    pub fn aborted(&self) -> bool {
        self.abort_source != 0
    }
}

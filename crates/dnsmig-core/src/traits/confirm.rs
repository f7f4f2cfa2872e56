//! Confirmation gate
//!
//! Irreversible actions (nameserver switch, transfer unlock) and every step
//! of the `all` sequence after the first ask a [`Confirm`] before going ahead.
//! The binary answers from the terminal; tests script the answers.

/// Trait for confirmation ports
pub trait Confirm: Send + Sync {
    /// Ask whether to proceed
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Proceed
    /// - `Ok(false)`: Declined
    /// - `Err(Error)`: The answer could not be read
    fn confirm(&self, message: &str) -> Result<bool, crate::Error>;
}

/// Confirmation port that always proceeds
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, message: &str) -> Result<bool, crate::Error> {
        tracing::info!("{} [auto-confirmed]", message);
        Ok(true)
    }
}

//! Deterministic fault injection for transport delivery
//!
//! The protocol promises nothing about delivery, so tests need a way to
//! lose messages on purpose. Faults are applied when a payload is taken
//! off a lane, before it reaches the receiving channel.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: no randomness; a plan drops exactly the payloads
//!   it says it drops
//! - **Composable**: a plan holds any number of faults
//! - **Test-focused**: not intended for production use

/// A fault to inject into payload delivery
#[derive(Debug, Clone)]
pub enum MessageFault {
    /// Drop the next N payloads in either direction
    DropNext { count: usize },

    /// Drop every payload whose text contains the needle (for
    /// deterministic targeting of one method or transaction)
    DropMatching { needle: String },
}

/// A plan describing all faults to inject
///
/// Configured per-test; consulted once per delivery attempt.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: Vec<MessageFault>,
}

impl FaultPlan {
    /// Creates an empty plan (nothing is dropped)
    pub fn new() -> Self {
        Self { faults: Vec::new() }
    }

    /// Adds a fault to the plan
    pub fn with_fault(mut self, fault: MessageFault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Decides the fate of one payload, consuming drop budgets as it goes
    pub fn should_drop(&mut self, payload: &str) -> bool {
        for fault in &mut self.faults {
            match fault {
                MessageFault::DropNext { count } => {
                    if *count > 0 {
                        *count -= 1;
                        return true;
                    }
                }
                MessageFault::DropMatching { needle } => {
                    if payload.contains(needle.as_str()) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Returns true if no fault can fire any more
    pub fn is_exhausted(&self) -> bool {
        self.faults
            .iter()
            .all(|fault| matches!(fault, MessageFault::DropNext { count: 0 }))
    }
}

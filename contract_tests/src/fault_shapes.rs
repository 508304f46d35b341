//! Handler-fault normalization contract
//!
//! The `(error, message)` pair a remote caller receives is derived from
//! the fault shape by a fixed precedence. Peers depend on these exact
//! codes and renderings.

// ===== Canonical Error Codes =====
#[allow(dead_code)]
const CODE_RUNTIME_ERROR: &str = "runtime_error";

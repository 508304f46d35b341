//! Wire Contract Tests
//!
//! These tests define the stable wire contract of the frame channel
//! protocol: exact field names, message classification precedence, and
//! fault normalization. A change that breaks one of these tests breaks
//! interoperability with every deployed peer.

pub mod fault_shapes;
pub mod wire_format;

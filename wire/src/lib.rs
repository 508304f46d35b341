//! # Wire Protocol
//!
//! This crate defines the frame channel wire format.
//!
//! ## Philosophy
//!
//! - **Field presence is the tag**: a wire message carries no explicit kind
//!   marker; which keys are present decides what it is
//! - **Classification is explicit**: one function, one precedence order,
//!   no serde-untagged guessing
//! - **The codec is a seam**: string serialization is an injected
//!   dependency behind a narrow trait, and it fails cleanly rather than
//!   panicking into the dispatcher
//!
//! ## Message kinds
//!
//! | Kind               | Required keys            |
//! |--------------------|--------------------------|
//! | Request            | `id`, `method`           |
//! | CallbackInvocation | `id`, `callback`         |
//! | Response           | `id`, `result` or `error`|
//! | Notification       | `method` (no `id`)       |
//!
//! `id`+`method` wins over every other interpretation.

pub mod codec;
pub mod message;

pub use codec::{CodecError, JsonCodec, WireCodec};
pub use message::{ClassifyError, ResponseBody, WireMessage};

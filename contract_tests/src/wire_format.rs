//! Wire format contract
//!
//! Field names are exact and case-sensitive; message kind is decided by
//! which fields are present, with `id`+`method` beating every other
//! interpretation.

// ===== Canonical Field Names =====
#[allow(dead_code)]
const FIELD_ID: &str = "id";
#[allow(dead_code)]
const FIELD_METHOD: &str = "method";
#[allow(dead_code)]
const FIELD_PARAMS: &str = "params";
#[allow(dead_code)]
const FIELD_CALLBACKS: &str = "callbacks";
#[allow(dead_code)]
const FIELD_CALLBACK: &str = "callback";
#[allow(dead_code)]
const FIELD_RESULT: &str = "result";
#[allow(dead_code)]
const FIELD_ERROR: &str = "error";
#[allow(dead_code)]
const FIELD_MESSAGE: &str = "message";

// ===== Handshake Contract =====
#[allow(dead_code)]
const READY_METHOD: &str = "__ready";
#[allow(dead_code)]
const READY_PING: &str = "ping";
#[allow(dead_code)]
const READY_PONG: &str = "pong";

// ===== Scope Grammar =====
#[allow(dead_code)]
const SCOPE_SEPARATOR: &str = "::";

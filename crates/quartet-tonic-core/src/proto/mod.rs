//! Wire messages and generated gRPC bindings, one module per protobuf
//! package.
//!
//! The messages are plain prost structs; field numbers and types are the wire
//! contract and must not change.

pub mod blog;
pub mod calculator;
pub mod greet;

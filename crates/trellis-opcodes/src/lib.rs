#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! i18n instruction tapes for the Trellis view runtime.
//!
//! - **Create**: text and anchor nodes an i18n block creates up front
//! - **Mutate**: DOM built by an ICU case when it becomes active
//! - **Update**: binding-driven writes, gated by a change mask
//! - **Remove**: nodes detached when an ICU case is torn down
//!
//! Tapes arrive from the template compiler as raw JSON entries
//! (`RawCode`) and are decoded into typed ops once. The message parser and
//! ICU compiler produce the same typed tapes from translated strings.

pub mod code;
pub mod compile;
pub mod create;
pub mod dump;
pub mod icu;
pub mod message;
pub mod mutate;
pub mod remove;
pub mod update;

#[cfg(test)]
mod compile_tests;
#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod tapes_tests;

pub use code::{MarkerKind, RawCode, TapeError, parse_raw};
pub use compile::{SlotAllocator, compile_icu};
pub use create::{CreateOp, CreateTape};
pub use dump::{dump_create, dump_i18n, dump_icu, dump_mutate, dump_remove, dump_update};
pub use icu::{IcuType, TI18n, TIcu};
pub use message::{
    IcuAttr, IcuCase, IcuExpression, IcuNode, MessageError, MessagePart, parse_icu, parse_message,
};
pub use mutate::{MutateOp, MutateTape};
pub use remove::{RemoveOp, RemoveTape};
pub use update::{UpdateGroup, UpdateOp, UpdateTape, ValuePart, to_mask_bit};

//! Two-level memory model of one unit
//!
//! - [`BulkMemory`]: large, block-transfer-only memory holding every slot's
//!   tensors and result records
//! - [`ScratchArena`]: small per-unit budget from which lanes allocate the
//!   tiles they compute on
//! - [`HandoffBuffer`]: scratch shared between lanes under a one-writer,
//!   many-reader discipline
//!
//! Sizes are fixed before anything is allocated: [`calculator`] holds the
//! footprint arithmetic and [`layout`] the symbol map of the attention kernel.

pub mod bulk;
pub mod calculator;
pub mod handoff;
pub mod layout;
pub mod scratch;

pub use bulk::{BulkMemory, Region, TransferStats};
pub use calculator::BulkLayout;
pub use handoff::HandoffBuffer;
pub use layout::MhaSymbols;
pub use scratch::{ScratchArena, ScratchBuf};

//! Execution core for OP_NET protocol transactions.
//!
//! Split the way `ethrex_blockchain` splits payload validation from state
//! transition: [`envelope`]/[`pattern`]/[`decoder`] recognize and decode a
//! witness script (C1/C2), [`verify`] runs the semantic checks that turn a
//! recognized shape into address/fee data (C3), [`vm`] is the narrow seam
//! into contract execution (C6), and [`pipeline`] drives one block's worth
//! of that end to end (C7).

pub mod decoder;
pub mod envelope;
pub mod pattern;
pub mod pipeline;
pub mod verify;
pub mod vm;

pub use decoder::{decode_payload, Cursor, DecodeError};
pub use envelope::{classify, ClassifyError, EnvelopeCaptures};
pub use pattern::{match_script, Captures, Expect};
pub use pipeline::{BlockPipeline, BlockState, RawTransaction};
pub use verify::verify;
pub use vm::{Evaluation, ExecutionContext, VmFacade};

//! The per-call state machine: parses the playback program embedded in the
//! request URI, drives playback/recording frame by frame over RTP, and
//! invokes the external handler scripts once the call ends.

pub mod cursor;
pub mod engine;
pub mod env;
pub mod handler;
pub mod playback;
pub mod program;
pub mod recording;

pub use cursor::{Atom, Outcome, ProgramCursor};
pub use engine::{run, CallOutcome, CallRequest};
pub use env::{base_environment, recipient_environment, CallSummary, Recipient};
pub use program::{parse as parse_program, Program};

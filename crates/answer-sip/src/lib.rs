//! Zero-copy SIP message scanning and composition.
//!
//! Every scanner here borrows from the caller's buffer: a "range" is a
//! sub-slice of the original datagram, never an owned copy. A range that
//! the grammar allows to be missing is `Option<&[u8]>` rather than an empty
//! slice, so "present but empty" (a valueless `;tag` parameter) and "not
//! present at all" stay distinguishable.
//!
//! This mirrors the pointer-into-buffer style of the C program this crate
//! reimplements: no parser owns its output, and nothing is allocated while
//! parsing an inbound message. The composer side is the mirror image: it
//! only ever appends to a caller-owned, fixed-capacity buffer.

pub mod escape;
pub mod compose;
pub mod parser;

pub use escape::{deescape, esc_cmp, esc_esc_cmp};
pub use compose::{OutBuf, ComposeError};
pub use parser::{
    find_comma, find_display, find_header, find_host, find_list, find_local,
    find_request, find_semi, find_uri, read_unsigned, skip_display, skip_space,
};

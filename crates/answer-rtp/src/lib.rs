//! RTP framing and WAV container handling for a single A-law call leg.
//!
//! This is deliberately narrow: one packet shape (RFC 3550 header, no
//! extensions or CSRC list) and one file format (RIFF/WAVE, format code 6).
//! Neither module attempts to be a general-purpose media library.

pub mod packet;
pub mod wav;

pub use packet::{dtmf_key, RtpHeader, HEADER_LEN, PT_PCMA_MONO, PT_PCMA_STEREO, PT_TELEPHONE_EVENT};

//! The program cursor: a pure state machine over a parsed [`Program`] that
//! decides, tick by tick, what should currently be playing. It never
//! touches the filesystem or the network — [`Atom`] values name what to
//! play next and the caller (the engine) is responsible for opening files
//! and counting down the silence-minute timer.

use crate::program::{BodyItem, Program, RecordKind, ReferTarget};

/// Ticks in one silence minute. The engine calls `advance` once per 20 ms
/// frame while a `*` body atom holds, so 3000 ticks × 20 ms = 60 s — the
/// same one-minute window the original counts in 100 ms steps.
pub const SILENCE_MINUTE_TICKS: u32 = 3000;

/// What the cursor wants played (or done) right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom<'a> {
    /// Try these file stems in order; the first that opens wins.
    File(&'a [String]),
    /// A `-` ring insert: always plays the fixed `aai` clip.
    Ring,
    /// A `!` SIT insert: always plays the fixed `sit` clip.
    Sit,
    /// ~100 ms of silence (a dot separator, or a minute-timer insert).
    Silence,
    /// The program reached its `=` suffix: open a recording (named, or a
    /// temporary file when absent) and fall silent from here on — playback
    /// stops but the call stays up until the idle timeout ends it.
    StartRecording(Option<&'a str>),
    /// The program is exhausted or has reached a terminal marker.
    Done(Outcome),
}

/// The engine's terminal decision, handed to the reply builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Normal exhaustion: BYE, in-dialog.
    Bye,
    /// REFER to the literal `#` at the Contact URI.
    ReferHash,
    /// REFER to a numeric target (from `#NNN`).
    ReferTarget(String),
    /// DTMF-driven termination: the key that was pressed.
    Dtmf(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Rings,
    Sits,
    Body,
    Recording,
    /// Program exhausted with a trailing `*` (wait-for-any-DTMF) and no
    /// recording suffix: falls silent and stays up for the engine's DTMF
    /// check or idle timeout to end the call.
    Waiting,
    Finished,
}

/// Walks rings, then SITs, then the (possibly repeated) body — holding on
/// each `*` body atom for a silence-minute window before moving past it —
/// and finally resolving the outcome from the program's suffix. A program
/// ending in a bare trailing `*` holds in [`Phase::Waiting`] indefinitely
/// rather than finishing, since only a DTMF arrival or the idle timeout can
/// end that call. Does not implement the DTMF-at-end-of-program early exit
/// itself — the engine checks `program.suffix` directly against incoming
/// DTMF, since that check races against cursor exhaustion.
pub struct ProgramCursor<'a> {
    program: &'a Program,
    phase: Phase,
    rings_left: u32,
    sits_left: u32,
    body_index: usize,
    repeats_left: u32,
    minute_ticks_left: u32,
}

impl<'a> ProgramCursor<'a> {
    pub fn new(program: &'a Program) -> Self {
        ProgramCursor {
            program,
            phase: if program.rings > 0 {
                Phase::Rings
            } else if program.sits > 0 {
                Phase::Sits
            } else {
                Phase::Body
            },
            rings_left: program.rings,
            sits_left: program.sits,
            body_index: 0,
            repeats_left: program.repeat,
            minute_ticks_left: SILENCE_MINUTE_TICKS,
        }
    }

    fn finish(&mut self) -> Atom<'a> {
        if let Some(record) = &self.program.suffix.record {
            self.phase = Phase::Recording;
            return match record {
                RecordKind::Temp => Atom::StartRecording(None),
                RecordKind::Named(name) => Atom::StartRecording(Some(name.as_str())),
            };
        }
        if self.program.suffix.dtmf_any {
            self.phase = Phase::Waiting;
            return Atom::Silence;
        }
        self.phase = Phase::Finished;
        let outcome = match &self.program.suffix.refer {
            Some(ReferTarget::Hash) => Outcome::ReferHash,
            Some(ReferTarget::Digits(d)) => Outcome::ReferTarget(d.clone()),
            None => Outcome::Bye,
        };
        Atom::Done(outcome)
    }

    /// Advances to the next atom to play. Call this whenever the current
    /// file is exhausted, failed to open, or the engine otherwise needs to
    /// know what comes next.
    pub fn advance(&mut self) -> Atom<'a> {
        loop {
            match self.phase {
                Phase::Finished => return Atom::Done(Outcome::Bye),
                Phase::Recording | Phase::Waiting => return Atom::Silence,
                Phase::Rings => {
                    if self.rings_left == 0 {
                        self.phase = if self.sits_left > 0 { Phase::Sits } else { Phase::Body };
                        continue;
                    }
                    self.rings_left -= 1;
                    return Atom::Ring;
                }
                Phase::Sits => {
                    if self.sits_left == 0 {
                        self.phase = Phase::Body;
                        continue;
                    }
                    self.sits_left -= 1;
                    return Atom::Sit;
                }
                Phase::Body => {
                    if self.program.body.is_empty() {
                        if self.repeats_left <= 1 {
                            return self.finish();
                        }
                        self.repeats_left -= 1;
                        continue;
                    }
                    if self.body_index >= self.program.body.len() {
                        self.body_index = 0;
                        if self.repeats_left <= 1 {
                            return self.finish();
                        }
                        self.repeats_left -= 1;
                        continue;
                    }
                    match &self.program.body[self.body_index] {
                        BodyItem::File(alternates) => {
                            self.body_index += 1;
                            return Atom::File(alternates);
                        }
                        BodyItem::Pause => {
                            self.body_index += 1;
                            return Atom::Silence;
                        }
                        BodyItem::SilenceMinute => {
                            if self.tick_silence_minute() {
                                self.body_index += 1;
                                continue;
                            }
                            return Atom::Silence;
                        }
                    }
                }
            }
        }
    }

    /// Call once per frame while holding on a `*` body atom. Returns `true`
    /// when the minute has elapsed (the counter was at zero) and resets the
    /// countdown so the next `*` holds for a full minute too.
    pub fn tick_silence_minute(&mut self) -> bool {
        if self.minute_ticks_left == 0 {
            self.minute_ticks_left = SILENCE_MINUTE_TICKS;
            true
        } else {
            self.minute_ticks_left -= 1;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::parse;

    #[test]
    fn plays_rings_then_sits_then_body_then_finishes() {
        let program = parse(b"--!greeting");
        let mut cursor = ProgramCursor::new(&program);
        assert_eq!(cursor.advance(), Atom::Ring);
        assert_eq!(cursor.advance(), Atom::Ring);
        assert_eq!(cursor.advance(), Atom::Sit);
        match cursor.advance() {
            Atom::File(names) => assert_eq!(names, &["greeting".to_string()]),
            other => panic!("expected greeting file, got {other:?}"),
        }
        assert_eq!(cursor.advance(), Atom::Done(Outcome::Bye));
    }

    #[test]
    fn repeats_body_the_requested_number_of_times() {
        let program = parse(b"2*greeting");
        let mut cursor = ProgramCursor::new(&program);
        for _ in 0..2 {
            match cursor.advance() {
                Atom::File(names) => assert_eq!(names, &["greeting".to_string()]),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(cursor.advance(), Atom::Done(Outcome::Bye));
    }

    #[test]
    fn refer_target_digits_become_the_outcome() {
        let program = parse(b"greeting#12345");
        let mut cursor = ProgramCursor::new(&program);
        cursor.advance(); // greeting
        assert_eq!(
            cursor.advance(),
            Atom::Done(Outcome::ReferTarget("12345".to_string()))
        );
    }

    #[test]
    fn refer_hash_outcome_for_bare_trailing_hash() {
        let program = parse(b"greeting#");
        let mut cursor = ProgramCursor::new(&program);
        cursor.advance();
        assert_eq!(cursor.advance(), Atom::Done(Outcome::ReferHash));
    }

    #[test]
    fn record_suffix_starts_recording_then_falls_silent() {
        let program = parse(b"greeting=outgoing");
        let mut cursor = ProgramCursor::new(&program);
        cursor.advance(); // greeting
        assert_eq!(cursor.advance(), Atom::StartRecording(Some("outgoing")));
        assert_eq!(cursor.advance(), Atom::Silence);
        assert_eq!(cursor.advance(), Atom::Silence);
    }

    #[test]
    fn empty_body_with_no_rings_or_sits_finishes_immediately() {
        let program = parse(b"=");
        let mut cursor = ProgramCursor::new(&program);
        assert_eq!(cursor.advance(), Atom::Done(Outcome::Bye));
    }

    #[test]
    fn mid_program_star_does_not_drop_the_rest_of_the_body() {
        let program = parse(b"greeting*more");
        let mut cursor = ProgramCursor::new(&program);
        match cursor.advance() {
            Atom::File(names) => assert_eq!(names, &["greeting".to_string()]),
            other => panic!("expected greeting file, got {other:?}"),
        }
        for _ in 0..SILENCE_MINUTE_TICKS {
            assert_eq!(cursor.advance(), Atom::Silence);
        }
        match cursor.advance() {
            Atom::File(names) => assert_eq!(names, &["more".to_string()]),
            other => panic!("expected more file, got {other:?}"),
        }
    }

    #[test]
    fn trailing_star_holds_silent_after_playback_instead_of_ending_the_call() {
        let program = parse(b"greeting*");
        let mut cursor = ProgramCursor::new(&program);
        cursor.advance(); // greeting
        for _ in 0..(SILENCE_MINUTE_TICKS * 2) {
            assert_eq!(cursor.advance(), Atom::Silence);
        }
    }
}

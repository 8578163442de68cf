//! The answer engine: owns a call's RTP socket and drives its playback or
//! recording state machine over 20 ms frames until a terminal outcome is
//! reached, then hands off to the configured external handler.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tokio::net::UdpSocket;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use answer_rtp::packet::{
    dtmf_key, FRAME_SAMPLES, HEADER_LEN as RTP_HEADER_LEN, PT_PCMA_MONO, PT_PCMA_STEREO,
    PT_TELEPHONE_EVENT, SILENCE_ALAW,
};
use answer_rtp::RtpHeader;

use crate::cursor::{Atom, Outcome as CursorOutcome, ProgramCursor};
use crate::env::{self, CallSummary, Recipient};
use crate::handler;
use crate::playback::PlaybackFile;
use crate::program::Program;
use crate::recording::Recorder;

const FRAME_PERIOD: Duration = Duration::from_millis(20);
const ANSWERED_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const ANSWERED_IDLE_REFRESH: Duration = Duration::from_secs(5);
const NONANSWER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const NONANSWER_IDLE_REFRESH: Duration = Duration::from_secs(300);

/// Everything the dispatcher gathers from the inbound INVITE before
/// spawning a call task; the engine owns all of it for the call's lifetime.
pub struct CallRequest {
    pub rtp_socket: UdpSocket,
    pub program: Program,
    pub nonanswer: Option<u32>,
    pub call_id: String,
    pub from: String,
    pub to: String,
    pub from_local: String,
    pub to_local: String,
    pub x_record_recipients: Vec<Recipient>,
    pub x_record_params: HashMap<String, String>,
    pub directory: PathBuf,
    pub rec_script: Option<PathBuf>,
    pub save_script: Option<PathBuf>,
}

/// The call's terminal decision, handed back to the reply builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// No reply action: idle timeout, with or without media ever arriving.
    NoReply,
    /// Normal exhaustion: send BYE in-dialog.
    Bye,
    /// REFER the call to this target (`"#"`, a DTMF key, or a dialed
    /// number).
    Refer(String),
}

fn to_call_outcome(outcome: CursorOutcome) -> CallOutcome {
    match outcome {
        CursorOutcome::Bye => CallOutcome::Bye,
        CursorOutcome::ReferHash => CallOutcome::Refer("#".to_string()),
        CursorOutcome::ReferTarget(target) => CallOutcome::Refer(target),
        CursorOutcome::Dtmf(key) => CallOutcome::Refer(key.to_string()),
    }
}

/// Fills `frame` from the current playback file, opening the next program
/// atom (and skipping ones that fail to open) until something plays,
/// silence is due, or the cursor reaches a terminal state.
fn fill_playback_frame(
    cursor: &mut ProgramCursor<'_>,
    current_file: &mut Option<PlaybackFile>,
    directory: &Path,
    frame: &mut [u8; FRAME_SAMPLES],
) -> FrameOutcome {
    loop {
        if let Some(file) = current_file {
            if file.read_frame(frame) {
                return FrameOutcome::Playing;
            }
            *current_file = None;
            continue;
        }
        match cursor.advance() {
            Atom::File(alternates) => {
                *current_file = PlaybackFile::open(directory, alternates);
            }
            Atom::Ring => {
                *current_file = PlaybackFile::open(directory, &["aai".to_string()]);
            }
            Atom::Sit => {
                *current_file = PlaybackFile::open(directory, &["sit".to_string()]);
            }
            Atom::Silence => {
                frame.fill(SILENCE_ALAW);
                return FrameOutcome::Playing;
            }
            Atom::StartRecording(name) => {
                return FrameOutcome::StartRecording(name.map(str::to_string));
            }
            Atom::Done(outcome) => return FrameOutcome::Done(outcome),
        }
    }
}

enum FrameOutcome {
    Playing,
    StartRecording(Option<String>),
    Done(CursorOutcome),
}

/// Runs one call to completion: the 20 ms frame clock, inbound RTP
/// handling, playback/recording, and (on exit) handler invocation.
pub async fn run(request: CallRequest) -> CallOutcome {
    let CallRequest {
        rtp_socket,
        program,
        nonanswer,
        call_id,
        from,
        to,
        from_local,
        to_local,
        x_record_recipients,
        x_record_params,
        directory,
        rec_script,
        save_script,
    } = request;

    let ssrc = rtp_socket.local_addr().map(|a| u32::from(a.port())).unwrap_or(0);

    let mut cursor = ProgramCursor::new(&program);
    let mut current_file: Option<PlaybackFile> = None;
    let mut recorder: Option<Recorder> = None;
    if !x_record_recipients.is_empty() {
        recorder = Recorder::create(&directory, None)
            .map_err(|error| warn!(%error, "failed to open X-Record recording file"))
            .ok();
    }

    let mut peer: Option<SocketAddr> = None;
    let mut channels: Option<u16> = None;
    let mut sequence: u16 = 0;
    let mut timestamp: u32 = 0;

    let (idle_timeout, idle_refresh) = if nonanswer.is_some() {
        (NONANSWER_IDLE_TIMEOUT, NONANSWER_IDLE_REFRESH)
    } else {
        (ANSWERED_IDLE_TIMEOUT, ANSWERED_IDLE_REFRESH)
    };

    let call_start = Local::now();
    let call_start_instant = Instant::now();
    let mut deadline = Instant::now() + idle_timeout;
    let mut next_frame = Instant::now() + FRAME_PERIOD;
    let mut recv_buf = [0u8; 1500];

    // An idle timeout while a recording is open (either from `X-Record` at
    // INVITE time or a program's own `=` suffix) is treated as a normal
    // exhaustion: outcome empty, parent sends BYE. An idle timeout with no
    // recording ever opened is the "no reply action" case (`spec.md` §7).
    let idle_outcome = |recorder: &Option<Recorder>| {
        if recorder.is_some() {
            CallOutcome::Bye
        } else {
            CallOutcome::NoReply
        }
    };

    let final_outcome: CallOutcome = 'call: loop {
        let now = Instant::now();
        if now >= deadline {
            break idle_outcome(&recorder);
        }
        let wake_at = next_frame.min(deadline);
        let wait = wake_at.saturating_duration_since(now);

        match time::timeout(wait, rtp_socket.recv_from(&mut recv_buf)).await {
            Ok(Ok((len, addr))) => {
                deadline = Instant::now() + idle_refresh;
                peer.get_or_insert(addr);
                match handle_inbound(&recv_buf[..len], &program, &mut channels, &mut recorder) {
                    InboundEffect::Continue => {}
                    InboundEffect::Terminate(outcome) => break to_call_outcome(outcome),
                    InboundEffect::RecordingFailed(error) => {
                        warn!(%error, call_id = %call_id, "recording write failed; aborting call without a WAV header");
                        recorder = None;
                        break 'call CallOutcome::NoReply;
                    }
                }
            }
            Ok(Err(error)) => {
                debug!(%error, "rtp recv error");
            }
            Err(_elapsed) => {
                // Either the frame tick or the idle deadline; both are
                // re-evaluated below.
            }
        }

        if Instant::now() >= deadline {
            break idle_outcome(&recorder);
        }

        if Instant::now() >= next_frame {
            next_frame += FRAME_PERIOD;
            if channels == Some(1) {
                if let Some(addr) = peer {
                    let mut frame = [SILENCE_ALAW; FRAME_SAMPLES];
                    match fill_playback_frame(&mut cursor, &mut current_file, &directory, &mut frame) {
                        FrameOutcome::Playing => {
                            send_frame(&rtp_socket, addr, &mut sequence, &mut timestamp, ssrc, &frame).await;
                        }
                        FrameOutcome::StartRecording(name) => {
                            match Recorder::create(&directory, name.as_deref()) {
                                Ok(new_recorder) => recorder = Some(new_recorder),
                                Err(error) => warn!(%error, "failed to open program-triggered recording"),
                            }
                        }
                        FrameOutcome::Done(outcome) => break 'call to_call_outcome(outcome),
                    }
                }
            }
        }
    };

    let wavpath = recorder
        .take()
        .and_then(|recorder| match recorder.finish() {
            Ok(path) => Some(path),
            Err(error) => {
                warn!(%error, "failed to finalize recording; aborting call worker");
                None
            }
        });

    info!(call_id = %call_id, outcome = ?final_outcome, "call finished");

    invoke_handlers(
        &call_id,
        &from,
        &to,
        &from_local,
        &to_local,
        channels.unwrap_or(1),
        call_start,
        call_start_instant.elapsed(),
        wavpath.as_deref(),
        &x_record_params,
        &x_record_recipients,
        rec_script.as_deref(),
        save_script.as_deref(),
    )
    .await;

    final_outcome
}

/// The result of processing one inbound RTP datagram.
enum InboundEffect {
    Continue,
    /// The packet itself ends the call (DTMF termination).
    Terminate(CursorOutcome),
    /// A recording write failed; per `spec.md` §7 this is fatal to the
    /// worker and no WAV header is ever written for the partial file.
    RecordingFailed(std::io::Error),
}

/// Processes one inbound RTP datagram: ignores short packets, records
/// A-law payloads when a recorder is open, and checks DTMF termination.
fn handle_inbound(
    datagram: &[u8],
    program: &Program,
    channels: &mut Option<u16>,
    recorder: &mut Option<Recorder>,
) -> InboundEffect {
    if datagram.len() < RTP_HEADER_LEN {
        return InboundEffect::Continue;
    }
    let Some((header, payload)) = RtpHeader::decode(datagram) else {
        return InboundEffect::Continue;
    };

    match header.payload_type {
        PT_PCMA_MONO => {
            channels.get_or_insert(1);
            if let Some(active) = recorder {
                if let Err(error) = active.write(payload, false) {
                    return InboundEffect::RecordingFailed(error);
                }
            }
        }
        PT_PCMA_STEREO => {
            *channels = Some(2);
            if let Some(active) = recorder {
                if let Err(error) = active.write(payload, true) {
                    return InboundEffect::RecordingFailed(error);
                }
            }
        }
        PT_TELEPHONE_EVENT => {
            if let Some(&event) = payload.first() {
                if let Some(key) = dtmf_key(event) {
                    if program.suffix.dtmf_any {
                        return InboundEffect::Terminate(CursorOutcome::Dtmf(key));
                    }
                    if key == '#' && program.suffix.refer.is_some() {
                        return InboundEffect::Terminate(CursorOutcome::Dtmf(key));
                    }
                }
            }
        }
        _ => {}
    }
    InboundEffect::Continue
}

async fn send_frame(
    socket: &UdpSocket,
    peer: SocketAddr,
    sequence: &mut u16,
    timestamp: &mut u32,
    ssrc: u32,
    payload: &[u8; FRAME_SAMPLES],
) {
    let header = RtpHeader {
        marker: false,
        payload_type: PT_PCMA_MONO,
        sequence: *sequence,
        timestamp: *timestamp,
        ssrc,
    };
    let mut packet = [0u8; RTP_HEADER_LEN + FRAME_SAMPLES];
    header.encode((&mut packet[..RTP_HEADER_LEN]).try_into().unwrap());
    packet[RTP_HEADER_LEN..].copy_from_slice(payload);

    *sequence = sequence.wrapping_add(1);
    *timestamp = timestamp.wrapping_add(FRAME_SAMPLES as u32);

    if let Err(error) = socket.send_to(&packet, peer).await {
        debug!(%error, "rtp send error");
    }
}

#[allow(clippy::too_many_arguments)]
async fn invoke_handlers(
    call_id: &str,
    from: &str,
    to: &str,
    from_local: &str,
    to_local: &str,
    channels: u16,
    call_start: chrono::DateTime<Local>,
    duration: Duration,
    wavpath: Option<&Path>,
    x_record_params: &HashMap<String, String>,
    recipients: &[Recipient],
    rec_script: Option<&Path>,
    save_script: Option<&Path>,
) {
    let wavpath_str = wavpath.map(|p| p.display().to_string()).unwrap_or_default();
    let summary = CallSummary {
        duration,
        channels,
        call_start,
        call_id,
        from,
        to,
        wavpath: &wavpath_str,
        extra: x_record_params,
    };
    let base_env = env::base_environment(&summary);

    if let (Some(handler_path), false) = (rec_script, recipients.is_empty()) {
        for recipient in recipients {
            let env = env::recipient_environment(&base_env, recipient);
            handler::run_recording_handler(handler_path, from_local, to_local, recipient, &env).await;
        }
    } else if let (Some(handler_path), Some(path)) = (save_script, wavpath) {
        handler::run_save_handler(handler_path, path, &base_env).await;
    }
}

//! Recording of inbound RTP payload octets to a WAV file.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use answer_rtp::wav;

/// An open recording in progress. A placeholder header occupies the first
/// 44 bytes until [`finish`](Self::finish) writes the real one.
pub struct Recorder {
    file: File,
    path: PathBuf,
    channels: u16,
    bytes_written: u64,
}

impl Recorder {
    /// Creates `<name>.wav` (or a process-unique temp file when `name` is
    /// `None`) in `directory`, reserving the header placeholder.
    pub fn create(directory: &Path, name: Option<&str>) -> io::Result<Self> {
        let path = match name {
            Some(name) => directory.join(format!("{name}.wav")),
            None => directory.join(format!(".rec-{}.wav", std::process::id())),
        };
        let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;
        wav::reserve_header(&mut file)?;
        file.seek(SeekFrom::Start(wav::HEADER_LEN))?;
        Ok(Recorder { file, path, channels: 1, bytes_written: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one payload of decoded A-law samples. `channels` is updated
    /// to 2 the first time a stereo packet is observed; it never drops
    /// back to 1 once raised, matching the inbound-channel-detection rule.
    pub fn write(&mut self, payload: &[u8], stereo: bool) -> io::Result<()> {
        if stereo {
            self.channels = 2;
        }
        self.file.write_all(payload)?;
        self.bytes_written += payload.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Seeks back to offset 0 and writes the canonical header now that the
    /// final length and channel count are known.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        wav::write_header(&mut self.file, self.channels, self.bytes_written as u32)?;
        Ok(self.path)
    }
}

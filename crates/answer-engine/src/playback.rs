//! Opens playback files named by the program cursor and streams fixed-size
//! A-law frames from them.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use answer_rtp::packet::{FRAME_SAMPLES, SILENCE_ALAW};
use answer_rtp::wav;

/// A playback file positioned at its sample data, ready to be read 160
/// bytes (one 20 ms frame) at a time.
pub struct PlaybackFile {
    reader: std::io::Cursor<Vec<u8>>,
}

impl PlaybackFile {
    /// Tries each alternate stem in `directory`, in order, returning the
    /// first one that exists and parses as a RIFF/WAVE file with a `data`
    /// chunk. `None` if every alternate fails.
    pub fn open(directory: &Path, alternates: &[String]) -> Option<Self> {
        for stem in alternates {
            let path = directory.join(format!("{stem}.wav"));
            if let Some(file) = Self::open_one(&path) {
                return Some(file);
            }
        }
        None
    }

    fn open_one(path: &Path) -> Option<Self> {
        let file = File::open(path).ok()?;
        let mut positioned = wav::find_data_chunk(file).ok()?;
        let mut data = Vec::new();
        positioned.read_to_end(&mut data).ok()?;
        Some(PlaybackFile { reader: std::io::Cursor::new(data) })
    }

    /// Fills `frame` with the next 160 A-law samples, padding any short
    /// read at end-of-file with silence. Returns `false` once the file has
    /// nothing left at all (the frame is then pure silence and the caller
    /// should advance the cursor).
    pub fn read_frame(&mut self, frame: &mut [u8; FRAME_SAMPLES]) -> bool {
        let read = self.reader.read(frame).unwrap_or(0);
        if read < FRAME_SAMPLES {
            frame[read..].fill(SILENCE_ALAW);
        }
        read > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_wav(path: &Path, samples: &[u8]) {
        let mut file = File::create(path).unwrap();
        wav::reserve_header(&mut file).unwrap();
        file.seek(std::io::SeekFrom::Start(wav::HEADER_LEN)).unwrap();
        file.write_all(samples).unwrap();
        wav::write_header(&mut file, 1, samples.len() as u32).unwrap();
    }

    #[test]
    fn opens_first_existing_alternate() {
        let dir = std::env::temp_dir().join(format!("answer-engine-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_wav(&dir.join("backup.wav"), &[0x2a; 320]);

        let alternates = vec!["missing".to_string(), "backup".to_string()];
        let mut file = PlaybackFile::open(&dir, &alternates).unwrap();
        let mut frame = [0u8; FRAME_SAMPLES];
        assert!(file.read_frame(&mut frame));
        assert_eq!(frame, [0x2a; FRAME_SAMPLES]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn short_read_is_padded_with_silence() {
        let dir = std::env::temp_dir().join(format!("answer-engine-test-short-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_wav(&dir.join("short.wav"), &[0x11; 10]);

        let mut file = PlaybackFile::open(&dir, &["short".to_string()]).unwrap();
        let mut frame = [0u8; FRAME_SAMPLES];
        assert!(file.read_frame(&mut frame));
        assert_eq!(&frame[..10], &[0x11; 10]);
        assert!(frame[10..].iter().all(|&b| b == SILENCE_ALAW));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_and_no_alternates_returns_none() {
        let dir = std::env::temp_dir();
        assert!(PlaybackFile::open(&dir, &["definitely-not-a-real-stem-xyz".to_string()]).is_none());
    }
}

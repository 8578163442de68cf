//! RIFF/WAVE reading and writing, narrowed to exactly what the answer
//! engine needs: locating the `data` chunk of a playback file, and writing
//! the canonical A-law header of a recording once its length is known.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Size of the header this program ever writes: RIFF/WAVE + `fmt ` (16
/// bytes) + `data` descriptor, no extra chunks.
pub const HEADER_LEN: u64 = 44;

/// RIFF format code for 8-bit A-law.
const FORMAT_ALAW: u16 = 6;
const SAMPLE_RATE: u32 = 8_000;

#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("not a RIFF/WAVE file")]
    NotRiffWave,
    #[error("no data chunk found")]
    NoDataChunk,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Skips the 12-byte RIFF/WAVE header, then walks 8-byte chunk descriptors
/// until `data` is found, leaving `r` positioned at the first sample byte.
/// Chunks are padded to an even length per the RIFF convention.
pub fn find_data_chunk<R: Read + Seek>(mut r: R) -> Result<R, WavError> {
    let mut riff = [0u8; 12];
    r.read_exact(&mut riff)?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(WavError::NotRiffWave);
    }

    loop {
        let mut descriptor = [0u8; 8];
        if r.read_exact(&mut descriptor).is_err() {
            return Err(WavError::NoDataChunk);
        }
        let size = u32::from_le_bytes(descriptor[4..8].try_into().unwrap());
        if &descriptor[0..4] == b"data" {
            return Ok(r);
        }
        let skip = i64::from(size) + i64::from(size & 1);
        r.seek(SeekFrom::Current(skip))?;
    }
}

/// Reserves [`HEADER_LEN`] bytes at the start of a fresh recording file so
/// sample data can be appended immediately; the real header is written by
/// [`write_header`] once the call ends and the length is known.
pub fn reserve_header<W: Write + Seek>(mut w: W) -> io::Result<()> {
    w.seek(SeekFrom::Start(0))?;
    w.write_all(&[0u8; HEADER_LEN as usize])
}

/// Writes the canonical 44-byte A-law WAV header at offset 0: `fmt `
/// subchunk with format code 6, the observed channel count, 8 kHz, 8
/// bits/sample, and a `data` subchunk of `data_len` bytes.
pub fn write_header<W: Write + Seek>(mut w: W, channels: u16, data_len: u32) -> io::Result<()> {
    let byte_rate = SAMPLE_RATE * u32::from(channels);
    let block_align = channels; // 1 byte per sample per channel
    let riff_size = 36 + data_len;

    w.seek(SeekFrom::Start(0))?;
    w.write_all(b"RIFF")?;
    w.write_all(&riff_size.to_le_bytes())?;
    w.write_all(b"WAVE")?;
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_ALAW.to_le_bytes())?;
    w.write_all(&channels.to_le_bytes())?;
    w.write_all(&SAMPLE_RATE.to_le_bytes())?;
    w.write_all(&byte_rate.to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&8u16.to_le_bytes())?;
    w.write_all(b"data")?;
    w.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut v = tag.to_vec();
        v.extend_from_slice(&(body.len() as u32).to_le_bytes());
        v.extend_from_slice(body);
        if body.len() % 2 == 1 {
            v.push(0);
        }
        v
    }

    #[test]
    fn find_data_chunk_skips_unrelated_chunks() {
        let mut file = b"RIFF".to_vec();
        file.extend_from_slice(&0u32.to_le_bytes());
        file.extend_from_slice(b"WAVE");
        file.extend(chunk(b"fmt ", &[0u8; 16]));
        file.extend(chunk(b"LIST", b"odd")); // odd length exercises padding
        file.extend(chunk(b"data", b"samples"));

        let cursor = Cursor::new(file);
        let mut positioned = find_data_chunk(cursor).unwrap();
        let mut rest = Vec::new();
        positioned.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"samples");
    }

    #[test]
    fn find_data_chunk_rejects_non_riff_input() {
        let cursor = Cursor::new(b"not a riff file at all!!".to_vec());
        assert!(matches!(find_data_chunk(cursor), Err(WavError::NotRiffWave)));
    }

    #[test]
    fn write_header_then_find_data_chunk_round_trips() {
        let mut file = Cursor::new(vec![0u8; HEADER_LEN as usize + 4]);
        write_header(&mut file, 2, 4).unwrap();
        file.get_mut()[HEADER_LEN as usize..].copy_from_slice(b"abcd");
        file.set_position(0);

        let mut positioned = find_data_chunk(file).unwrap();
        let mut data = Vec::new();
        positioned.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"abcd");
    }
}

use std::fs::File;
use std::io::{BufWriter, Error as IoError, ErrorKind, Result, Write};
use std::path::Path;

use bytemuck::cast_slice;

/// `wFormatTag` of integer PCM.
const WAVE_FORMAT_PCM: u16 = 0x0001;

/// Software tag, NUL padded to an even length.
const SOFTWARE: &[u8] = b"Symphonia lc3-replay\x00\x00";

pub fn create(path: &Path, sample_rate: u32, pcm: &[i16]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path).map_err(|e| {
        IoError::new(
            ErrorKind::NotFound,
            format!("Failed to create {}, {}", path.display(), e),
        )
    })?);
    write(&mut file, sample_rate, pcm)?;
    file.flush()
}

/// Writes `pcm` as a 16-bit mono RIFF/WAVE stream.
pub fn write<W: Write>(file: &mut W, sample_rate: u32, pcm: &[i16]) -> Result<()> {
    let pcm: &[u8] = cast_slice(pcm);
    let list_len = 4 + 8 + SOFTWARE.len() as u32;
    let riff_len = 4 + (8 + 16) + (8 + list_len) + 8 + pcm.len() as u32;

    // write file header
    file.write_all(b"RIFF")?;
    file.write_all(&riff_len.to_le_bytes())?;

    file.write_all(b"WAVE")?;

    // write format chunk
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;

    // compression mode
    file.write_all(&WAVE_FORMAT_PCM.to_le_bytes())?;
    // number of channels, mono
    file.write_all(&1u16.to_le_bytes())?;
    // sample rate
    file.write_all(&sample_rate.to_le_bytes())?;
    // avg bytes per seconds
    file.write_all(&(sample_rate * 2).to_le_bytes())?;
    // block align
    file.write_all(&2u16.to_le_bytes())?;
    // significant bits per sample
    file.write_all(&16u16.to_le_bytes())?;

    // write list chunk
    file.write_all(b"LIST")?;
    file.write_all(&list_len.to_le_bytes())?;

    file.write_all(b"INFO")?;
    file.write_all(b"ISFT")?;
    file.write_all(&(SOFTWARE.len() as u32).to_le_bytes())?;
    file.write_all(SOFTWARE)?;

    file.write_all(b"data")?;
    file.write_all(&(pcm.len() as u32).to_le_bytes())?;
    file.write_all(pcm)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    use super::*;

    #[test]
    fn test_readable_by_symphonia() {
        let pcm: Vec<i16> = (0..1600).map(|i| (i * 13 % 4000 - 2000) as i16).collect();
        let mut bytes = vec![];
        write(&mut bytes, 16000, &pcm).unwrap();
        assert_eq!(bytes.len(), 12 + 24 + 8 + 4 + 8 + SOFTWARE.len() + 8 + pcm.len() * 2);

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("wav");
        let mut reader = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .unwrap()
            .format;
        let params = reader.default_track().unwrap().codec_params.clone();
        assert_eq!(params.sample_rate, Some(16000));
        assert_eq!(params.channels.map(|c| c.count()), Some(1));

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &Default::default())
            .unwrap();
        let mut decoded = vec![];
        while let Ok(packet) = reader.next_packet() {
            let buf = decoder.decode(&packet).unwrap();
            let mut samples = SampleBuffer::<i16>::new(buf.capacity() as u64, *buf.spec());
            samples.copy_interleaved_ref(buf);
            decoded.extend_from_slice(samples.samples());
        }
        assert_eq!(decoded, pcm);
    }
}

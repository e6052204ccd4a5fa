//! The `.lc3` container of the liblc3 tools.

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

const LC3_FILE_ID: u16 = 0xcc1c;
pub(crate) const LC3_MAGIC: &[u8] = &[0x1c, 0xcc];
pub(crate) const HEADER_SIZE: usize = 18;

/// Header of the `.lc3` container written by the liblc3 tools.
///
/// All fields are little endian `u16`s: file id, header size, sample rate
/// in 100 Hz, bitrate in 100 bps, channels, frame duration in 10 us, a
/// reserved word and the sample count split in a low and a high half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lc3Header {
    pub sample_rate_hz: u32,
    pub bitrate: u32,
    pub channels: u16,
    pub frame_duration_us: u32,
    /// Samples per channel in the whole stream.
    pub samples: u32,
}

impl Lc3Header {
    /// Parses the fixed part of the header. Returns the header and the size
    /// the file declares for it.
    pub fn parse(mut data: &[u8]) -> io::Result<(Self, usize)> {
        let invalid = |msg: &'static str| io::Error::new(io::ErrorKind::InvalidData, msg);

        if data.read_u16::<LittleEndian>()? != LC3_FILE_ID {
            return Err(invalid("not an lc3 file"));
        }
        let header_size = data.read_u16::<LittleEndian>()? as usize;
        if header_size < HEADER_SIZE {
            return Err(invalid("lc3 header too short"));
        }
        let sample_rate_hz = u32::from(data.read_u16::<LittleEndian>()?) * 100;
        let bitrate = u32::from(data.read_u16::<LittleEndian>()?) * 100;
        let channels = data.read_u16::<LittleEndian>()?;
        let frame_duration_us = u32::from(data.read_u16::<LittleEndian>()?) * 10;
        let _reserved = data.read_u16::<LittleEndian>()?;
        let low = data.read_u16::<LittleEndian>()?;
        let high = data.read_u16::<LittleEndian>()?;

        let header = Self {
            sample_rate_hz,
            bitrate,
            channels,
            frame_duration_us,
            samples: u32::from(low) | u32::from(high) << 16,
        };
        Ok((header, header_size))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(LC3_FILE_ID)?;
        w.write_u16::<LittleEndian>(HEADER_SIZE as u16)?;
        w.write_u16::<LittleEndian>((self.sample_rate_hz / 100) as u16)?;
        w.write_u16::<LittleEndian>((self.bitrate / 100) as u16)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u16::<LittleEndian>((self.frame_duration_us / 10) as u16)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(self.samples as u16)?;
        w.write_u16::<LittleEndian>((self.samples >> 16) as u16)
    }
}

/// Writes frames in the `.lc3` container. Each frame is stored as a `u16`
/// length followed by its payload; a zero length marks a lost frame.
pub struct Lc3Writer<W: Write> {
    inner: W,
    frames: u64,
}

impl<W: Write> Lc3Writer<W> {
    pub fn new(mut inner: W, header: &Lc3Header) -> io::Result<Self> {
        header.write_to(&mut inner)?;
        Ok(Self { inner, frames: 0 })
    }

    pub fn write_frame(&mut self, frame: Option<&[u8]>) -> io::Result<()> {
        let frame = frame.unwrap_or_default();
        let len = u16::try_from(frame.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "lc3 frame too large"))?;
        self.inner.write_u16::<LittleEndian>(len)?;
        self.inner.write_all(frame)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn header() -> Lc3Header {
        Lc3Header {
            sample_rate_hz: 16000,
            bitrate: 32000,
            channels: 1,
            frame_duration_us: 10000,
            samples: 70000,
        }
    }

    #[test]
    fn test_header_layout() {
        let mut bytes = vec![];
        header().write_to(&mut bytes).unwrap();
        assert_eq!(
            bytes,
            [
                0x1c, 0xcc, 18, 0, 160, 0, 64, 1, 1, 0, 0xe8, 0x03, 0, 0, 0x70, 0x11, 0x01, 0
            ]
        );
        assert_eq!(Lc3Header::parse(&bytes).unwrap(), (header(), HEADER_SIZE));

        bytes[0] = 0;
        assert!(Lc3Header::parse(&bytes).is_err());
        assert!(Lc3Header::parse(&[0x1c, 0xcc, 18]).is_err());
    }

    #[test]
    fn test_writer() {
        let mut writer = Lc3Writer::new(vec![], &header()).unwrap();
        writer.write_frame(Some(&[1u8, 2, 3][..])).unwrap();
        writer.write_frame(None).unwrap();
        assert_eq!(writer.frames(), 2);
        assert!(writer.write_frame(Some(&vec![0u8; 70000][..])).is_err());

        let bytes = writer.into_inner().unwrap();
        assert_eq!(&bytes[HEADER_SIZE..], [3, 0, 1, 2, 3, 0, 0]);
    }
}

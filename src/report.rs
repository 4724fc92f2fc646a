//! Touch report decoding
//!
//! A report is a 7 byte header followed by zero or more 10 byte touch
//! records.  These functions work on bytes already read from the device, so
//! they can also be used on captured data.

use heapless::Vec;

use crate::layout::{self, FIRST_RECORD, HEADER_LEN, MAX_REPORTED_TOUCHES, MAX_TOUCHES, RECORD_LEN};
use crate::{Error, Result};

const RECORD_SIZE: usize = RECORD_LEN as usize;

/// Fields describing a touch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    /// Contact id, stable while the finger stays down (0..=31)
    pub id: u8,
    pub touch_type: u8,
    pub pressure: u8,
}

/// Touch points decoded from one report, in record order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoints {
    /// Report timestamp as sent by the device
    pub timestamp: u16,
    pub points: Vec<TouchPoint, MAX_TOUCHES>,
}

impl TouchPoints {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, TouchPoint> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a TouchPoints {
    type Item = &'a TouchPoint;
    type IntoIter = core::slice::Iter<'a, TouchPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Borrowed view of a single 10 byte touch record
pub struct TouchRecord<'a>(&'a [u8; RECORD_SIZE]);

impl<'a> TouchRecord<'a> {
    pub fn new(bytes: &'a [u8; RECORD_SIZE]) -> TouchRecord<'a> {
        TouchRecord(bytes)
    }

    /// Contact id with the reserved upper bits masked off
    pub fn id(&self) -> u8 {
        self.touch_id() & layout::TOUCH_ID_MASK
    }

    pub fn to_point(&self) -> TouchPoint {
        TouchPoint {
            x: self.x(),
            y: self.y(),
            id: self.id(),
            touch_type: self.touch_type(),
            pressure: self.pressure(),
        }
    }
}

macro_rules! record_field {
    ($name:ident, u8) => {
        record_field!($name, u8, u8_at);
    };
    ($name:ident, u16) => {
        record_field!($name, u16, u16_le_at);
    };
    ($name:ident, $sz:tt, $read:ident) => {
        $crate::paste::paste! {
            impl<'a> TouchRecord<'a> {
                #[doc="Raw `" $name "` field of the record"]
                pub fn [<$name:lower>](&self) -> $sz {
                    $read(&self.0[..], layout::[<$name:upper>])
                }
            }
        }
    };
}

record_field!(touch_type, u8);
record_field!(touch_id, u8);
record_field!(x, u16);
record_field!(y, u16);
record_field!(pressure, u8);

/// Number of touches announced by a length prefix of `len`
///
/// Valid touch report lengths are `7 + 10 * n` with
/// `n <= MAX_REPORTED_TOUCHES`.  Says nothing about whether the packet fits
/// the receive buffer, see [`records_in_frame`].
pub fn touches_in_len(len: u16) -> Result<usize> {
    if len < HEADER_LEN || (len - HEADER_LEN) % RECORD_LEN != 0 {
        return Err(Error::MalformedPacket(len));
    }
    let touches = usize::from((len - HEADER_LEN) / RECORD_LEN);
    if touches > MAX_REPORTED_TOUCHES {
        return Err(Error::MalformedPacket(len));
    }
    Ok(touches)
}

/// Number of touch records in a report of `len` bytes the driver can decode
///
/// As [`touches_in_len`], limited to `MAX_TOUCHES` records.
pub fn records_in_frame(len: u16) -> Result<usize> {
    let records = touches_in_len(len)?;
    if records > MAX_TOUCHES {
        return Err(Error::MalformedPacket(len));
    }
    Ok(records)
}

/// Whether `frame` carries the status byte of a complete touch frame
pub fn is_frame_ready(frame: &[u8]) -> bool {
    frame.get(layout::FRAME_STATUS) == Some(&layout::FRAME_READY)
}

/// Decode the touch points of a complete report
///
/// `frame` must be exactly the bytes announced by the length prefix.
pub fn decode_frame(frame: &[u8]) -> Result<TouchPoints> {
    let len = u16::try_from(frame.len()).map_err(|_| Error::MalformedPacket(u16::MAX))?;
    let count = records_in_frame(len)?;

    let mut report = TouchPoints {
        timestamp: u16_le_at(frame, layout::TIMESTAMP),
        points: Vec::new(),
    };
    for chunk in frame[FIRST_RECORD..].chunks_exact(RECORD_SIZE).take(count) {
        let bytes: &[u8; RECORD_SIZE] = chunk
            .try_into()
            .map_err(|_| Error::MalformedPacket(len))?;
        report
            .points
            .push(TouchRecord::new(bytes).to_point())
            .map_err(|_| Error::MalformedPacket(len))?;
    }
    Ok(report)
}

fn u8_at(b: &[u8], offset: usize) -> u8 {
    b[offset]
}

fn u16_le_at(b: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([b[offset], b[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(touch_id: u8, x: u16, y: u16, pressure: u8) -> [u8; RECORD_SIZE] {
        let mut r = [0u8; RECORD_SIZE];
        r[1] = touch_id;
        r[2..4].copy_from_slice(&x.to_le_bytes());
        r[4..6].copy_from_slice(&y.to_le_bytes());
        r[6] = pressure;
        r
    }

    fn frame(timestamp: u16, records: &[[u8; RECORD_SIZE]]) -> ([u8; 27], usize) {
        let len = 7 + 10 * records.len();
        let mut f = [0u8; 27];
        f[0..2].copy_from_slice(&(len as u16).to_le_bytes());
        f[2] = 1;
        f[3..5].copy_from_slice(&timestamp.to_le_bytes());
        for (i, r) in records.iter().enumerate() {
            f[7 + 10 * i..][..10].copy_from_slice(r);
        }
        (f, len)
    }

    #[test]
    fn valid_lengths_give_record_count() {
        assert_eq!(records_in_frame(7), Ok(0));
        assert_eq!(records_in_frame(17), Ok(1));
        assert_eq!(records_in_frame(27), Ok(2));
    }

    #[test]
    fn prefix_counts_touches_beyond_buffer() {
        assert_eq!(touches_in_len(7), Ok(0));
        assert_eq!(touches_in_len(27), Ok(2));
        assert_eq!(touches_in_len(37), Ok(3));
        assert_eq!(touches_in_len(57), Ok(5));
        assert_eq!(touches_in_len(67), Err(Error::MalformedPacket(67)));
        assert_eq!(touches_in_len(14), Err(Error::MalformedPacket(14)));
        assert_eq!(records_in_frame(37), Err(Error::MalformedPacket(37)));
    }

    #[test]
    fn invalid_lengths_are_malformed() {
        for len in [0u16, 2, 6, 8, 14, 16, 26, 37, 0xFFFF] {
            assert_eq!(records_in_frame(len), Err(Error::MalformedPacket(len)));
        }
    }

    #[test]
    fn touch_id_is_masked() {
        assert_eq!(TouchRecord::new(&record(0xFF, 0, 0, 0)).id(), 31);
        assert_eq!(TouchRecord::new(&record(0x20, 0, 0, 0)).id(), 0);
        assert_eq!(TouchRecord::new(&record(0x25, 0, 0, 0)).id(), 5);
        assert_eq!(TouchRecord::new(&record(0x25, 0, 0, 0)).touch_id(), 0x25);
    }

    #[test]
    fn decodes_single_record() {
        let mut r = record(0x05, 100, 200, 50);
        r[0] = 0;
        let (f, len) = frame(0x1234, &[r]);
        let report = decode_frame(&f[..len]).unwrap();
        assert_eq!(report.timestamp, 0x1234);
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.points[0],
            TouchPoint {
                x: 100,
                y: 200,
                id: 5,
                touch_type: 0,
                pressure: 50
            }
        );
    }

    #[test]
    fn decodes_records_in_order() {
        let (f, len) = frame(7, &[record(1, 10, 20, 3), record(0x22, 640, 480, 9)]);
        let report = decode_frame(&f[..len]).unwrap();
        let ids: [u8; 2] = [report.points[0].id, report.points[1].id];
        assert_eq!(ids, [1, 2]);
        assert_eq!((report.points[1].x, report.points[1].y), (640, 480));
        assert_eq!(report.points[1].pressure, 9);
    }

    #[test]
    fn header_only_frame_is_empty() {
        let (f, len) = frame(99, &[]);
        let report = decode_frame(&f[..len]).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.timestamp, 99);
    }

    #[test]
    fn frame_ready_needs_status_byte() {
        assert!(is_frame_ready(&[0x11, 0x00, 0x01]));
        assert!(!is_frame_ready(&[0x11, 0x00, 0x03]));
        assert!(!is_frame_ready(&[0x02, 0x00]));
        assert!(!is_frame_ready(&[]));
    }

    #[test]
    fn decode_rejects_odd_frame_length() {
        let f = [0u8; 14];
        assert_eq!(decode_frame(&f), Err(Error::MalformedPacket(14)));
    }
}

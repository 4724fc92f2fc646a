//! Byte layout of TT21100 report packets
//!
//! All multi-byte fields are little-endian.

macro_rules! offset {
    ($name:ident, $off:literal) => {
        $crate::paste::paste! {
            pub const [<$name:upper>]: usize = $off;
        }
    };
}

macro_rules! length {
    ($name:ident, $len:literal) => {
        $crate::paste::paste! {
            pub const [<$name:upper _LEN>]: u16 = $len;
        }
    };
}

// Report header
offset!(frame_status, 2);
offset!(timestamp, 3);
offset!(first_record, 7);

// Touch record, relative to the start of the record
offset!(touch_type, 0);
offset!(touch_id, 1);
offset!(x, 2);
offset!(y, 4);
offset!(pressure, 6);

// Length prefix values
length!(no_data, 0);
length!(empty_queue, 2);
length!(header, 7);
length!(record, 10);

/// Size of the length prefix preceding every packet
pub const PREFIX_SIZE: usize = 2;

/// Frame status value marking a complete touch frame
pub const FRAME_READY: u8 = 1;

/// Bits of the touch id byte holding the contact id
pub const TOUCH_ID_MASK: u8 = 0x1F;

/// Largest number of touches the controller reports in one packet
pub const MAX_REPORTED_TOUCHES: usize = 5;

/// Largest number of touch records the scratch buffer holds
pub const MAX_TOUCHES: usize = 2;

/// Size of the scratch receive buffer
pub const REPORT_BUF_SIZE: usize = 28;

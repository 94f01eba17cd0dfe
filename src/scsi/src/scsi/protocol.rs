//! Wire constants for the INQUIRY pass-through transaction.
//!
//! Offsets describe the `SCSI_PASS_THROUGH` record as it sits at the start of
//! the transfer buffer; every field is stored in native byte order, since the
//! consumer is the local kernel rather than the device. The layout is the one
//! the compiler gives [`PassThroughHeader`] for the target's pointer width.

use std::mem;

use static_assertions::{const_assert, const_assert_eq};

use super::pass_through::PassThroughHeader;

pub const INQUIRY: u8 = 0x12;
pub const INQUIRY_CDB_LEN: u8 = 6;
/// Byte 1 bit 0 of the INQUIRY CDB.
pub const EVPD: u8 = 0b0000_0001;

/// The CDB region is always 16 bytes, regardless of how many are meaningful.
pub const CDB_REGION_SIZE: usize = 16;

pub const DEFAULT_ALLOCATION_LENGTH: u8 = 0xff;
/// Seconds.
pub const DEFAULT_TIMEOUT: u32 = 2;

pub const SCSI_IOCTL_DATA_OUT: u8 = 0;
pub const SCSI_IOCTL_DATA_IN: u8 = 1;

pub const STATUS_GOOD: u8 = 0x00;
pub const STATUS_CHECK_CONDITION: u8 = 0x02;
pub const STATUS_BUSY: u8 = 0x08;
pub const STATUS_RESERVATION_CONFLICT: u8 = 0x18;
pub const STATUS_TASK_SET_FULL: u8 = 0x28;

/// `DataBufferOffset` is a `ULONG_PTR`, so everything from it onwards moves
/// with the pointer width.
const PTR_SIZE: usize = mem::size_of::<usize>();

const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

// header field offsets
pub const LENGTH_OFFSET: usize = 0;
pub const SCSI_STATUS_OFFSET: usize = 2;
pub const PATH_ID_OFFSET: usize = 3;
pub const TARGET_ID_OFFSET: usize = 4;
pub const LUN_OFFSET: usize = 5;
pub const CDB_LENGTH_OFFSET: usize = 6;
pub const SENSE_INFO_LENGTH_OFFSET: usize = 7;
pub const DATA_IN_OFFSET: usize = 8;
// 9..12: padding
pub const DATA_TRANSFER_LENGTH_OFFSET: usize = 12;
pub const TIMEOUT_VALUE_OFFSET: usize = 16;
pub const DATA_BUFFER_OFFSET_OFFSET: usize = align_up(20, PTR_SIZE);
pub const SENSE_INFO_OFFSET_OFFSET: usize = DATA_BUFFER_OFFSET_OFFSET + PTR_SIZE;
pub const CDB_OFFSET: usize = SENSE_INFO_OFFSET_OFFSET + 4;

/// The whole `SCSI_PASS_THROUGH` record, trailing CDB array and tail padding
/// included. This is what the `Length` field declares.
pub const RECORD_SIZE: usize = mem::size_of::<PassThroughHeader>();
/// Everything in the record except the CDB array. The data region starts
/// right after the record, at `HEADER_SIZE + CDB_REGION_SIZE`.
pub const HEADER_SIZE: usize = RECORD_SIZE - CDB_REGION_SIZE;
pub const DATA_OFFSET: usize = HEADER_SIZE + CDB_REGION_SIZE;

const_assert_eq!(RECORD_SIZE, align_up(CDB_OFFSET + CDB_REGION_SIZE, PTR_SIZE));
const_assert!(CDB_OFFSET <= HEADER_SIZE);
const_assert!(RECORD_SIZE <= u16::MAX as usize);

#[cfg(windows)]
mod windows_layout {
    use std::mem;

    use static_assertions::{const_assert, const_assert_eq};
    use winapi::shared::ntddscsi::SCSI_PASS_THROUGH;

    use super::{PassThroughHeader, RECORD_SIZE};

    const_assert_eq!(RECORD_SIZE, mem::size_of::<SCSI_PASS_THROUGH>());
    const_assert_eq!(
        mem::align_of::<PassThroughHeader>(),
        mem::align_of::<SCSI_PASS_THROUGH>()
    );
}

/// Every VPD page starts with page code, reserved, and a 16-bit page length.
pub const VPD_HEADER_LEN: usize = 4;
/// Code set, association/type, two reserved bytes, identifier length.
pub const DESIGNATOR_HEADER_LEN: usize = 5;

/// Identifiers decoded as text. Other code sets are treated as opaque bytes.
pub const CODE_SET_ASCII: u8 = 1;

/// Size of the sense region reserved when one is requested.
pub const SENSE_BUFFER_LEN: u8 = 32;

//! `SG_IO`, fed from the pass-through record.
//!
//! Linux has no buffer-relative pass-through request, so the record at the
//! front of a transfer buffer is translated into an `sg_io_hdr` whose pointers
//! aim back into the same buffer. The results are then written back into the
//! record the way the Windows driver would.

use std::{
    convert::TryFrom,
    io,
    os::raw::{c_int, c_uint, c_ushort, c_void},
    ptr,
};

use log::debug;

use super::{
    pass_through::PassThroughHeader,
    protocol::{CDB_OFFSET, CDB_REGION_SIZE, SCSI_IOCTL_DATA_IN, SCSI_IOCTL_DATA_OUT},
};

pub const SG_IO: u32 = 0x2285;
const SG_INTERFACE_ID_ORIG: c_int = b'S' as c_int;

pub const SG_DXFER_NONE: c_int = -1;
pub const SG_DXFER_TO_DEV: c_int = -2;
pub const SG_DXFER_FROM_DEV: c_int = -3;

/// The low nibble of `driver_status`; the high one holds `SUGGEST_*` hints.
const DRIVER_STATUS_MASK: c_ushort = 0x0f;
/// Sense data was collected. Not a failure on its own.
pub const DRIVER_SENSE: c_ushort = 0x08;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHdr {
    pub interface_id: c_int,
    pub dxfer_direction: c_int,
    pub cmd_len: u8,
    pub mx_sb_len: u8,
    pub iovec_count: c_ushort,
    pub dxfer_len: c_uint,
    pub dxferp: *mut c_void,
    pub cmdp: *const u8,
    pub sbp: *mut u8,
    pub timeout: c_uint,
    pub flags: c_uint,
    pub pack_id: c_int,
    pub usr_ptr: *mut c_void,
    pub status: u8,
    pub masked_status: u8,
    pub msg_status: u8,
    pub sb_len_wr: u8,
    pub host_status: c_ushort,
    pub driver_status: c_ushort,
    pub resid: c_int,
    pub duration: c_uint,
    pub info: c_uint,
}

/// The host adapter or the mid-level driver gave up on the command before
/// the device could answer it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
#[error("SG_IO failed: host status {host_status:#06x}, driver status {driver_status:#06x}")]
pub struct SgIoError {
    pub host_status: u16,
    pub driver_status: u16,
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

/// Checks that `[offset, offset + len)` lies inside a buffer of `total`
/// bytes.
fn region(offset: usize, len: usize, total: usize) -> io::Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= total => Ok(offset),
        _ => Err(invalid("pass-through region exceeds buffer")),
    }
}

/// One `SG_IO` call prepared from a transfer buffer.
#[derive(Debug)]
pub struct SgRequest {
    header: PassThroughHeader,
    data_offset: usize,
    pub hdr: SgIoHdr,
}

impl SgRequest {
    /// Validates the record at the front of `buffer` and points an
    /// `sg_io_hdr` at its CDB, data and sense regions.
    ///
    /// The pointers stay valid only while `buffer` is neither moved nor
    /// reallocated.
    pub fn new(buffer: &mut [u8]) -> io::Result<Self> {
        let header =
            PassThroughHeader::read_from(buffer).ok_or_else(|| invalid("buffer too short"))?;

        let cdb_len = usize::from(header.cdb_length);
        if cdb_len == 0 || cdb_len > CDB_REGION_SIZE {
            return Err(invalid("bad CDB length"));
        }
        let data_len = header.data_transfer_length as usize;
        let data_offset = region(header.data_buffer_offset, data_len, buffer.len())?;
        let sense_len = usize::from(header.sense_info_length);
        let sense_offset = if sense_len == 0 {
            None
        } else {
            let offset = usize::try_from(header.sense_info_offset)
                .map_err(|_| invalid("offset out of range"))?;
            Some(region(offset, sense_len, buffer.len())?)
        };

        let dxfer_direction = match header.data_in {
            _ if data_len == 0 => SG_DXFER_NONE,
            SCSI_IOCTL_DATA_IN => SG_DXFER_FROM_DEV,
            SCSI_IOCTL_DATA_OUT => SG_DXFER_TO_DEV,
            _ => SG_DXFER_NONE,
        };

        let hdr = SgIoHdr {
            interface_id: SG_INTERFACE_ID_ORIG,
            dxfer_direction,
            cmd_len: header.cdb_length,
            mx_sb_len: header.sense_info_length,
            iovec_count: 0,
            dxfer_len: header.data_transfer_length,
            dxferp: buffer[data_offset..].as_mut_ptr().cast(),
            cmdp: buffer[CDB_OFFSET..].as_ptr(),
            sbp: sense_offset.map_or(ptr::null_mut(), |off| buffer[off..].as_mut_ptr()),
            timeout: header.timeout_value.saturating_mul(1000),
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        Ok(Self {
            header,
            data_offset,
            hdr,
        })
    }

    /// Folds the kernel's answer back into the record in `buffer` and returns
    /// how many bytes of `buffer` are valid, counting from its start.
    pub fn finish(mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let hdr = &self.hdr;
        let driver_status = hdr.driver_status & DRIVER_STATUS_MASK;
        if hdr.host_status != 0 || (driver_status != 0 && driver_status != DRIVER_SENSE) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                SgIoError {
                    host_status: hdr.host_status,
                    driver_status: hdr.driver_status,
                },
            ));
        }

        let data_len = self.header.data_transfer_length as usize;
        let resid = usize::try_from(hdr.resid).unwrap_or(0).min(data_len);
        let transferred = data_len - resid;
        debug!(
            "SG_IO done in {} ms: status {:#04x}, {} bytes in, {} sense bytes",
            hdr.duration, hdr.status, transferred, hdr.sb_len_wr
        );

        self.header.scsi_status = hdr.status;
        self.header.sense_info_length = hdr.sb_len_wr.min(self.header.sense_info_length);
        self.header.data_transfer_length = transferred as u32;
        self.header.write_to(buffer);

        Ok(self.data_offset + transferred)
    }
}

use std::{
    num::{NonZeroU32, NonZeroU8},
};

use log::debug;

use super::{
    command::{InquiryCdb, VpdPage},
    protocol::{
        CDB_LENGTH_OFFSET, CDB_OFFSET, CDB_REGION_SIZE, DATA_BUFFER_OFFSET_OFFSET,
        DATA_IN_OFFSET, DATA_OFFSET, DATA_TRANSFER_LENGTH_OFFSET, DEFAULT_ALLOCATION_LENGTH,
        DEFAULT_TIMEOUT, LENGTH_OFFSET, LUN_OFFSET, PATH_ID_OFFSET, RECORD_SIZE,
        SCSI_IOCTL_DATA_IN, SCSI_STATUS_OFFSET, SENSE_INFO_LENGTH_OFFSET,
        SENSE_INFO_OFFSET_OFFSET, TARGET_ID_OFFSET, TIMEOUT_VALUE_OFFSET,
    },
};

/// The `SCSI_PASS_THROUGH` record, CDB array included.
///
/// The in-memory layout of this struct is what sizes the header and CDB
/// regions of a [`TransferBuffer`]; the bytes themselves are written field by
/// field at the offsets in [`super::protocol`].
#[repr(C)]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct PassThroughHeader {
    pub length: u16,
    /// Filled in by the driver.
    pub scsi_status: u8,
    pub path_id: u8,
    pub target_id: u8,
    pub lun: u8,
    pub cdb_length: u8,
    pub sense_info_length: u8,
    pub data_in: u8,
    /// Requested on the way in; bytes actually transferred on the way out.
    pub data_transfer_length: u32,
    /// Seconds.
    pub timeout_value: u32,
    /// `ULONG_PTR` on the Windows side.
    pub data_buffer_offset: usize,
    pub sense_info_offset: u32,
    pub cdb: [u8; CDB_REGION_SIZE],
}

fn put_u32(buf: &mut [u8], offset: usize, val: u32) {
    buf[offset..offset + 4].copy_from_slice(&val.to_ne_bytes());
}

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(bytes)
}

fn put_usize(buf: &mut [u8], offset: usize, val: usize) {
    let bytes = val.to_ne_bytes();
    buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
}

fn get_usize(buf: &[u8], offset: usize) -> usize {
    let mut bytes = 0_usize.to_ne_bytes();
    let len = bytes.len();
    bytes.copy_from_slice(&buf[offset..offset + len]);
    usize::from_ne_bytes(bytes)
}

impl PassThroughHeader {
    /// Writes the record into the first `RECORD_SIZE` bytes of `buf`,
    /// zeroing every padding byte.
    ///
    /// Panics if `buf` is shorter than `RECORD_SIZE`.
    pub fn write_to(&self, buf: &mut [u8]) {
        let buf = &mut buf[..RECORD_SIZE];
        buf.fill(0);
        buf[LENGTH_OFFSET..LENGTH_OFFSET + 2].copy_from_slice(&self.length.to_ne_bytes());
        buf[SCSI_STATUS_OFFSET] = self.scsi_status;
        buf[PATH_ID_OFFSET] = self.path_id;
        buf[TARGET_ID_OFFSET] = self.target_id;
        buf[LUN_OFFSET] = self.lun;
        buf[CDB_LENGTH_OFFSET] = self.cdb_length;
        buf[SENSE_INFO_LENGTH_OFFSET] = self.sense_info_length;
        buf[DATA_IN_OFFSET] = self.data_in;
        put_u32(buf, DATA_TRANSFER_LENGTH_OFFSET, self.data_transfer_length);
        put_u32(buf, TIMEOUT_VALUE_OFFSET, self.timeout_value);
        put_usize(buf, DATA_BUFFER_OFFSET_OFFSET, self.data_buffer_offset);
        put_u32(buf, SENSE_INFO_OFFSET_OFFSET, self.sense_info_offset);
        buf[CDB_OFFSET..CDB_OFFSET + CDB_REGION_SIZE].copy_from_slice(&self.cdb);
    }

    /// Reads a record back out of `buf`, or `None` if `buf` can't hold one.
    pub fn read_from(buf: &[u8]) -> Option<Self> {
        if buf.len() < RECORD_SIZE {
            return None;
        }
        let mut cdb = [0; CDB_REGION_SIZE];
        cdb.copy_from_slice(&buf[CDB_OFFSET..CDB_OFFSET + CDB_REGION_SIZE]);
        Some(Self {
            length: u16::from_ne_bytes([buf[LENGTH_OFFSET], buf[LENGTH_OFFSET + 1]]),
            scsi_status: buf[SCSI_STATUS_OFFSET],
            path_id: buf[PATH_ID_OFFSET],
            target_id: buf[TARGET_ID_OFFSET],
            lun: buf[LUN_OFFSET],
            cdb_length: buf[CDB_LENGTH_OFFSET],
            sense_info_length: buf[SENSE_INFO_LENGTH_OFFSET],
            data_in: buf[DATA_IN_OFFSET],
            data_transfer_length: get_u32(buf, DATA_TRANSFER_LENGTH_OFFSET),
            timeout_value: get_u32(buf, TIMEOUT_VALUE_OFFSET),
            data_buffer_offset: get_usize(buf, DATA_BUFFER_OFFSET_OFFSET),
            sense_info_offset: get_u32(buf, SENSE_INFO_OFFSET_OFFSET),
            cdb,
        })
    }
}

/// Parameters for one INQUIRY/EVPD transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryRequest {
    page_code: u8,
    allocation_length: NonZeroU8,
    timeout: NonZeroU32,
    path_id: u8,
    target_id: u8,
    lun: u8,
    sense_length: u8,
}

impl InquiryRequest {
    pub fn new(page_code: u8) -> Self {
        Self {
            page_code,
            // both defaults are non-zero constants
            allocation_length: NonZeroU8::new(DEFAULT_ALLOCATION_LENGTH).unwrap(),
            timeout: NonZeroU32::new(DEFAULT_TIMEOUT).unwrap(),
            path_id: 0,
            target_id: 0,
            lun: 0,
            sense_length: 0,
        }
    }

    pub fn device_identification() -> Self {
        Self::new(VpdPage::DeviceIdentification.into())
    }

    pub const fn allocation_length(mut self, allocation_length: NonZeroU8) -> Self {
        self.allocation_length = allocation_length;
        self
    }

    pub const fn timeout(mut self, seconds: NonZeroU32) -> Self {
        self.timeout = seconds;
        self
    }

    pub const fn address(mut self, path_id: u8, target_id: u8, lun: u8) -> Self {
        self.path_id = path_id;
        self.target_id = target_id;
        self.lun = lun;
        self
    }

    /// Reserve `len` bytes after the data region for autosense. Zero (the
    /// default) requests no sense data at all.
    pub const fn sense_length(mut self, len: u8) -> Self {
        self.sense_length = len;
        self
    }

    pub fn cdb(&self) -> InquiryCdb {
        InquiryCdb::new(self.page_code, self.allocation_length)
    }

    fn header(&self) -> PassThroughHeader {
        let alloc = usize::from(self.allocation_length.get());
        let sense_info_offset = if self.sense_length == 0 {
            0
        } else {
            DATA_OFFSET + alloc
        };
        let cdb = self.cdb();
        PassThroughHeader {
            length: RECORD_SIZE as u16,
            scsi_status: 0,
            path_id: self.path_id,
            target_id: self.target_id,
            lun: self.lun,
            cdb_length: cdb.cdb_length(),
            sense_info_length: self.sense_length,
            data_in: SCSI_IOCTL_DATA_IN,
            data_transfer_length: u32::from(self.allocation_length.get()),
            timeout_value: self.timeout.get(),
            data_buffer_offset: DATA_OFFSET,
            sense_info_offset: sense_info_offset as u32,
            cdb: cdb.to_bytes(),
        }
    }

    pub fn build(&self) -> TransferBuffer {
        let alloc = usize::from(self.allocation_length.get());
        let mut buf = vec![0; DATA_OFFSET + alloc + usize::from(self.sense_length)];

        let header = self.header();
        header.write_to(&mut buf);

        debug!("Built pass-through request: {:?}", header);

        TransferBuffer {
            buf,
            allocation_length: alloc,
        }
    }
}

/// `[header][CDB region][data region][sense region]`, handed to the driver as
/// both input and output of a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBuffer {
    buf: Vec<u8>,
    allocation_length: usize,
}

impl TransferBuffer {
    pub const fn allocation_length(&self) -> usize {
        self.allocation_length
    }

    /// The header as it currently stands in the buffer.
    pub fn header(&self) -> PassThroughHeader {
        // the buffer is never shorter than a record
        PassThroughHeader::read_from(&self.buf).unwrap_or_default()
    }

    pub fn cdb(&self) -> &[u8] {
        &self.buf[CDB_OFFSET..CDB_OFFSET + CDB_REGION_SIZE]
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[DATA_OFFSET..DATA_OFFSET + self.allocation_length]
    }

    /// The sense region, or an empty slice if none was reserved.
    pub fn sense(&self) -> &[u8] {
        &self.buf[DATA_OFFSET + self.allocation_length..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

use std::num::NonZeroU8;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::protocol::{CDB_REGION_SIZE, EVPD, INQUIRY, INQUIRY_CDB_LEN};

/// VPD pages from SPC-6 table 667 that we know by name.
///
/// Only `DeviceIdentification` is decoded; the rest exist so errors can name
/// whatever page a device answered with instead.
#[derive(PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Debug, Copy, Clone)]
#[repr(u8)]
pub enum VpdPage {
    SupportedVpdPages = 0x00,
    UnitSerialNumber = 0x80,
    DeviceIdentification = 0x83,
    SoftwareInterfaceIdentification = 0x84,
    ManagementNetworkAddresses = 0x85,
    ExtendedInquiry = 0x86,
    ModePagePolicy = 0x87,
    ScsiPorts = 0x88,
    Ata = 0x89,
    PowerCondition = 0x8a,
    BlockLimits = 0xb0,
    BlockDeviceCharacteristics = 0xb1,
    LogicalBlockProvisioning = 0xb2,
}

/// INQUIRY with the EVPD bit set.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InquiryCdb {
    pub page_code: u8,
    pub allocation_length: NonZeroU8,
}

impl InquiryCdb {
    pub const fn new(page_code: u8, allocation_length: NonZeroU8) -> Self {
        Self {
            page_code,
            allocation_length,
        }
    }

    /// Number of meaningful bytes at the front of `to_bytes()`.
    pub const fn cdb_length(self) -> u8 {
        INQUIRY_CDB_LEN
    }

    /// The full CDB region, zero padded.
    pub fn to_bytes(self) -> [u8; CDB_REGION_SIZE] {
        let mut cdb = [0; CDB_REGION_SIZE];
        cdb[..usize::from(INQUIRY_CDB_LEN)].copy_from_slice(&[
            INQUIRY,
            EVPD,
            self.page_code,
            0, // reserved
            self.allocation_length.get(),
            0, // control
        ]);
        cdb
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;

    #[test]
    fn test_inquiry_cdb_layout() {
        let cdb = InquiryCdb::new(0x83, NonZeroU8::new(0xff).unwrap());

        assert_eq!(
            cdb.to_bytes(),
            [
                0x12, // INQUIRY
                0x01, // EVPD
                0x83, // page code
                0,    // reserved
                0xff, // allocation length
                0,    // control
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ]
        );
        assert_eq!(cdb.cdb_length(), 6);
    }

    #[test]
    fn test_inquiry_cdb_any_page() {
        for page in 0..=u8::MAX {
            for alloc in [1_u8, 4, 96, 254, 255].iter().copied() {
                let bytes = InquiryCdb::new(page, NonZeroU8::new(alloc).unwrap()).to_bytes();
                assert_eq!(bytes[0], 0x12);
                assert_eq!(bytes[1] & 1, 1);
                assert_eq!(bytes[2], page);
                assert_eq!(bytes[4], alloc);
                assert!(bytes[6..].iter().all(|&b| b == 0));
            }
        }
    }

    #[test]
    fn test_vpd_page_codes() {
        assert_eq!(u8::from(VpdPage::DeviceIdentification), 0x83);
        assert_eq!(VpdPage::try_from(0x80).unwrap(), VpdPage::UnitSerialNumber);
        assert!(VpdPage::try_from(0x7f).is_err());
    }
}

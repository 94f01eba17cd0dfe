//! Decoding of the Device Identification VPD page (0x83).
//!
//! The page is a 4-byte header followed by a run of self-describing
//! identifier descriptors. Malformed descriptors end the walk; they never
//! make decoding fail.

use std::fmt;

use log::{debug, warn};
use num_enum::FromPrimitive;

use super::{
    command::VpdPage,
    protocol::{CODE_SET_ASCII, DESIGNATOR_HEADER_LEN, VPD_HEADER_LEN},
    DecodeError,
};

/// What an identifier is attached to.
#[derive(PartialEq, Eq, FromPrimitive, Debug, Copy, Clone)]
#[repr(u8)]
pub enum Association {
    LogicalUnit = 0b00,
    TargetPort = 0b01,
    TargetDevice = 0b10,
    #[num_enum(default)]
    Reserved = 0b11,
}

#[derive(PartialEq, Eq, FromPrimitive, Debug, Copy, Clone)]
#[repr(u8)]
pub enum IdentifierType {
    VendorSpecific = 0x0,
    T10VendorId = 0x1,
    Eui64 = 0x2,
    Naa = 0x3,
    RelativeTargetPort = 0x4,
    TargetPortGroup = 0x5,
    LogicalUnitGroup = 0x6,
    Md5LogicalUnit = 0x7,
    ScsiName = 0x8,
    ProtocolSpecificPort = 0x9,
    Uuid = 0xa,
    #[num_enum(default)]
    Reserved = 0xf,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct IdentifierDescriptor<'a> {
    pub protocol_identifier: u8,
    pub code_set: u8,
    pub piv: bool,
    pub association: Association,
    pub identifier_type: IdentifierType,
    pub identifier: &'a [u8],
}

impl<'a> IdentifierDescriptor<'a> {
    pub const fn is_ascii(&self) -> bool {
        self.code_set == CODE_SET_ASCII
    }

    /// The identifier as text, with non-ASCII bytes dropped and surrounding
    /// whitespace and NUL padding removed.
    pub fn text(&self) -> String {
        let text: String = self
            .identifier
            .iter()
            .filter(|b| b.is_ascii())
            .map(|&b| char::from(b))
            .collect();
        text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_owned()
    }

    /// Whether this descriptor names something a human would call a serial
    /// number: ASCII, and scoped to a target port or the whole target device.
    pub fn is_serial_candidate(&self) -> bool {
        self.is_ascii()
            && matches!(
                self.association,
                Association::TargetPort | Association::TargetDevice
            )
    }
}

/// Walks the descriptor list of a page 0x83 payload, left to right.
#[derive(Debug, Clone)]
pub struct Descriptors<'a> {
    window: &'a [u8],
    idx: usize,
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = IdentifierDescriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.window.get(self.idx..)?;
        if rest.is_empty() {
            return None;
        }
        if rest.len() < DESIGNATOR_HEADER_LEN {
            warn!(
                "Ignoring truncated descriptor header at offset {} ({} bytes left)",
                self.idx,
                rest.len()
            );
            self.idx = self.window.len();
            return None;
        }

        let id_len = usize::from(rest[4]);
        let end = DESIGNATOR_HEADER_LEN + id_len;
        if end > rest.len() {
            warn!(
                "Descriptor at offset {} claims {} identifier bytes, only {} left",
                self.idx,
                id_len,
                rest.len() - DESIGNATOR_HEADER_LEN
            );
            self.idx = self.window.len();
            return None;
        }

        let desc = IdentifierDescriptor {
            protocol_identifier: rest[0] >> 4,
            code_set: rest[0] & 0x0f,
            piv: rest[1] & 0b1000_0000 != 0,
            association: Association::from((rest[1] >> 4) & 0b11),
            identifier_type: IdentifierType::from(rest[1] & 0x0f),
            identifier: &rest[DESIGNATOR_HEADER_LEN..end],
        };
        debug!("Descriptor at offset {}: {:?}", self.idx, desc);
        self.idx += end;
        Some(desc)
    }
}

/// Validates the page header and returns an iterator over its descriptors.
///
/// A page length that overstates the data present is clipped to what is
/// actually there.
pub fn descriptors(data: &[u8]) -> Result<Descriptors<'_>, DecodeError> {
    match data.first() {
        Some(&pc) if pc == u8::from(VpdPage::DeviceIdentification) => {}
        other => return Err(DecodeError::UnexpectedPage(other.copied())),
    }

    let window: &[u8] = if data.len() < VPD_HEADER_LEN {
        &[]
    } else {
        let page_len = usize::from(u16::from_be_bytes([data[2], data[3]]));
        let end = data.len().min(VPD_HEADER_LEN + page_len);
        if end < VPD_HEADER_LEN + page_len {
            debug!(
                "Page length {} overruns the {} byte response; clipping",
                page_len,
                data.len()
            );
        }
        &data[VPD_HEADER_LEN..end]
    };

    Ok(Descriptors { window, idx: 0 })
}

/// A human-readable identifier pulled from one descriptor.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SerialCandidate {
    pub value: String,
    pub association: Association,
    pub identifier_type: IdentifierType,
}

impl fmt::Display for SerialCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Every ASCII identifier scoped to a target port or target device, in the
/// order the device listed them. Duplicates are kept: the same identity is
/// often reported under more than one association.
pub fn serial_candidates(data: &[u8]) -> Result<Vec<SerialCandidate>, DecodeError> {
    Ok(descriptors(data)?
        .filter(|desc| desc.is_serial_candidate())
        .filter_map(|desc| {
            let value = desc.text();
            if value.is_empty() {
                None
            } else {
                Some(SerialCandidate {
                    value,
                    association: desc.association,
                    identifier_type: desc.identifier_type,
                })
            }
        })
        .collect())
}

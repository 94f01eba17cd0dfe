pub mod command;
pub mod executor;
pub mod pass_through;
pub mod protocol;
pub mod sense;
#[cfg(target_os = "linux")]
pub mod sg_io;
mod tests;
pub mod vpd;

use std::{convert::TryFrom, fmt, io, path::PathBuf};

use log::debug;

use self::{
    command::VpdPage,
    pass_through::InquiryRequest,
    protocol::{
        STATUS_BUSY, STATUS_CHECK_CONDITION, STATUS_RESERVATION_CONFLICT, STATUS_TASK_SET_FULL,
    },
    sense::SenseTriple,
    vpd::SerialCandidate,
};

/// Something that can carry a SCSI pass-through request to a device.
///
/// `buffer` is a [`pass_through::TransferBuffer`]'s bytes: the header and CDB
/// go in, and the driver writes status, data and sense back into the same
/// bytes. Returns how many bytes of `buffer` are valid on return.
pub trait ControlTransfer {
    fn scsi_pass_through(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

impl<T: ControlTransfer + ?Sized> ControlTransfer for &mut T {
    fn scsi_pass_through(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        (**self).scsi_pass_through(buffer)
    }
}

/// The pass-through call itself failed, or came back unusable.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("SCSI pass-through failed: {0}")]
    Ioctl(#[source] io::Error),
    #[error("device returned {returned} data bytes, fewer than a VPD page header")]
    ShortResponse { returned: usize },
    /// Any SCSI status other than GOOD.
    #[error("device reported {}{}", StatusName(*.status), sense_suffix(.sense))]
    BadStatus {
        status: u8,
        sense: Option<SenseTriple>,
    },
}

fn sense_suffix(sense: &Option<SenseTriple>) -> String {
    sense.map(|s| format!(": {}", s)).unwrap_or_default()
}

struct StatusName(u8);

impl fmt::Display for StatusName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            STATUS_CHECK_CONDITION => "CHECK CONDITION",
            STATUS_BUSY => "BUSY",
            STATUS_RESERVATION_CONFLICT => "RESERVATION CONFLICT",
            STATUS_TASK_SET_FULL => "TASK SET FULL",
            _ => return write!(f, "status {:#04x}", self.0),
        };
        write!(f, "{} ({:#04x})", name, self.0)
    }
}

impl TransferError {
    /// The platform error code, for transport failures that have one.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            Self::Ioctl(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum DecodeError {
    /// The response isn't page 0x83; `None` if it was empty.
    #[error("expected VPD page 0x83, got {}", PageName(*.0))]
    UnexpectedPage(Option<u8>),
}

struct PageName(Option<u8>);

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("an empty response"),
            Some(code) => match VpdPage::try_from(code) {
                Ok(page) => write!(f, "page {:#04x} ({:?})", code, page),
                Err(_) => write!(f, "page {:#04x}", code),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open {}: {source}", .path.display())]
    HandleOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Runs one INQUIRY for the Device Identification page and returns every
/// serial number candidate found in it.
pub fn read_device_identification<D: ControlTransfer>(
    device: &mut D,
    request: &InquiryRequest,
) -> Result<Vec<SerialCandidate>, Error> {
    let mut buffer = request.build();
    let response = executor::execute(device, &mut buffer)?;
    let candidates = vpd::serial_candidates(response.data)?;
    debug!("Found {} serial candidate(s)", candidates.len());
    Ok(candidates)
}

use log::debug;

use super::{
    pass_through::TransferBuffer,
    protocol::{DATA_OFFSET, STATUS_GOOD, VPD_HEADER_LEN},
    sense::SenseTriple,
    ControlTransfer, TransferError,
};

/// What came back from one pass-through call, borrowed from the transfer
/// buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Response<'a> {
    pub scsi_status: u8,
    pub bytes_returned: usize,
    /// The data region, cut down to what the device actually transferred.
    pub data: &'a [u8],
    /// Sense bytes written by the driver; empty unless a sense region was
    /// requested and filled.
    pub sense: &'a [u8],
}

/// Sends `buffer` to `device` in a single blocking call and slices the
/// response out of it. There is no retry.
pub fn execute<'a, D: ControlTransfer + ?Sized>(
    device: &mut D,
    buffer: &'a mut TransferBuffer,
) -> Result<Response<'a>, TransferError> {
    let bytes_returned = device
        .scsi_pass_through(buffer.as_mut_bytes())
        .map_err(TransferError::Ioctl)?;

    let buffer: &'a TransferBuffer = buffer;
    let header = buffer.header();
    debug!(
        "Pass-through returned {} bytes, status {:#04x}, {} data bytes",
        bytes_returned, header.scsi_status, header.data_transfer_length
    );

    let sense_len = usize::from(header.sense_info_length).min(buffer.sense().len());
    let sense = &buffer.sense()[..sense_len];

    if header.scsi_status != STATUS_GOOD {
        return Err(TransferError::BadStatus {
            status: header.scsi_status,
            sense: SenseTriple::parse(sense),
        });
    }

    let returned = bytes_returned
        .saturating_sub(DATA_OFFSET)
        .min(header.data_transfer_length as usize)
        .min(buffer.allocation_length());

    if returned < VPD_HEADER_LEN {
        return Err(TransferError::ShortResponse { returned });
    }

    Ok(Response {
        scsi_status: header.scsi_status,
        bytes_returned,
        data: &buffer.data()[..returned],
        sense,
    })
}

#![cfg(test)]

mod executor;

use std::io;

use super::{
    pass_through::PassThroughHeader,
    protocol::{CDB_OFFSET, RECORD_SIZE, STATUS_GOOD},
    ControlTransfer,
};

/// Stands in for the kernel: answers every pass-through with a canned
/// response, filling the buffer the way the driver would.
#[derive(Debug, Default)]
struct FakeDrive {
    page: Vec<u8>,
    status: u8,
    sense: Vec<u8>,
    /// Fail the call outright with this OS error code.
    os_error: Option<i32>,
    /// CDBs seen, in order.
    cdbs: Vec<Vec<u8>>,
}

impl FakeDrive {
    fn answering(page: &[u8]) -> Self {
        Self {
            page: page.to_vec(),
            status: STATUS_GOOD,
            ..Self::default()
        }
    }
}

impl ControlTransfer for FakeDrive {
    fn scsi_pass_through(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut header = PassThroughHeader::read_from(buffer).unwrap();
        assert_eq!(usize::from(header.length), RECORD_SIZE);
        self.cdbs.push(
            buffer[CDB_OFFSET..CDB_OFFSET + usize::from(header.cdb_length)].to_vec(),
        );

        if let Some(code) = self.os_error {
            return Err(io::Error::from_raw_os_error(code));
        }

        let data_offset = header.data_buffer_offset;
        let n = self.page.len().min(header.data_transfer_length as usize);
        buffer[data_offset..data_offset + n].copy_from_slice(&self.page[..n]);

        let sense_n = if header.sense_info_offset == 0 {
            0
        } else {
            let sense_offset = header.sense_info_offset as usize;
            let sense_n = self.sense.len().min(usize::from(header.sense_info_length));
            buffer[sense_offset..sense_offset + sense_n].copy_from_slice(&self.sense[..sense_n]);
            sense_n
        };

        header.scsi_status = self.status;
        header.sense_info_length = sense_n as u8;
        header.data_transfer_length = n as u32;
        header.write_to(buffer);

        Ok(data_offset + n)
    }
}

/// A page 0x83 with the given descriptors and a correct page length.
fn page_83(descriptors: &[&[u8]]) -> Vec<u8> {
    let body: Vec<u8> = descriptors.concat();
    let mut page = vec![0x83, 0];
    page.extend_from_slice(&(body.len() as u16).to_be_bytes());
    page.extend_from_slice(&body);
    page
}

/// One identifier descriptor: code set, association, type, then identifier.
fn descriptor(code_set: u8, association: u8, id_type: u8, identifier: &[u8]) -> Vec<u8> {
    let mut desc = vec![
        code_set,                     // protocol identifier 0, code set
        (association << 4) | id_type, // PIV 0, association, type
        0,                            // reserved
        0,                            // reserved
        identifier.len() as u8,       // identifier length
    ];
    desc.extend_from_slice(identifier);
    desc
}

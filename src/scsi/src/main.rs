#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_debug_implementations)]

use std::{
    num::{NonZeroU32, NonZeroU8},
    path::PathBuf,
    process,
};

use log::error;
use structopt::StructOpt;

use vpd_serial::{
    device::{DeviceHandle, DEFAULT_DEVICE},
    scsi::{
        executor, pass_through::InquiryRequest, protocol::SENSE_BUFFER_LEN,
        read_device_identification, vpd, Error,
    },
};

#[derive(StructOpt, Debug)]
#[structopt(about = "Reads serial number candidates from SCSI VPD page 0x83")]
struct Opt {
    /// Raw block device to query
    #[structopt(parse(from_os_str), default_value = DEFAULT_DEVICE)]
    device: PathBuf,
    /// INQUIRY allocation length, 1 to 255
    #[structopt(short = "l", long, default_value = "255")]
    allocation_length: NonZeroU8,
    /// Command timeout in seconds
    #[structopt(short, long, default_value = "2")]
    timeout: NonZeroU32,
    /// SCSI port (path) of the target, for controllers with more than one
    #[structopt(long, default_value = "0")]
    path_id: u8,
    /// SCSI target id
    #[structopt(long, default_value = "0")]
    target_id: u8,
    /// Logical unit number
    #[structopt(long, default_value = "0")]
    lun: u8,
    /// Reserve a sense buffer so failed commands report why
    #[structopt(long)]
    sense: bool,
    /// Also print every identifier descriptor on the page
    #[structopt(short, long)]
    all: bool,
}

impl Opt {
    fn request(&self) -> InquiryRequest {
        let request = InquiryRequest::device_identification()
            .allocation_length(self.allocation_length)
            .timeout(self.timeout)
            .address(self.path_id, self.target_id, self.lun);
        if self.sense {
            request.sense_length(SENSE_BUFFER_LEN)
        } else {
            request
        }
    }
}

fn print_descriptors(data: &[u8]) -> Result<(), Error> {
    println!("Identifier descriptors:");
    for desc in vpd::descriptors(data)? {
        let value = if desc.is_ascii() {
            format!("{:?}", desc.text())
        } else {
            desc.identifier
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()
        };
        println!(
            "  {:?}/{:?} (code set {}, protocol {:#x}{}): {}",
            desc.association,
            desc.identifier_type,
            desc.code_set,
            desc.protocol_identifier,
            if desc.piv { ", piv" } else { "" },
            value
        );
    }
    Ok(())
}

fn run(opt: &Opt) -> Result<(), Error> {
    let mut device = DeviceHandle::open(&opt.device).map_err(|source| Error::HandleOpen {
        path: opt.device.clone(),
        source,
    })?;

    let serials = if opt.all {
        let mut buffer = opt.request().build();
        let response = executor::execute(&mut device, &mut buffer)?;
        print_descriptors(response.data)?;
        vpd::serial_candidates(response.data)?
    } else {
        read_device_identification(&mut device, &opt.request())?
    };

    if serials.is_empty() {
        println!("No ASCII serial candidates found in VPD page 0x83.");
    } else {
        println!("Potential serial number(s):");
        for serial in &serials {
            println!("  {}", serial);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let opt = Opt::from_args();

    if let Err(e) = run(&opt) {
        if let Error::Transfer(ref te) = e {
            if let Some(code) = te.os_error() {
                error!("Pass-through failed with OS error code {}", code);
            }
        }
        error!("{:?}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

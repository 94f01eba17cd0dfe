//! Reads a storage device's identifiers with a SCSI INQUIRY for the Device
//! Identification VPD page (0x83), sent through the operating system's
//! pass-through interface.
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_debug_implementations)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod device;
pub mod scsi;

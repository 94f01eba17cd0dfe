//! Raw block device handles, and the platform pass-through call behind
//! [`ControlTransfer`].

use std::{io, path::Path};

use log::info;

use crate::scsi::ControlTransfer;

#[cfg(target_os = "linux")]
pub const DEFAULT_DEVICE: &str = "/dev/sda";
#[cfg(windows)]
pub const DEFAULT_DEVICE: &str = r"\\.\PhysicalDrive0";
#[cfg(not(any(target_os = "linux", windows)))]
pub const DEFAULT_DEVICE: &str = "/dev/da0";

/// An open device, closed when dropped.
#[derive(Debug)]
pub struct DeviceHandle {
    inner: imp::Handle,
}

impl DeviceHandle {
    /// Opens `path` for reading and writing, leaving other openers free to do
    /// the same.
    pub fn open(path: &Path) -> io::Result<Self> {
        info!("Opening {}", path.display());
        Ok(Self {
            inner: imp::Handle::open(path)?,
        })
    }
}

impl ControlTransfer for DeviceHandle {
    fn scsi_pass_through(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.inner.scsi_pass_through(buffer)
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use std::{
        fs::{File, OpenOptions},
        io,
        path::Path,
    };

    use vmm_sys_util::ioctl::ioctl_with_mut_ref;

    use crate::scsi::sg_io::{SgRequest, SG_IO};

    #[derive(Debug)]
    pub struct Handle {
        file: File,
    }

    impl Handle {
        pub fn open(path: &Path) -> io::Result<Self> {
            Ok(Self {
                file: OpenOptions::new().read(true).write(true).open(path)?,
            })
        }

        pub fn scsi_pass_through(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            let mut request = SgRequest::new(buffer)?;

            // SAFETY: SG_IO reads and writes only through the pointers in
            // `request.hdr`, all of which were bounds checked against `buffer`,
            // which is not touched again until the call returns.
            let ret = unsafe { ioctl_with_mut_ref(&self.file, SG_IO.into(), &mut request.hdr) };
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }

            request.finish(buffer)
        }
    }
}

#[cfg(windows)]
mod imp {
    //! `IOCTL_SCSI_PASS_THROUGH`, which takes the buffer exactly as built.

    use std::{io, iter, os::windows::ffi::OsStrExt, path::Path, ptr};

    use log::warn;
    use winapi::{
        shared::{minwindef::DWORD, ntddscsi::IOCTL_SCSI_PASS_THROUGH, ntdef::HANDLE},
        um::{
            fileapi::{CreateFileW, OPEN_EXISTING},
            handleapi::{CloseHandle, INVALID_HANDLE_VALUE},
            ioapiset::DeviceIoControl,
            winnt::{FILE_SHARE_READ, FILE_SHARE_WRITE, GENERIC_READ, GENERIC_WRITE},
        },
    };


    #[derive(Debug)]
    pub struct Handle {
        handle: HANDLE,
    }

    impl Handle {
        pub fn open(path: &Path) -> io::Result<Self> {
            let wide: Vec<u16> = path
                .as_os_str()
                .encode_wide()
                .chain(iter::once(0))
                .collect();
            // SAFETY: `wide` is NUL terminated and outlives the call.
            let handle = unsafe {
                CreateFileW(
                    wide.as_ptr(),
                    GENERIC_READ | GENERIC_WRITE,
                    FILE_SHARE_READ | FILE_SHARE_WRITE,
                    ptr::null_mut(),
                    OPEN_EXISTING,
                    0,
                    ptr::null_mut(),
                )
            };
            if handle == INVALID_HANDLE_VALUE {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { handle })
        }

        pub fn scsi_pass_through(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            let len = buffer.len() as DWORD;
            let mut returned: DWORD = 0;
            // SAFETY: input and output both describe `buffer`, which the
            // driver is allowed to alias for this IOCTL.
            let ok = unsafe {
                DeviceIoControl(
                    self.handle,
                    IOCTL_SCSI_PASS_THROUGH,
                    buffer.as_mut_ptr().cast(),
                    len,
                    buffer.as_mut_ptr().cast(),
                    len,
                    &mut returned,
                    ptr::null_mut(),
                )
            };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(returned as usize)
        }
    }

    impl Drop for Handle {
        fn drop(&mut self) {
            // SAFETY: `handle` came from CreateFileW and is closed only here.
            if unsafe { CloseHandle(self.handle) } == 0 {
                warn!("CloseHandle failed: {}", io::Error::last_os_error());
            }
        }
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod imp {
    use std::{io, path::Path};

    #[derive(Debug)]
    pub enum Handle {}

    impl Handle {
        pub fn open(_path: &Path) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "SCSI pass-through is not supported on this platform",
            ))
        }

        pub fn scsi_pass_through(&mut self, _buffer: &mut [u8]) -> io::Result<usize> {
            match *self {}
        }
    }
}

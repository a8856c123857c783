use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{fence, Ordering};

use thiserror::Error;

/// A memory-mapped BAR2 register window.
///
/// Reads and writes are plain volatile word accesses; [`Bar2::barrier`]
/// issues a full compiler/CPU fence so that a write posted before the
/// barrier is visible to any read issued after it. No value is ever
/// cached by this type.
pub struct Bar2 {
    base: *mut u32,
    len: usize,
}

// The mapped region is hardware register space: concurrent access from
// independent blocks (CMAC, switch, QDMA, stats, CMS) is safe by design.
unsafe impl Send for Bar2 {}
unsafe impl Sync for Bar2 {}

#[derive(Debug, Error)]
pub enum Bar2Error {
    #[error("failed to open resource file {0}: {1}")]
    Open(String, std::io::Error),
    #[error("failed to stat resource file {0}: {1}")]
    Stat(String, std::io::Error),
    #[error("mmap of {0} bytes failed: {1}")]
    Mmap(usize, std::io::Error),
    #[error("register offset {0:#x} is out of range of a {1}-byte BAR")]
    OutOfRange(usize, usize),
}

impl Bar2 {
    /// Maps `/sys/bus/pci/devices/<bus-id>/resource2` read/write, shared.
    pub fn open(resource_path: &str) -> Result<Self, Bar2Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(resource_path)
            .map_err(|e| Bar2Error::Open(resource_path.to_string(), e))?;

        let len = file
            .metadata()
            .map_err(|e| Bar2Error::Stat(resource_path.to_string(), e))?
            .len() as usize;

        let fd = file.as_raw_fd();
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(Bar2Error::Mmap(len, std::io::Error::last_os_error()));
        }

        Ok(Bar2 {
            base: base as *mut u32,
            len,
        })
    }

    #[inline]
    fn word_ptr(&self, offset: usize) -> Result<*mut u32, Bar2Error> {
        if offset + 4 > self.len {
            return Err(Bar2Error::OutOfRange(offset, self.len));
        }
        debug_assert!(offset % 4 == 0, "register offset must be word aligned");
        Ok(unsafe { self.base.add(offset / 4) })
    }

    /// Reads one 32-bit register. No caching: every call reissues the load.
    pub fn read_u32(&self, offset: usize) -> u32 {
        let ptr = self.word_ptr(offset).expect("register offset out of range");
        unsafe { std::ptr::read_volatile(ptr) }
    }

    /// Writes one 32-bit register.
    pub fn write_u32(&self, offset: usize, value: u32) {
        let ptr = self.word_ptr(offset).expect("register offset out of range");
        unsafe { std::ptr::write_volatile(ptr, value) };
    }

    /// Full compiler/CPU barrier. Must be issued between a write and any
    /// subsequent read whose semantics depend on that write having landed.
    pub fn barrier(&self) {
        fence(Ordering::SeqCst);
        std::sync::atomic::compiler_fence(Ordering::SeqCst);
    }

    /// Reads a 16-bit sticky status field twice, discarding the first
    /// read, so latched bits set before the previous poll don't leak
    /// into this observation (CMAC rx_status).
    pub fn read_u32_latched(&self, offset: usize) -> u32 {
        let _ = self.read_u32(offset);
        self.read_u32(offset)
    }
}

impl Drop for Bar2 {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.len);
        }
    }
}

//! Shared-memory pixel pool.
//!
//! The pool is an anonymous memory-backed file sized to one frame,
//! mapped read/write into the process, and shared with the compositor by
//! passing its file descriptor over the control socket.  The mapping is
//! private to [`ShmPool`]; render code only ever sees the bounds-checked
//! slice returned by [`frame`], which lives exactly as long as the pool.
//!
//! [`frame`]: ShmPool::frame

use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::ptr::NonNull;

use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::unistd::ftruncate;
use thiserror::Error;
use tracing::warn;

/// Errors raised while creating or sizing the pool.  All of them are
/// fatal to buffer setup; the session can never reach the attached state
/// without a pool.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to create shared-memory file: {0}")]
    Create(#[source] nix::Error),

    #[error("failed to size shared-memory file to {size} bytes: {source}")]
    Size {
        size: i64,
        #[source]
        source: nix::Error,
    },

    #[error("failed to map shared-memory pool: {0}")]
    Map(#[source] nix::Error),

    #[error("shared-memory pool cannot be empty")]
    EmptyPool,
}

/// A mapped, file-backed pixel pool.
pub struct ShmPool {
    fd: OwnedFd,
    base: NonNull<c_void>,
    len: usize,
}

impl ShmPool {
    /// Creates a pool of `len` bytes: memfd, truncate, map.
    pub fn allocate(len: usize) -> Result<Self, ResourceError> {
        let map_len = NonZeroUsize::new(len).ok_or(ResourceError::EmptyPool)?;
        let fd = memfd_create(c"waykvm-pool", MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(ResourceError::Create)?;
        ftruncate(&fd, len as i64).map_err(|source| ResourceError::Size {
            size: len as i64,
            source,
        })?;
        // SAFETY: mapping a fresh descriptor we own, at a kernel-chosen
        // address, for exactly the length the file was truncated to.
        let base = unsafe {
            mmap(
                None,
                map_len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(ResourceError::Map)?;
        Ok(Self { fd, base, len })
    }

    /// The descriptor to hand to the compositor alongside the
    /// pool-creation request.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole mapped frame as a mutable slice.
    pub fn frame(&mut self) -> &mut [u8] {
        // SAFETY: base points at a live MAP_SHARED mapping of exactly
        // `len` bytes, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().cast::<u8>(), self.len) }
    }
}

impl Drop for ShmPool {
    fn drop(&mut self) {
        // SAFETY: base/len are the exact values returned by mmap.
        if let Err(e) = unsafe { munmap(self.base, self.len) } {
            warn!("failed to unmap shared-memory pool: {e}");
        }
    }
}

// SAFETY: the mapping is owned exclusively by this struct and carries no
// thread affinity; moving it between threads is sound.
unsafe impl Send for ShmPool {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_maps_requested_length() {
        let mut pool = ShmPool::allocate(4096).expect("allocate failed");

        assert_eq!(pool.len(), 4096);
        assert_eq!(pool.frame().len(), 4096);
    }

    #[test]
    fn test_frame_writes_are_visible_across_calls() {
        let mut pool = ShmPool::allocate(64).expect("allocate failed");

        pool.frame()[0] = 0xAB;
        pool.frame()[63] = 0xCD;

        assert_eq!(pool.frame()[0], 0xAB);
        assert_eq!(pool.frame()[63], 0xCD);
    }

    #[test]
    fn test_zero_length_pool_is_rejected() {
        assert!(matches!(
            ShmPool::allocate(0),
            Err(ResourceError::EmptyPool)
        ));
    }
}

// A tiny single-threaded fd reactor.
//
// This stands in for the platform event loop: the spec treats the real
// reactor as an external collaborator that hands out fd-readiness
// callbacks on one OS thread per process. `FdWatch` is the shape of that
// collaborator so the rest of the crate can be written against a trait
// instead of a concrete mainloop.
use nix::sys::select::{select, FdSet};
use nix::sys::time::{TimeVal, TimeValLike};
use std::os::unix::io::RawFd;

pub struct FdWatch {
    fds: Vec<RawFd>,
}

impl FdWatch {
    pub fn new() -> Self {
        Self { fds: Vec::new() }
    }

    /// Register a fd to be watched for readability. Does not take
    /// ownership; the caller is responsible for closing it.
    pub fn add_fd(&mut self, fd: RawFd) {
        if !self.fds.contains(&fd) {
            self.fds.push(fd);
        }
    }

    pub fn remove_fd(&mut self, fd: RawFd) {
        self.fds.retain(|f| *f != fd);
    }

    /// Block until one of the registered fds is readable or `timeout_ms`
    /// elapses. Returns the subset of fds that became readable.
    pub fn wait_for_events(&self, timeout_ms: i64) -> Vec<RawFd> {
        if self.fds.is_empty() {
            return Vec::new();
        }

        let mut read_fds = FdSet::new();
        let mut max_fd = 0;
        for fd in &self.fds {
            read_fds.insert(*fd);
            max_fd = max_fd.max(*fd);
        }

        let mut timeout = TimeVal::milliseconds(timeout_ms);
        match select(max_fd + 1, &mut read_fds, None, None, &mut timeout) {
            Ok(n) if n > 0 => self
                .fds
                .iter()
                .copied()
                .filter(|fd| read_fds.contains(*fd))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for FdWatch {
    fn default() -> Self {
        Self::new()
    }
}

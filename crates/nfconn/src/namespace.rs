//! Network namespace handles for namespaced sockets.
//!
//! # Example
//!
//! ```ignore
//! use nfconn::{Config, Conn, namespace};
//!
//! // Dial into a namespace created with `ip netns add myns`
//! let ns = namespace::open("myns")?;
//! let conn = Conn::dial(Some(&Config::new().netns(ns.as_raw_fd())))?;
//!
//! // Or into the namespace of a running process
//! let ns = namespace::open_pid(1234)?;
//! ```

use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use super::error::Result;

/// The runtime directory where named network namespaces are stored.
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// Open a named network namespace (from [`NETNS_RUN_DIR`]).
pub fn open(name: &str) -> Result<NamespaceFd> {
    let path = PathBuf::from(NETNS_RUN_DIR).join(name);
    open_path(&path)
}

/// Open a namespace file by path.
///
/// Works with any namespace file, e.g. `/var/run/netns/<name>` or
/// `/proc/<pid>/ns/net`.
pub fn open_path<P: AsRef<Path>>(path: P) -> Result<NamespaceFd> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("cannot open namespace '{}': {}", path.display(), e),
        )
    })?;
    Ok(NamespaceFd { file })
}

/// Open a process's network namespace.
pub fn open_pid(pid: u32) -> Result<NamespaceFd> {
    open_path(format!("/proc/{}/ns/net", pid))
}

/// A handle to an open namespace file.
///
/// Keep it alive until [`Conn::dial`](crate::Conn::dial) returns.
#[derive(Debug)]
pub struct NamespaceFd {
    file: File,
}

impl NamespaceFd {
    /// Get the raw file descriptor.
    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsRawFd for NamespaceFd {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

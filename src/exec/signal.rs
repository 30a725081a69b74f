// src/exec/signal.rs

//! Signal delivery to a whole process group.

use std::io;

#[cfg(unix)]
pub use libc::{SIGINT, SIGKILL, SIGTERM};

/// Send `sig` to every process in the group led by `pid`.
#[cfg(unix)]
pub fn signal_group(pid: u32, sig: i32) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("pid {pid} out of range")))?;
    // SAFETY: kill(2) takes plain integers and has no memory-safety requirements.
    let rc = unsafe { libc::kill(-pgid, sig) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn signal_group(_pid: u32, _sig: i32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process group signals are only supported on unix",
    ))
}

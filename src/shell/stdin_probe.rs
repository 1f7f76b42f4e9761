//! Detection of data pushed on our own standard input.
//!
//! The invoked command never sees our stdin. Anything the remote side sends
//! there anyway is read here, one line at most, so it can be audited. Every
//! read is preceded by a zero-timeout `poll`, so probing never blocks.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

/// Upper bound on the captured line.
pub const MAX_LEAK_BYTES: usize = 4096;

/// Read at most one line from `source` without blocking.
///
/// Returns `Ok(None)` when nothing is pending, when the stream is at EOF, or
/// when the descriptor is not open.
pub fn probe_stdin_leak(source: impl AsFd) -> io::Result<Option<String>> {
    let fd = source.as_fd();
    if !poll_readable(fd)? {
        return Ok(None);
    }

    // Read through a duplicate so dropping the `File` leaves `source` open.
    let mut reader = File::from(fd.try_clone_to_owned()?);
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while line.len() < MAX_LEAK_BYTES {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
        if !poll_readable(fd)? {
            break;
        }
    }

    if line.is_empty() {
        Ok(None)
    } else {
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

fn poll_readable(fd: BorrowedFd<'_>) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if rc == 0 || pfd.revents & libc::POLLNVAL != 0 {
            return Ok(false);
        }
        return Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP) != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_nothing_pending() {
        let (_caller, ours) = UnixStream::pair().unwrap();
        assert_eq!(probe_stdin_leak(&ours).unwrap(), None);
    }

    #[test]
    fn test_reads_only_first_line() {
        let (mut caller, mut ours) = UnixStream::pair().unwrap();
        caller.write_all(b"secret\nmore").unwrap();

        assert_eq!(probe_stdin_leak(&ours).unwrap().as_deref(), Some("secret\n"));

        // The rest stays queued on the shared descriptor.
        ours.set_nonblocking(true).unwrap();
        let mut rest = [0u8; 16];
        let n = ours.read(&mut rest).unwrap();
        assert_eq!(&rest[..n], b"more");
    }

    #[test]
    fn test_partial_line_does_not_block() {
        let (mut caller, ours) = UnixStream::pair().unwrap();
        caller.write_all(b"no newline yet").unwrap();
        // `caller` stays open, so a blocking read would hang here.
        assert_eq!(
            probe_stdin_leak(&ours).unwrap().as_deref(),
            Some("no newline yet")
        );
    }

    #[test]
    fn test_closed_peer_is_not_a_leak() {
        let (caller, ours) = UnixStream::pair().unwrap();
        drop(caller);
        assert_eq!(probe_stdin_leak(&ours).unwrap(), None);
    }

    #[test]
    fn test_line_is_bounded() {
        let (mut caller, ours) = UnixStream::pair().unwrap();
        caller.write_all(&vec![b'x'; MAX_LEAK_BYTES * 2]).unwrap();
        let leak = probe_stdin_leak(&ours).unwrap().unwrap();
        assert_eq!(leak.len(), MAX_LEAK_BYTES);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let (mut caller, ours) = UnixStream::pair().unwrap();
        caller.write_all(&[b'a', 0xff, b'\n']).unwrap();
        assert_eq!(
            probe_stdin_leak(&ours).unwrap().as_deref(),
            Some("a\u{fffd}\n")
        );
    }
}

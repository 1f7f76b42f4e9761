//! Resolution of the invoking user.
//!
//! The name is looked up from the real uid in the passwd database rather
//! than taken from `USER` or `LOGNAME`.

use std::ffi::CStr;
use std::io;

use crate::error::{RcshError, Result};

const INITIAL_BUFFER: usize = 1024;
const MAX_BUFFER: usize = 1 << 20;

pub fn current_username() -> Result<String> {
    let uid = unsafe { libc::getuid() };
    username_for_uid(uid)
}

pub fn username_for_uid(uid: libc::uid_t) -> Result<String> {
    let mut buf: Vec<libc::c_char> = vec![0; INITIAL_BUFFER];

    loop {
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let rc = unsafe {
            libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };

        if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 {
            return Err(RcshError::Identity(format!(
                "getpwuid_r({}): {}",
                uid,
                io::Error::from_raw_os_error(rc)
            )));
        }
        if result.is_null() || pwd.pw_name.is_null() {
            return Err(RcshError::Identity(format!("no passwd entry for uid {}", uid)));
        }

        // pw_name points into `buf`, which is still alive here.
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        return Ok(name.to_string_lossy().into_owned());
    }
}

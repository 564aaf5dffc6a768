//! The C ABI of the shared library.
//!
//! Topology strings are heap allocated JSON owned by the caller, who must hand them back to
//! [`FreeTopologyCtypes`]. Failures are logged and reported as an empty string.
#![allow(non_snake_case)]

use crate::{
    core::check_chip_id,
    topology::{
        Error,
        Topology,
    },
};
use std::{
    ffi::{
        CStr,
        CString,
    },
    os::raw::c_char,
};
use tracing::error;

fn into_raw(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// # Safety
/// `configxml` must be null or a valid NUL terminated string
unsafe fn topology(configxml: *const c_char) -> Result<Topology, Error> {
    if configxml.is_null() {
        return Err(Error::Path);
    }
    let path = CStr::from_ptr(configxml).to_str()?;
    Topology::from_config(path)
}

/// The JSON topology (GDCC -> DIF -> ASU -> channels) of the acquisition configuration file
/// `configxml`
///
/// # Safety
/// `configxml` must be null or a valid NUL terminated string. The result must be released with
/// [`FreeTopologyCtypes`].
#[no_mangle]
pub unsafe extern "C" fn GetTopologyCtypes(configxml: *const c_char) -> *mut c_char {
    match topology(configxml).and_then(|t| t.to_json()) {
        Ok(json) => into_raw(json),
        Err(e) => {
            error!("[GetTopologyCtypes] {e}");
            into_raw(String::new())
        }
    }
}

/// The JSON topology keyed by absolute DIF (DIF -> ASU -> channels)
///
/// # Safety
/// `configxml` must be null or a valid NUL terminated string. The result must be released with
/// [`FreeTopologyCtypes`].
#[no_mangle]
pub unsafe extern "C" fn GetDifTopologyCtypes(configxml: *const c_char) -> *mut c_char {
    let json = topology(configxml)
        .and_then(|t| t.dif_topology())
        .and_then(|m| serde_json::to_string(&m).map_err(Error::from));
    match json {
        Ok(json) => into_raw(json),
        Err(e) => {
            error!("[GetDifTopologyCtypes] {e}");
            into_raw(String::new())
        }
    }
}

/// Release a string returned by one of the topology functions. Null is ignored.
///
/// # Safety
/// `topology_string` must be null or a pointer returned by [`GetTopologyCtypes`] or
/// [`GetDifTopologyCtypes`] that was not freed yet.
#[no_mangle]
pub unsafe extern "C" fn FreeTopologyCtypes(topology_string: *mut c_char) {
    if !topology_string.is_null() {
        drop(CString::from_raw(topology_string));
    }
}

#[no_mangle]
pub extern "C" fn check_ChipID(chip_id: i16, n_chips: u16) -> bool {
    check_chip_id(chip_id, n_chips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_null_path() {
        unsafe {
            let s = GetTopologyCtypes(ptr::null());
            assert!(!s.is_null());
            assert_eq!(CStr::from_ptr(s).to_bytes(), b"");
            FreeTopologyCtypes(s);
        }
    }

    #[test]
    fn test_free_null() {
        unsafe { FreeTopologyCtypes(ptr::null_mut()) };
    }

    #[test]
    fn test_check_chip_id() {
        assert!(check_ChipID(10, 15));
        assert!(!check_ChipID(15, 15));
        assert!(!check_ChipID(-3, 15));
    }
}

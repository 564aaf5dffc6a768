//! Safe calls through the exported C ABI of this library
use super::{
    DifTopologyMap,
    Error,
    TopologyMap,
};
use crate::ffi::{
    FreeTopologyCtypes,
    GetDifTopologyCtypes,
    GetTopologyCtypes,
};
use serde::de::DeserializeOwned;
use std::{
    ffi::{
        CStr,
        CString,
    },
    os::raw::c_char,
    path::Path,
};

/// Call `getter` on `path`, copy and release the returned string, and parse it
fn fetch<T, F>(path: &Path, getter: F) -> Result<T, Error>
where
    T: DeserializeOwned,
    F: Fn(*const c_char) -> *mut c_char,
{
    let path = CString::new(path.to_str().ok_or(Error::Path)?).map_err(|_| Error::Path)?;
    let raw = getter(path.as_ptr());
    if raw.is_null() {
        return Err(Error::EmptyTopology);
    }
    // SAFETY: the getters return an owned NUL terminated string, freed right after copying
    let json = unsafe {
        let json = CStr::from_ptr(raw).to_str().map(str::to_owned);
        FreeTopologyCtypes(raw);
        json
    }?;
    if json.is_empty() {
        return Err(Error::EmptyTopology);
    }
    Ok(serde_json::from_str(&json)?)
}

/// The topology of the acquisition configuration at `path`
/// # Errors
/// Returns [`Error::EmptyTopology`] if the library could not read the configuration
pub fn fetch_topology<T>(path: T) -> Result<TopologyMap, Error>
where
    T: AsRef<Path>,
{
    // SAFETY: `fetch` passes a valid NUL terminated string
    fetch(path.as_ref(), |p| unsafe { GetTopologyCtypes(p) })
}

/// The topology keyed by absolute DIF of the acquisition configuration at `path`
/// # Errors
/// Returns [`Error::EmptyTopology`] if the library could not read the configuration
pub fn fetch_dif_topology<T>(path: T) -> Result<DifTopologyMap, Error>
where
    T: AsRef<Path>,
{
    // SAFETY: `fetch` passes a valid NUL terminated string
    fetch(path.as_ref(), |p| unsafe { GetDifTopologyCtypes(p) })
}

//! The inline error taxonomy returned to window manager clients.
//!
//! Success is the `Ok` side of a `Result`; [`describe`] produces the legacy
//! "Success" string for it so replies keep their historical wording.

use thiserror::Error;

use crate::driver::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum WMError {
    #[error("Request failed")]
    Fail,
    #[error("Request is rejected, due to the policy rejection of the request.")]
    ReqRejected,
    #[error("Request is dropped, because the high priority request is done")]
    ReqDropped,
    #[error("Not registered")]
    NotRegistered,
    #[error("Request is dropped, due to time out expiring")]
    TimeoutExpired,
    #[error("Layout change fails, due to some reasons")]
    LayoutChangeFail,
    #[error("No element")]
    NoEntry,
    #[error("No layout change(deactivate only)")]
    NoLayoutChange,
}

pub type WmResult<T> = Result<T, WMError>;

impl WMError {
    /// Stable machine-readable code, e.g. `"REQ_REJECTED"`.
    pub fn code(&self) -> &'static str {
        match self {
            WMError::Fail => "FAIL",
            WMError::ReqRejected => "REQ_REJECTED",
            WMError::ReqDropped => "REQ_DROPPED",
            WMError::NotRegistered => "NOT_REGISTERED",
            WMError::TimeoutExpired => "TIMEOUT_EXPIRED",
            WMError::LayoutChangeFail => "LAYOUT_CHANGE_FAIL",
            WMError::NoEntry => "NO_ENTRY",
            WMError::NoLayoutChange => "NO_LAYOUT_CHANGE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WMError::Fail => "Request failed",
            WMError::ReqRejected => "Request is rejected, due to the policy rejection of the request.",
            WMError::ReqDropped => "Request is dropped, because the high priority request is done",
            WMError::NotRegistered => "Not registered",
            WMError::TimeoutExpired => "Request is dropped, due to time out expiring",
            WMError::LayoutChangeFail => "Layout change fails, due to some reasons",
            WMError::NoEntry => "No element",
            WMError::NoLayoutChange => "No layout change(deactivate only)",
        }
    }
}

/// Human readable status of any window manager result.
pub fn describe<T>(result: &WmResult<T>) -> &'static str {
    match result {
        Ok(_) => "Success",
        Err(e) => e.description(),
    }
}

impl From<DriverError> for WMError {
    fn from(_: DriverError) -> Self {
        WMError::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WMError::Fail, "FAIL")]
    #[case(WMError::ReqRejected, "REQ_REJECTED")]
    #[case(WMError::ReqDropped, "REQ_DROPPED")]
    #[case(WMError::NotRegistered, "NOT_REGISTERED")]
    #[case(WMError::TimeoutExpired, "TIMEOUT_EXPIRED")]
    #[case(WMError::LayoutChangeFail, "LAYOUT_CHANGE_FAIL")]
    #[case(WMError::NoEntry, "NO_ENTRY")]
    #[case(WMError::NoLayoutChange, "NO_LAYOUT_CHANGE")]
    fn display_matches_description(#[case] err: WMError, #[case] code: &str) {
        assert_eq!(err.code(), code);
        assert_eq!(err.to_string(), err.description());
    }

    #[test]
    fn describe_success_and_failure() {
        let ok: WmResult<u32> = Ok(7);
        let rejected: WmResult<u32> = Err(WMError::ReqRejected);
        assert_eq!(describe(&ok), "Success");
        assert_eq!(describe(&rejected), "Request is rejected, due to the policy rejection of the request.");
    }

    #[test]
    fn driver_failures_become_fail() {
        let err: WMError = DriverError::UnknownSurface(12).into();
        assert_eq!(err, WMError::Fail);
    }
}

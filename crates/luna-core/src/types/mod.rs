//! Records, accounts, request context and engine decisions.

pub mod decision;
pub mod extraction;
pub mod license;
pub mod request;
pub mod user;

pub use decision::{Decision, DecisionAction, SessionGrant};
pub use extraction::{ExtractionSource, LicenseExtraction};
pub use license::{
    format_timestamp, parse_timestamp, ActivationDetails, LicenseRecord, LicenseStatus,
    TIMESTAMP_FORMAT,
};
pub use request::RequestContext;
pub use user::{NewUser, UserAccount, UserId};

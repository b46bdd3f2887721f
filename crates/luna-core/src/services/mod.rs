//! Operations behind the REST routes and the admin screens.

pub mod admin;
pub mod rest;

pub use admin::{AdminService, CreateLicenseRequest, CreatedLicense, DeletedLicense};
pub use rest::{
    ActivateRequest, ActivateResponse, ClientEntry, ClientsResponse, HeartbeatRequest,
    HeartbeatResponse, LicenseSummary, RestService, SessionInfo,
};

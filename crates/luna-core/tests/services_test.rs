//! REST and admin operations over the in-memory stores.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use luna_core::constants::{ADMIN_ROLE, CLIENT_ROLE, META_CLIENT_SITE, META_LEGACY_LICENSE_KEY, META_LICENSE_KEY};
use luna_core::errors::{AdminError, BindingError, LunaErrorCode, RestError, StorageError};
use luna_core::licensing::LicenseRegistry;
use luna_core::runtime::RuntimeOptions;
use luna_core::services::{
    ActivateRequest, CreateLicenseRequest, HeartbeatRequest, SessionInfo,
};
use luna_core::traits::storage::test_helpers::{FixedClock, InMemoryOptionStore, InMemoryUserDirectory};
use luna_core::traits::{IOptionStore, IUserDirectory};
use luna_core::types::NewUser;
use luna_core::{LicenseStatus, LunaConfig, LunaRuntime, UserAccount, UserId};

const ACTIVE_KEY: &str = "VL-AWJJ-8J6S-GD6R";

struct Harness {
    runtime: LunaRuntime,
    options: Arc<InMemoryOptionStore>,
    directory: Arc<InMemoryUserDirectory>,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let options = Arc::new(InMemoryOptionStore::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap()));
    let mut opts = RuntimeOptions::new(options.clone(), directory.clone());
    opts.clock = clock.clone();
    let runtime = LunaRuntime::new(LunaConfig::default(), opts).unwrap();
    runtime.seed().unwrap();
    Harness {
        runtime,
        options,
        directory,
        clock,
    }
}

impl Harness {
    fn registry(&self) -> &LicenseRegistry {
        &self.runtime.registry
    }

    fn snapshot(&self) -> serde_json::Value {
        self.options
            .get_option(self.registry().option_name())
            .unwrap()
            .unwrap()
    }

    fn user_with_roles(&self, login: &str, roles: &[&str]) -> UserId {
        self.directory
            .insert(UserAccount {
                id: UserId(0),
                login: login.into(),
                email: format!("{login}@example.com"),
                display_name: login.into(),
                first_name: login.into(),
                roles: roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
                meta: BTreeMap::new(),
                activation_key: None,
            })
            .unwrap()
    }
}

/// Directory whose account creation always fails.
struct RefusingDirectory(InMemoryUserDirectory);

impl IUserDirectory for RefusingDirectory {
    fn get(&self, id: UserId) -> Result<Option<UserAccount>, StorageError> {
        self.0.get(id)
    }
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError> {
        self.0.find_by_email(email)
    }
    fn login_exists(&self, login: &str) -> Result<bool, StorageError> {
        self.0.login_exists(login)
    }
    fn create(&self, _user: &NewUser) -> Result<UserId, StorageError> {
        Err(StorageError::SqliteError {
            message: "disk I/O error".into(),
        })
    }
    fn update_profile(&self, id: UserId, display_name: &str, first_name: &str) -> Result<(), StorageError> {
        self.0.update_profile(id, display_name, first_name)
    }
    fn add_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        self.0.add_role(id, role)
    }
    fn set_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        self.0.set_role(id, role)
    }
    fn set_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.set_meta(id, key, value)
    }
    fn delete_meta(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        self.0.delete_meta(id, key)
    }
    fn bind_license(&self, id: UserId, license: &str) -> Result<(), StorageError> {
        self.0.bind_license(id, license)
    }
    fn unbind_license(&self, id: UserId) -> Result<(), StorageError> {
        self.0.unbind_license(id)
    }
    fn user_for_license(&self, license: &str) -> Result<Option<UserId>, StorageError> {
        self.0.user_for_license(license)
    }
    fn set_activation_key(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        self.0.set_activation_key(id, key)
    }
    fn delete(&self, id: UserId) -> Result<bool, StorageError> {
        self.0.delete(id)
    }
}

fn create_request(client: &str, email: &str) -> CreateLicenseRequest {
    CreateLicenseRequest {
        client_name: client.into(),
        site: "https://example.com".into(),
        email: email.into(),
        password: "s3cret-pass".into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVATE / HEARTBEAT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn heartbeat_for_unknown_license_changes_nothing() {
    let h = harness();
    let before = h.snapshot();
    let err = h
        .runtime
        .rest
        .heartbeat(&HeartbeatRequest {
            license: "VL-NOPE-NOPE-NOPE".into(),
        })
        .unwrap_err();
    assert!(matches!(err, RestError::LicenseNotFound));
    assert_eq!(err.error_code(), "license_not_found");
    assert_eq!(err.status_code(), 404);
    assert_eq!(h.snapshot(), before);
}

#[test]
fn heartbeat_requires_a_license() {
    let h = harness();
    let err = h.runtime.rest.heartbeat(&HeartbeatRequest::default()).unwrap_err();
    assert!(matches!(err, RestError::MissingLicense));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn heartbeat_stamps_last_seen_and_reactivates() {
    let h = harness();
    h.registry().set_status(ACTIVE_KEY, LicenseStatus::Inactive).unwrap();
    h.clock.advance(chrono::Duration::hours(2));
    let response = h
        .runtime
        .rest
        .heartbeat(&HeartbeatRequest {
            license: ACTIVE_KEY.into(),
        })
        .unwrap();
    assert!(response.ok);
    let record = h.registry().lookup(ACTIVE_KEY).unwrap().unwrap();
    assert!(record.is_active());
    assert_eq!(
        record.last_seen_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 4, 14, 0, 0).unwrap())
    );
}

#[test]
fn activation_records_site_details() {
    let h = harness();
    let response = h
        .runtime
        .rest
        .activate(&ActivateRequest {
            license: ACTIVE_KEY.into(),
            site_url: "client.example.org".into(),
            site_name: "Client <b>Site</b>".into(),
            wp_version: "6.5".into(),
            plugin_version: "1.2.0".into(),
        })
        .unwrap();
    assert!(response.ok);
    assert_eq!(response.license, ACTIVE_KEY);

    let record = h.registry().lookup(ACTIVE_KEY).unwrap().unwrap();
    assert_eq!(record.site, "http://client.example.org");
    assert_eq!(record.site_name.as_deref(), Some("Client Site"));
    assert_eq!(record.wp_version.as_deref(), Some("6.5"));
    assert_eq!(record.plugin_version.as_deref(), Some("1.2.0"));
    assert!(record.last_seen_at.is_some());
}

#[test]
fn activation_needs_license_and_site() {
    let h = harness();
    let missing_site = ActivateRequest {
        license: ACTIVE_KEY.into(),
        ..Default::default()
    };
    assert!(matches!(
        h.runtime.rest.activate(&missing_site).unwrap_err(),
        RestError::MissingParams
    ));
    let unknown = ActivateRequest {
        license: "lic_123".into(),
        site_url: "https://x.example".into(),
        ..Default::default()
    };
    assert!(matches!(
        h.runtime.rest.activate(&unknown).unwrap_err(),
        RestError::LicenseNotFound
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION INFO / CLIENT ROSTER
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn anonymous_session_info_offers_login() {
    let h = harness();
    let info = h.runtime.rest.session_info(None).unwrap();
    assert!(!info.is_authenticated());
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["authenticated"], false);
    assert_eq!(
        json["login_url"],
        "/wp-login.php?redirect_to=https%3A%2F%2Fsupercluster.visiblelight.ai%2F"
    );
}

#[test]
fn client_session_info_carries_license_summary() {
    let h = harness();
    let created = h
        .runtime
        .admin
        .sync_client_user(ACTIVE_KEY)
        .unwrap();
    let info = h.runtime.rest.session_info(Some(created.user.id)).unwrap();
    let SessionInfo::Authenticated(session) = info else {
        panic!("expected an authenticated session");
    };
    assert!(session.is_vl_client);
    assert!(!session.permissions.can_manage_clients);
    assert_eq!(session.license_key, ACTIVE_KEY);
    assert_eq!(session.wp_activation_key, ACTIVE_KEY);
    assert_eq!(
        session.dashboard_url,
        format!("https://supercluster.visiblelight.ai/?license={ACTIVE_KEY}")
    );
    let summary = session.license.as_ref().unwrap();
    assert_eq!(summary.client_name, "Visible Light");
    assert_eq!(summary.status, "active");
    assert_eq!(summary.last_seen, None);
}

#[test]
fn unknown_viewer_is_anonymous() {
    let h = harness();
    assert!(!h.runtime.rest.session_info(Some(UserId(404))).unwrap().is_authenticated());
}

#[test]
fn roster_requires_admin() {
    let h = harness();
    let client = h.user_with_roles("someclient", &[CLIENT_ROLE]);
    for viewer in [None, Some(client)] {
        let err = h.runtime.rest.clients(viewer).unwrap_err();
        assert!(matches!(err, RestError::Forbidden));
        assert_eq!(err.status_code(), 403);
    }
}

#[test]
fn roster_lists_every_license() {
    let h = harness();
    let admin = h.user_with_roles("boss", &[ADMIN_ROLE]);
    let roster = h.runtime.rest.clients(Some(admin)).unwrap();
    assert_eq!(roster.clients.len(), 4);
    let entry = roster
        .clients
        .iter()
        .find(|c| c.license_key == ACTIVE_KEY)
        .unwrap();
    assert_eq!(entry.contact_email, "admin@visiblelight.ai");
    assert!(entry.dashboard_url.ends_with(ACTIVE_KEY));
}

// ═══════════════════════════════════════════════════════════════════════════
// ADMIN CREATE / SYNC / DELETE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn create_picks_next_free_username() {
    let h = harness();
    h.directory
        .create(&NewUser {
            login: "client".into(),
            email: "someone@else.com".into(),
            password: "pw".into(),
            display_name: "Someone".into(),
            first_name: "Someone".into(),
        })
        .unwrap();

    let created = h
        .runtime
        .admin
        .create_license(&create_request("Client", "client@example.com"))
        .unwrap();
    assert!(created.created);
    assert_eq!(created.user.login, "client1");
    assert!(created.user.has_role(CLIENT_ROLE));
    let key = created.license.key.as_str();
    assert_eq!(created.user.meta(META_LICENSE_KEY), Some(key));
    assert_eq!(created.user.meta(META_LEGACY_LICENSE_KEY), Some(key));
    assert_eq!(created.user.meta(META_CLIENT_SITE), Some("https://example.com"));
    assert_eq!(created.license.status, LicenseStatus::Inactive);
    assert!(key.starts_with("VL-"));
}

#[test]
fn create_links_existing_account_by_email() {
    let h = harness();
    let existing = h.user_with_roles("subscriber", &["subscriber"]);
    let created = h
        .runtime
        .admin
        .create_license(&create_request("Acme", "subscriber@example.com"))
        .unwrap();
    assert!(!created.created);
    assert_eq!(created.user.id, existing);
    assert!(created.user.has_role("subscriber"));
    assert!(created.user.has_role(CLIENT_ROLE));
    assert_eq!(created.user.display_name, "Acme");
    assert_eq!(h.directory.len(), 1);
}

#[test]
fn create_validates_every_field() {
    let h = harness();
    let before = h.snapshot();
    let mut request = create_request("Acme", "acme@example.com");
    request.password.clear();
    let err = h.runtime.admin.create_license(&request).unwrap_err();
    assert!(matches!(err, AdminError::MissingField { field: "password" }));
    assert_eq!(err.error_code(), "missing_field");

    let err = h
        .runtime
        .admin
        .create_license(&create_request("Acme", "not-an-email"))
        .unwrap_err();
    assert!(matches!(err, AdminError::InvalidEmail));
    assert_eq!(h.snapshot(), before);
    assert!(h.directory.is_empty());
}

#[test]
fn failed_provisioning_rolls_back_license() {
    let options = Arc::new(InMemoryOptionStore::new());
    let directory = Arc::new(RefusingDirectory(InMemoryUserDirectory::new()));
    let runtime = LunaRuntime::new(
        LunaConfig::default(),
        RuntimeOptions::new(options, directory),
    )
    .unwrap();

    let err = runtime
        .admin
        .create_license(&create_request("Acme", "acme@example.com"))
        .unwrap_err();
    assert!(matches!(err, AdminError::Binding(BindingError::CreateFailed { .. })));
    assert_eq!(err.error_code(), "create_failed");
    assert!(runtime.registry.all().unwrap().is_empty());
}

#[test]
fn sync_rebuilds_account_from_record() {
    let h = harness();
    let first = h.runtime.admin.sync_client_user(ACTIVE_KEY).unwrap();
    assert!(first.created);
    assert_eq!(first.user.login, "visiblelight");
    let again = h.runtime.admin.sync_client_user(ACTIVE_KEY).unwrap();
    assert!(!again.created);
    assert_eq!(again.user.id, first.user.id);
    assert_eq!(h.directory.len(), 1);
}

#[test]
fn sync_reports_missing_inputs() {
    let h = harness();
    assert!(matches!(
        h.runtime.admin.sync_client_user("  ").unwrap_err(),
        AdminError::MissingField { field: "license_key" }
    ));
    assert!(matches!(
        h.runtime.admin.sync_client_user("VL-NOPE-NOPE-NOPE").unwrap_err(),
        AdminError::LicenseNotFound
    ));
    let record = h.registry().create("No Mail Co", "https://nomail.example", "").unwrap();
    let err = h.runtime.admin.sync_client_user(&record.key).unwrap_err();
    assert!(matches!(err, AdminError::MissingContactEmail { ref client } if client == "No Mail Co"));
}

#[test]
fn delete_cascades_to_bound_client() {
    let h = harness();
    let synced = h.runtime.admin.sync_client_user(ACTIVE_KEY).unwrap();
    let deleted = h.runtime.admin.delete_license(ACTIVE_KEY).unwrap();
    assert_eq!(deleted.license.key, ACTIVE_KEY);
    assert_eq!(deleted.removed_user.map(|u| u.id), Some(synced.user.id));
    assert!(h.registry().lookup(ACTIVE_KEY).unwrap().is_none());
    assert!(h.directory.get(synced.user.id).unwrap().is_none());
    assert_eq!(h.directory.user_for_license(ACTIVE_KEY).unwrap(), None);
}

#[test]
fn delete_spares_non_client_holder() {
    let h = harness();
    let editor = h.user_with_roles("editor", &["editor"]);
    h.directory.bind_license(editor, ACTIVE_KEY).unwrap();
    let deleted = h.runtime.admin.delete_license(ACTIVE_KEY).unwrap();
    assert!(deleted.removed_user.is_none());
    assert!(h.directory.get(editor).unwrap().is_some());
}

#[test]
fn delete_unknown_license_fails() {
    let h = harness();
    assert!(matches!(
        h.runtime.admin.delete_license("VL-NOPE-NOPE-NOPE").unwrap_err(),
        AdminError::LicenseNotFound
    ));
}

#[test]
fn status_toggle_round_trips() {
    let h = harness();
    let record = h
        .runtime
        .admin
        .set_license_status(ACTIVE_KEY, LicenseStatus::Inactive)
        .unwrap();
    assert_eq!(record.status, LicenseStatus::Inactive);
    assert!(matches!(
        h.runtime
            .admin
            .set_license_status("VL-NOPE-NOPE-NOPE", LicenseStatus::Active)
            .unwrap_err(),
        AdminError::LicenseNotFound
    ));
}

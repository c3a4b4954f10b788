//! Common test utilities for wordbank integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};

use wordbank_core::{FixedClock, RegisteredWord, UserId, WordId};
use wordbank_service::auth::USER_ID_HEADER;
use wordbank_service::{create_router, AppState, ServiceConfig};
use wordbank_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for seeding and inspection.
    pub store: Arc<MemoryStore>,
    /// The clock the service reads.
    pub clock: Arc<FixedClock>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh store and no rate limiting.
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        // 03:00 UTC is midday at the default +09:00 boundary.
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap(),
        ));

        let state = AppState::with_clock(store.clone(), config, clock.clone());
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            store,
            clock,
            test_user_id,
        }
    }

    /// The default test configuration.
    pub fn config() -> ServiceConfig {
        ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            rate_limit_per_minute: 0,
            ..ServiceConfig::default()
        }
    }

    /// Add words to the catalog.
    pub fn seed_words(&self, names: &[&str]) {
        for name in names {
            self.store.insert_word(name).expect("Failed to seed word");
        }
    }

    /// Give the test user a registration for `name`, adding the word if needed.
    pub fn seed_registration(&self, name: &str, is_active: bool) -> WordId {
        let word_id = self.store.insert_word(name).expect("Failed to seed word");
        let now = Utc::now();
        self.store
            .put_registration(
                RegisteredWord::active(self.test_user_id, word_id, now).with_active(is_active, now),
            )
            .expect("Failed to seed registration");
        word_id
    }

    /// The identity header for the test user.
    pub fn user_header(&self) -> (HeaderName, HeaderValue) {
        Self::header_for(self.test_user_id)
    }

    /// The identity header for another user.
    pub fn header_for(user_id: UserId) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_str(&user_id.to_string()).expect("Invalid header value"),
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

//! LunaRuntime — every component constructed once and wired explicitly.
//!
//! No global instance: the host builds a runtime at startup and hands
//! references to its request handlers.

use std::sync::Arc;

use tracing::info;

use crate::binding::BindingResolver;
use crate::config::LunaConfig;
use crate::errors::LunaResult;
use crate::events::EventDispatcher;
use crate::extraction::LicenseExtractor;
use crate::guards::RouteGuards;
use crate::licensing::LicenseRegistry;
use crate::reconcile::ReconciliationEngine;
use crate::services::{AdminService, RestService};
use crate::traits::storage::test_helpers::{InMemoryOptionStore, InMemoryUserDirectory};
use crate::traits::{Clock, IOptionStore, IUserDirectory, SystemClock};

/// Collaborators the host supplies.
pub struct RuntimeOptions {
    pub options: Arc<dyn IOptionStore>,
    pub directory: Arc<dyn IUserDirectory>,
    pub clock: Arc<dyn Clock>,
    /// Handlers for the session signals, registered before startup.
    pub dispatcher: EventDispatcher,
}

impl RuntimeOptions {
    pub fn new(options: Arc<dyn IOptionStore>, directory: Arc<dyn IUserDirectory>) -> Self {
        Self {
            options,
            directory,
            clock: Arc::new(SystemClock),
            dispatcher: EventDispatcher::new(),
        }
    }
}

pub struct LunaRuntime {
    pub config: LunaConfig,
    pub clock: Arc<dyn Clock>,
    pub directory: Arc<dyn IUserDirectory>,
    pub registry: Arc<LicenseRegistry>,
    pub binding: Arc<BindingResolver>,
    pub extractor: Arc<LicenseExtractor>,
    pub engine: Arc<ReconciliationEngine>,
    pub dispatcher: Arc<EventDispatcher>,
    pub guards: Arc<RouteGuards>,
    pub rest: Arc<RestService>,
    pub admin: Arc<AdminService>,
}

impl LunaRuntime {
    pub fn new(config: LunaConfig, opts: RuntimeOptions) -> LunaResult<Self> {
        config.validate()?;

        let registry = Arc::new(LicenseRegistry::new(
            opts.options,
            config.registry.option_name.clone(),
            opts.clock.clone(),
        ));
        let binding = Arc::new(BindingResolver::new(opts.directory.clone()));
        let extractor = Arc::new(LicenseExtractor::new(&config.routing)?);
        let engine = Arc::new(ReconciliationEngine::new(
            registry.clone(),
            binding.clone(),
            extractor.clone(),
            config.routing.clone(),
        ));
        let dispatcher = Arc::new(opts.dispatcher);
        let guards = Arc::new(RouteGuards::new(engine.clone(), dispatcher.clone()));
        let rest = Arc::new(RestService::new(
            registry.clone(),
            opts.directory.clone(),
            config.routing.clone(),
        ));
        let admin = Arc::new(AdminService::new(registry.clone(), binding.clone()));

        Ok(Self {
            config,
            clock: opts.clock,
            directory: opts.directory,
            registry,
            binding,
            extractor,
            engine,
            dispatcher,
            guards,
            rest,
            admin,
        })
    }

    /// Runtime over the in-memory stores. Used by tests and demos.
    pub fn in_memory(config: LunaConfig) -> LunaResult<Self> {
        Self::new(
            config,
            RuntimeOptions::new(
                Arc::new(InMemoryOptionStore::new()),
                Arc::new(InMemoryUserDirectory::new()),
            ),
        )
    }

    /// Install any configured seed license that is missing.
    pub fn seed(&self) -> LunaResult<usize> {
        let added = self.registry.ensure_seeded(&self.config.registry.seed_licenses)?;
        if added > 0 {
            info!(added, "registry seeded");
        }
        Ok(added)
    }
}

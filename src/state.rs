//! Shared application state for all routes.

use crate::config::Settings;
use crate::engine::SensorThingsEngine;
use crate::links::LinkBuilder;
use crate::store::Backend;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, settings: Settings) -> Self {
        AppState {
            backend,
            settings: Arc::new(settings),
        }
    }

    /// Engine for one request; links are built against the request's host.
    pub fn engine(&self, host: &str) -> SensorThingsEngine<'_> {
        let links = LinkBuilder::new(&self.settings, host);
        SensorThingsEngine::new(self.backend.as_ref(), &self.settings, links)
    }
}

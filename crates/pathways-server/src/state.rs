use std::sync::Arc;

use pathways_core::{
    EnrollmentAggregator, EnrollmentStatusLookup, JoinTable, PathwayHooks, PathwayStore,
    ReconcilePolicy,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub hooks: Arc<PathwayHooks>,
    pub aggregator: Arc<EnrollmentAggregator>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PathwayStore>,
        lookup: Arc<dyn EnrollmentStatusLookup>,
        policy: ReconcilePolicy,
        topics_join: JoinTable,
    ) -> Self {
        let hooks = PathwayHooks::new(Arc::clone(&store), policy).with_topics_join(topics_join);
        Self {
            hooks: Arc::new(hooks),
            aggregator: Arc::new(EnrollmentAggregator::new(store, lookup)),
        }
    }

    pub fn store(&self) -> &Arc<dyn PathwayStore> {
        self.hooks.store()
    }
}

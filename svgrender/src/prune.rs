//! Retention pruning of rendered images.
//!
//! Runs on the request path after each successful render. Pruning is best effort: store faults
//! are logged and reported as "nothing (more) deleted", never as a request failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, instrument, warn};

use crate::storage::{OBJECT_PREFIX, ObjectStore};

#[derive(Clone)]
pub struct Pruner {
    store: Arc<dyn ObjectStore>,
    max_age: TimeDelta,
}

impl Pruner {
    pub fn new(store: Arc<dyn ObjectStore>, max_age: Duration) -> Self {
        Self {
            store,
            max_age: TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Delete every stored render created strictly before `now - max_age`.
    ///
    /// Returns how many objects this pass deleted. Objects without a creation time are left
    /// alone. A listing failure deletes nothing; a deletion failure stops the pass.
    #[instrument(skip(self))]
    pub async fn prune(&self, now: DateTime<Utc>) -> u64 {
        let cutoff = now.checked_sub_signed(self.max_age).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let objects = match self.store.list(OBJECT_PREFIX).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Failed to prune old files: {:#}", e);
                return 0;
            }
        };

        let mut deleted = 0;
        for object in objects {
            let Some(created_at) = object.created_at else {
                continue;
            };
            if created_at >= cutoff {
                continue;
            }

            info!("Pruning stale object {}", object.key);
            if let Err(e) = self.store.delete(&object.key).await {
                warn!("Failed to prune old files: {:#}", e);
                break;
            }
            deleted += 1;
        }

        if deleted > 0 {
            metrics::counter!("svgrender_pruned_objects_total").increment(deleted);
        }
        deleted
    }
}

//! Pipeline entry point: resolve → walk → project.

use std::time::Instant;

use tracing::{error, info};
use xcresults_error::Result;
use xcresults_types::Conversion;

use crate::projector::project;
use crate::resolver::{Resolver, ResolverStats};
use crate::source::DocumentSource;
use crate::walker::GraphWalker;

/// Convert the bundle behind `source` into report entities.
///
/// Pass `&mut source` to keep the source for later use (payload export).
pub fn convert<S: DocumentSource>(source: S) -> Result<Conversion> {
    convert_with_stats(source).map(|(conversion, _)| conversion)
}

/// [`convert`], also returning the resolver's counters.
pub fn convert_with_stats<S: DocumentSource>(source: S) -> Result<(Conversion, ResolverStats)> {
    let started = Instant::now();
    let mut resolver = Resolver::new(source);
    let outcome = GraphWalker::new(&mut resolver)
        .walk()
        .and_then(|tree| project(&tree));
    let stats = resolver.stats();
    match outcome {
        Ok(conversion) => {
            info!(
                results = conversion.results.len(),
                containers = conversion.containers.len(),
                warnings = conversion.warnings.len(),
                fetches = stats.fetches,
                elapsed = ?started.elapsed(),
                "conversion finished"
            );
            Ok((conversion, stats))
        }
        Err(err) => {
            error!(
                kind = %err.kind(),
                path = err.path().unwrap_or("-"),
                fetches = stats.fetches,
                "conversion aborted: {err}"
            );
            Err(err)
        }
    }
}

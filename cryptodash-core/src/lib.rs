//! Cryptodash Core — metric series, source adapters, normalization and alignment.
//!
//! This crate holds everything that has an invariant to protect:
//! - The closed set of dashboard metrics
//! - Raw and normalized series types
//! - The series normalizer (timezone stripping, numeric coercion)
//! - The aligner/repairer (outer join, windowing, forward-fill)
//! - Source adapters for the four upstream providers, behind a transport trait

pub mod data;

pub use data::{
    align, AlignError, AlignedRow, AlignedTable, CannedFetch, HttpClient, HttpFetch, Metric, MetricRecord,
    NamedSeries, Normalize, RawSeries, RawTimestamp, RawValue, SeriesSource, SourceError,
    SourceOutcome,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across the rayon fan-out are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<NamedSeries>();
        require_sync::<NamedSeries>();
        require_send::<SourceOutcome>();
        require_sync::<SourceOutcome>();
        require_send::<AlignedTable>();
        require_sync::<AlignedTable>();
        require_send::<HttpClient>();
        require_sync::<HttpClient>();
    }

    /// Compile-time check: boxed sources can be driven through a borrowed
    /// transport trait object.
    #[allow(dead_code)]
    fn fetch_through_trait_objects(
        sources: &[Box<dyn SeriesSource>],
        client: &dyn HttpFetch,
    ) -> Vec<SourceOutcome> {
        sources.iter().map(|s| s.fetch(client)).collect()
    }
}

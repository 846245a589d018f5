//! Series acquisition, normalization and alignment

pub mod align;
pub mod http;
pub mod metric;
pub mod normalize;
pub mod provider;
pub mod series;
pub mod sources;

pub use align::{align, outer_join, AlignError, AlignedRow, AlignedTable, MetricRecord};
pub use http::{CannedFetch, HttpClient, HttpFetch};
pub use metric::Metric;
pub use normalize::{coerce_numeric, Normalize};
pub use provider::{ErrorKind, SeriesSource, SourceError, SourceOutcome};
pub use series::{NamedSeries, RawSeries, RawTimestamp, RawValue};
pub use sources::{
    EtfMode, EtfSource, OpenInterestSource, RealizedCapSource, StablecoinSource,
};

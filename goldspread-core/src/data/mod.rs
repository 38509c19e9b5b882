//! Market data acquisition: raw frames, sources, batched fetching and alignment.

pub mod align;
pub mod fetcher;
pub mod frame;
pub mod provider;
pub mod yahoo;

pub use align::{align_forward_filled, AlignedRows};
pub use fetcher::MarketDataFetcher;
pub use frame::{extract_column, ColumnSet, PriceSeries, RawCell, RawFrame};
pub use provider::{DataError, DataSource, MarketDataSource, OfflineSource};
pub use yahoo::{YahooSource, CLOSE_FIELD};

//! Provider adapters for fire incidents and path weather.

pub mod arcgis;
pub mod in_memory;
pub mod ndbc;
pub mod nws;

pub use arcgis::{ArcGisConfig, ArcGisRestAdapter};
pub use in_memory::InMemoryFireAdapter;
pub use ndbc::{
    CatalogStation, FixedStationResolver, NdbcAdapter, StationCatalogResolver, StationResolver,
};
pub use nws::NwsAdapter;

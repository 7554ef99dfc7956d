//! Query services: nearby fires, incident distance and path weather.

mod fire;
mod weather;

pub use fire::{
    closest, DistanceBasis, DistanceResponse, FireFinderService, NearbyFire, NearbyFiresRequest,
    NearbyFiresResponse, Severity,
};
pub use weather::WeatherService;

use crate::data_source::SegmentRequest;
use crate::routing::{RouteResult, WeatherRouter};
use crate::SegmentResponse;

/// Path weather over a [`WeatherRouter`].
pub struct WeatherService {
    router: WeatherRouter,
}

impl WeatherService {
    pub fn new(router: WeatherRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &WeatherRouter {
        &self.router
    }

    /// First available provider answers. Segment geometry, rollups and the
    /// echoed settings are recomputed here so they do not depend on which
    /// provider answered.
    pub async fn segment(&self, req: SegmentRequest) -> RouteResult<SegmentResponse> {
        let routed = self.router.segment(req).await?;
        Ok(routed.map(|response| req.respond(response.series)))
    }
}

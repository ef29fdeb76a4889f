// Output stage: SVG serialization of the laid-out document and on-demand
// raster export at two quality tiers.

pub mod composer;
pub mod raster;

pub use composer::{compose_svg, SVG_CONTENT_TYPE};
pub use raster::{default_raster_config, export_raster, RasterConfig, RasterError, RasterTier};

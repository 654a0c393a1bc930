//! Common types shared across the EO acquisition workspace.

pub mod boundary;
pub mod error;
pub mod geotransform;
pub mod sensor;
pub mod time;

pub use boundary::{Boundary, BoundingBox};
pub use error::{CommonError, CommonResult};
pub use geotransform::GeoTransform;
pub use sensor::{Platform, Sensor};
pub use time::{day_of_year, parse_timestamp, TimeRange};

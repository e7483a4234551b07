pub mod fitting;
pub mod flatten;
pub mod keypoints;

pub use fitting::FittingStage;
pub use flatten::FlattenStage;
pub use keypoints::KeypointStage;

use crate::error::Error;
use crate::listing::Listing;
use std::path::Path;

/// Per-frame keypoint file written by the pose estimator.
pub const KEYPOINT_SENTINEL: &str = "*_keypoints.json";

fn require(listing: &dyn Listing, what: &str, path: &Path) -> Result<(), Error> {
    if listing.exists(path) {
        Ok(())
    } else {
        Err(Error::missing(what, path))
    }
}

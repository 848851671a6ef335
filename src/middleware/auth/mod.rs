pub mod cluster;
pub mod exclusion;
pub mod gate;

pub use cluster::ClusterSecret;
pub use exclusion::{ExclusionRule, ExclusionSet};
pub use gate::{Gate, apply};

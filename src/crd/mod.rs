//! Resource types watched on the management cluster and created on hosted clusters

mod group;
mod hosted_cluster;

pub use group::*;
pub use hosted_cluster::*;

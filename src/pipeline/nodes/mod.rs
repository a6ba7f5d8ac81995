//! Built-in pipeline node implementations.

pub mod filter;
pub mod scale;
pub mod statistics;

pub use filter::FilterNode;
pub use scale::{ScaleNode, ScaleParams};
pub use statistics::StatisticsNode;

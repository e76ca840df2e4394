//! Pure computations over logged meals and workouts. Nothing in here touches storage.

pub mod bucketing;
pub mod macros;
pub mod scoring;
pub mod streak;
pub mod timing;

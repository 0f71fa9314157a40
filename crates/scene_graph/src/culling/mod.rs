//! Visibility determination against a camera frustum
//!
//! Splits into plane extraction / box classification ([`frustum`]) and the
//! stateful hierarchical scene walk ([`culler`]).

pub mod culler;
pub mod frustum;

pub use culler::CullingState;
pub use frustum::{Frustum, Plane, PlaneMask, Visibility};

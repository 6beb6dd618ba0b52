//! Fuzz Harness
//!
//! Proptest strategies shared by the integration tests of the planning
//! crates: coastal positions, small but complete scenarios and joint
//! share distributions over a scenario's stations.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fuzz_harness::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn shares_sum_to_one(fixture in planning_fixture(ScenarioShape::default())) {
//!         prop_assert!((fixture.joint.total() - 1.0).abs() < 1e-9);
//!     }
//! }
//! ```

pub mod generators;

pub use generators::*;
pub use proptest;

/// Re-exports for test modules
pub mod prelude {
    pub use crate::generators::*;
    pub use proptest::prelude::*;
}

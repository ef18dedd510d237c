//! Checks of the installed set against a target release
//!
//! Every check consumes immutable inputs and returns its findings as sorted
//! annotations; none of them mutate the installed records.

mod availability;
mod build_failures;
mod defaults;

pub use availability::{check_aliases, check_availability, check_renames, KERNEL};
pub use build_failures::{
    check_build_failures, parse_failure_listing, BuildFailure, BuildFailureReport,
    FailureSeverity,
};
pub use defaults::reconcile_defaults;

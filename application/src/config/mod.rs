//! Application-level dispatch policy

mod dispatch_policy;

pub use dispatch_policy::DispatchPolicy;

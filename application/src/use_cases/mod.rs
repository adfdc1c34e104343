//! Use cases

pub mod dispatch_query;

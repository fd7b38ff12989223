//! Database schema, connection setup, row conversion, and fixture writers.

pub mod converters;
pub mod fixture;
pub mod schema;

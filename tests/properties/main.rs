//! Property test suite entry point.

mod expansion_props;
mod fusion_props;

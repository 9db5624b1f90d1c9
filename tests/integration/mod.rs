//! Integration tests driving real agent processes through the registry

mod catalog_dispatch;
mod command_correlation;
mod registry_lifecycle;
mod snapshot_roundtrip;
mod support;

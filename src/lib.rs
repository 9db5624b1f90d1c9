//! Agentgraph: Knowledge Graph Store and STDIO Agent Tool Router
//!
//! An in-process knowledge graph (entities, relations, observations) paired
//! with a registry of supervised child-process agents that speak
//! line-delimited JSON. Built-in graph tools and agent-advertised tools are
//! merged into one catalog and invoked through a single routing layer.

pub mod agent;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod tooling;
pub mod types;

//! resdep Resource
//!
//! The resource model: actions grouped by path template, their ancestors,
//! creation chains, templates and parameter metadata, plus the calls that
//! realize templates.
//!
//! # Module Structure
//!
//! - `cluster` - The authoritative table of resources and its construction
//! - `resource` - One resource and its verb flags
//! - `chain` - Creation chains
//! - `template` - Verb-combination templates
//! - `param_info` - Per-parameter binding metadata
//! - `call` - Calls, their status and resource instance
//! - `sampler` - Sampling calls from templates

pub mod call;
pub mod chain;
pub mod cluster;
pub mod error;
pub mod param_info;
pub mod resource;
pub mod sampler;
pub mod template;

pub use call::{Call, CallStatus, ResourceInstance};
pub use chain::{needs_parent, ChainStatus, CreationChain};
pub use cluster::ResourceCluster;
pub use error::{ResourceError, ResourceResult};
pub use param_info::{param_key, ParamInfo};
pub use resource::Resource;
pub use sampler::SamplingOptions;
pub use template::{CallsTemplate, SEPARATOR};

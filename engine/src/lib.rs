//! resdep Engine
//!
//! Resource-dependency-aware composition of REST test cases: ad-hoc seed
//! individuals, dependency-guided sampling of calls and structural
//! mutation of individuals, with repair of bindings and foreign keys after
//! every edit.
//!
//! # Module Structure
//!
//! - `config` - Engine configuration with presets
//! - `individual` - The chromosome: calls plus database initialization
//! - `sample_type` - How an individual was produced, gating mutation
//! - `manager` - The resource manager: seeding, sampling and mutation primitives
//! - `mutator` - The structural mutator
//!
//! # Example
//!
//! ```ignore
//! use resdep_engine::{EngineConfig, ResourceManager, StructureMutator};
//!
//! let config = EngineConfig::default();
//! let mut manager = ResourceManager::new(config.clone())?;
//! manager.init_resources(&catalogue, None)?;
//! let mutator = StructureMutator::new(&config);
//! for mut individual in manager.create_ad_hoc_individuals(None)? {
//!     let outcome = mutator.mutate(&mut manager, &mut individual)?;
//! }
//! ```

pub mod config;
pub mod error;
pub mod individual;
pub mod manager;
pub mod mutator;
pub mod sample_type;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use individual::Individual;
pub use manager::ResourceManager;
pub use mutator::{MutationOutcome, StructureMutator};
pub use sample_type::SampleType;

pub use resdep_dependency::{DbExecution, FitnessSnapshot, FitnessVerdict, MutationKind};

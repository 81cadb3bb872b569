//! How an individual was produced.

use resdep_dependency::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    Random,
    /// Built by a smart sampler outside this engine; kept as is.
    Smart,
    SmartGetCollection,
    /// Ad-hoc seeds, before any dependency is known.
    SmartResourceWithoutDep,
    /// Built from recorded dependencies.
    SmartResource,
}

impl SampleType {
    /// Every structural mutation kind is legal except on smart samples.
    pub fn allows(self, _kind: MutationKind) -> bool {
        match self {
            SampleType::Smart => false,
            SampleType::Random
            | SampleType::SmartGetCollection
            | SampleType::SmartResourceWithoutDep
            | SampleType::SmartResource => true,
        }
    }
}

//! Data model for de novo sequencing results.

pub mod amino_acid;
pub mod assumption;
pub mod modification;
pub mod resolver;
pub mod spectrum_match;
pub mod statistics;

pub use amino_acid::AminoAcid;
pub use assumption::{
    mass_error, theoretical_mz, AminoAcidSequence, Assumption, AssumptionScores, MassError,
    Peptide, PeptideAssumption, Tag, TagAssumption,
};
pub use modification::{Modification, ModificationCatalog, ModificationKind, ModificationMatch};
pub use resolver::ModificationResolver;
pub use spectrum_match::SpectrumMatch;
pub use statistics::{Bounds, RunStatistics};

//! Amino acid alphabet recognized in engine output sequences.

use serde::{Deserialize, Serialize};

/// Monoisotopic mass of water.
pub const WATER_MASS: f64 = 18.010_564_7;
/// Monoisotopic mass of a proton.
pub const PROTON_MASS: f64 = 1.007_276_466_77;
/// Mass difference between C13 and C12.
pub const C13_DIFFERENCE: f64 = 1.003_354_837_8;

/// One residue of the recognized alphabet, including the ambiguous codes
/// engines are allowed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub enum AminoAcid {
    Alanine,
    Arginine,
    Asparagine,
    AsparticAcid,
    Cysteine,
    GlutamicAcid,
    Glutamine,
    Glycine,
    Histidine,
    Isoleucine,
    Leucine,
    Lysine,
    Methionine,
    Phenylalanine,
    Proline,
    Serine,
    Threonine,
    Tryptophan,
    Tyrosine,
    Valine,
    Selenocysteine,
    Pyrrolysine,
    /// Asparagine or aspartic acid.
    AmbiguousB,
    /// Leucine or isoleucine.
    AmbiguousJ,
    /// Glutamine or glutamic acid.
    AmbiguousZ,
    Unknown,
}

impl AminoAcid {
    pub fn from_char(c: char) -> Option<Self> {
        let aa = match c {
            'A' => Self::Alanine,
            'R' => Self::Arginine,
            'N' => Self::Asparagine,
            'D' => Self::AsparticAcid,
            'C' => Self::Cysteine,
            'E' => Self::GlutamicAcid,
            'Q' => Self::Glutamine,
            'G' => Self::Glycine,
            'H' => Self::Histidine,
            'I' => Self::Isoleucine,
            'L' => Self::Leucine,
            'K' => Self::Lysine,
            'M' => Self::Methionine,
            'F' => Self::Phenylalanine,
            'P' => Self::Proline,
            'S' => Self::Serine,
            'T' => Self::Threonine,
            'W' => Self::Tryptophan,
            'Y' => Self::Tyrosine,
            'V' => Self::Valine,
            'U' => Self::Selenocysteine,
            'O' => Self::Pyrrolysine,
            'B' => Self::AmbiguousB,
            'J' => Self::AmbiguousJ,
            'Z' => Self::AmbiguousZ,
            'X' => Self::Unknown,
            _ => return None,
        };
        Some(aa)
    }

    pub fn one_letter_code(self) -> char {
        match self {
            Self::Alanine => 'A',
            Self::Arginine => 'R',
            Self::Asparagine => 'N',
            Self::AsparticAcid => 'D',
            Self::Cysteine => 'C',
            Self::GlutamicAcid => 'E',
            Self::Glutamine => 'Q',
            Self::Glycine => 'G',
            Self::Histidine => 'H',
            Self::Isoleucine => 'I',
            Self::Leucine => 'L',
            Self::Lysine => 'K',
            Self::Methionine => 'M',
            Self::Phenylalanine => 'F',
            Self::Proline => 'P',
            Self::Serine => 'S',
            Self::Threonine => 'T',
            Self::Tryptophan => 'W',
            Self::Tyrosine => 'Y',
            Self::Valine => 'V',
            Self::Selenocysteine => 'U',
            Self::Pyrrolysine => 'O',
            Self::AmbiguousB => 'B',
            Self::AmbiguousJ => 'J',
            Self::AmbiguousZ => 'Z',
            Self::Unknown => 'X',
        }
    }

    /// Monoisotopic residue mass in Dalton. Ambiguous codes use the mean of
    /// the residues they stand for.
    pub fn monoisotopic_mass(self) -> f64 {
        match self {
            Self::Alanine => 71.037_113_8,
            Self::Arginine => 156.101_111_0,
            Self::Asparagine => 114.042_927_4,
            Self::AsparticAcid => 115.026_943_0,
            Self::Cysteine => 103.009_184_5,
            Self::GlutamicAcid => 129.042_593_1,
            Self::Glutamine => 128.058_577_5,
            Self::Glycine => 57.021_463_7,
            Self::Histidine => 137.058_911_9,
            Self::Isoleucine | Self::Leucine | Self::AmbiguousJ => 113.084_064_0,
            Self::Lysine => 128.094_963_0,
            Self::Methionine => 131.040_484_6,
            Self::Phenylalanine => 147.068_413_9,
            Self::Proline => 97.052_763_9,
            Self::Serine => 87.032_028_4,
            Self::Threonine => 101.047_678_5,
            Self::Tryptophan => 186.079_312_9,
            Self::Tyrosine => 163.063_328_5,
            Self::Valine => 99.068_413_9,
            Self::Selenocysteine => 150.953_633_4,
            Self::Pyrrolysine => 237.147_726_9,
            Self::AmbiguousB => 114.534_935_2,
            Self::AmbiguousZ => 128.550_585_3,
            Self::Unknown => 118.805_716_0,
        }
    }
}

impl TryFrom<char> for AminoAcid {
    type Error = String;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Self::from_char(value).ok_or_else(|| format!("'{}' is not an amino acid", value))
    }
}

impl From<AminoAcid> for char {
    fn from(value: AminoAcid) -> Self {
        value.one_letter_code()
    }
}

impl std::fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.one_letter_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_letters() {
        for c in "ARNDCEQGHILKMFPSTWYVUOBJZX".chars() {
            let aa = AminoAcid::from_char(c).unwrap();
            assert_eq!(aa.one_letter_code(), c);
        }
    }

    #[test]
    fn test_rejects_non_residues() {
        assert!(AminoAcid::from_char('a').is_none());
        assert!(AminoAcid::from_char('+').is_none());
        assert!(AminoAcid::from_char('1').is_none());
        assert!(AminoAcid::from_char('.').is_none());
    }

    #[test]
    fn test_leucine_and_isoleucine_share_mass() {
        assert_eq!(
            AminoAcid::Leucine.monoisotopic_mass(),
            AminoAcid::Isoleucine.monoisotopic_mass()
        );
    }

    #[test]
    fn test_deserialize_from_letter() {
        let aa: AminoAcid = serde_json::from_str("\"M\"").unwrap();
        assert_eq!(aa, AminoAcid::Methionine);
        assert!(serde_json::from_str::<AminoAcid>("\"1\"").is_err());
    }
}

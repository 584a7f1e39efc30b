//! Compact sequences with embedded signed mass deltas, e.g. `AC+15K`.

use crate::error::ParseError;
use crate::identification::{AminoAcid, AminoAcidSequence, ModificationMatch, ModificationResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Sign,
    Digit,
    Other,
}

fn classify(c: char) -> CharClass {
    match c {
        '+' | '-' => CharClass::Sign,
        '0'..='9' => CharClass::Digit,
        _ => CharClass::Other,
    }
}

struct SequenceBuilder<'a> {
    source: &'a str,
    resolver: &'a ModificationResolver,
    sequence: AminoAcidSequence,
    last: Option<AminoAcid>,
    pending: String,
}

impl<'a> SequenceBuilder<'a> {
    fn has_pending_number(&self) -> bool {
        self.pending.chars().any(|c| c.is_ascii_digit())
    }

    /// Places the pending delta on the current residue, or on the first
    /// residue when nothing has been emitted yet.
    fn flush(&mut self, confident: bool) -> Result<(), ParseError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let token = std::mem::take(&mut self.pending);
        let modification = self
            .resolver
            .resolve_token(&token, self.last)
            .map_err(|source| ParseError::Modification {
                sequence: self.source.to_string(),
                source,
            })?;
        let site = self.sequence.residues.len().max(1);
        self.sequence
            .modifications
            .push(ModificationMatch::variable(modification, site, confident));
        Ok(())
    }

    fn push_residue(&mut self, c: char) -> Result<(), ParseError> {
        let residue = AminoAcid::from_char(c).ok_or_else(|| ParseError::InvalidToken {
            token: c,
            sequence: self.source.to_string(),
        })?;
        self.sequence.residues.push(residue);
        self.last = Some(residue);
        Ok(())
    }
}

/// Splits `source` into residues and resolved modifications.
///
/// A delta ended by another sign is placed with less confidence than one
/// ended by a residue or by the end of the string.
pub fn parse_sequence(
    source: &str,
    resolver: &ModificationResolver,
) -> Result<AminoAcidSequence, ParseError> {
    let mut builder = SequenceBuilder {
        source,
        resolver,
        sequence: AminoAcidSequence::default(),
        last: None,
        pending: String::new(),
    };

    for c in source.chars() {
        match classify(c) {
            CharClass::Sign => {
                if builder.has_pending_number() {
                    builder.flush(false)?;
                }
                builder.pending.push(c);
            }
            CharClass::Digit => builder.pending.push(c),
            CharClass::Other => {
                builder.flush(true)?;
                builder.push_residue(c)?;
            }
        }
    }
    builder.flush(true)?;

    Ok(builder.sequence)
}

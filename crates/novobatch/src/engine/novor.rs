use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::config::{MassUnit, NovorConfig, SearchSettings};
use crate::identification::{Modification, ModificationCatalog, ModificationKind};

use super::{file_stem, AuxiliaryFile, Engine, EngineCommand};

pub const EXECUTABLE_FILE_NAME: &str = "novor.jar";

/// Short names Novor reports in place of modification names.
///
/// Variable modifications come first, then fixed ones, each in catalog
/// order, numbered from 0. Rebuilding the map from the same catalog always
/// yields the same numbering, so the parser does not need the file written
/// for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct NovorModificationMap {
    names: Vec<String>,
}

impl NovorModificationMap {
    pub fn new(catalog: &ModificationCatalog) -> Self {
        let names = catalog
            .variable()
            .chain(catalog.fixed())
            .map(|m| m.name.clone())
            .collect();
        Self { names }
    }

    pub fn name(&self, short_name: &str) -> Option<&str> {
        let index: usize = short_name.trim().parse().ok()?;
        self.names.get(index).map(String::as_str)
    }

    pub fn short_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }
}

fn rounded_mass(mass: f64) -> f64 {
    (mass * 1e4).round() / 1e4
}

fn group_code(kind: ModificationKind) -> &'static str {
    match kind {
        ModificationKind::NTermResidue => "nr-",
        ModificationKind::NTerm => "n--",
        ModificationKind::CTermResidue => "-rc",
        ModificationKind::CTerm => "--c",
        ModificationKind::Residue => "-r-",
    }
}

fn modification_line(short_name: usize, modification: &Modification) -> String {
    let residues: String = if modification.residues.is_empty() {
        "*".to_string()
    } else {
        modification
            .residues
            .iter()
            .map(|aa| aa.one_letter_code())
            .collect()
    };
    format!(
        "{name}, {short_name}, {name}, {group}, {residues}, , {mass}",
        name = modification.name,
        group = group_code(modification.kind),
        mass = rounded_mass(modification.mass),
    )
}

/// Contents of the `-m` modification file.
pub fn modifications_file(catalog: &ModificationCatalog) -> String {
    let map = NovorModificationMap::new(catalog);
    let mut contents = String::new();
    for (short_name, name) in map.iter() {
        if let Some(modification) = catalog.get(name) {
            let _ = writeln!(contents, "{}", modification_line(short_name, modification));
        }
    }
    contents
}

/// Contents of the `-p` parameter file.
pub fn parameters_file(
    settings: &NovorConfig,
    search: &SearchSettings,
    catalog: &ModificationCatalog,
) -> String {
    let mut contents = String::new();
    let _ = writeln!(contents, "# Search parameters");
    let _ = writeln!(contents, "enzyme = Trypsin");
    let _ = writeln!(contents, "fragmentation = {}", settings.fragmentation);
    let _ = writeln!(contents, "massAnalyzer = {}", settings.mass_analyzer);
    // Novor only understands Dalton for fragments
    let _ = writeln!(
        contents,
        "fragmentIonErrorTol = {}Da",
        search.fragment_tolerance.in_daltons()
    );
    let precursor_unit = match search.precursor_tolerance.unit {
        MassUnit::Da => "Da",
        MassUnit::Ppm => "ppm",
    };
    let _ = writeln!(
        contents,
        "precursorErrorTol = {}{}",
        search.precursor_tolerance.value, precursor_unit
    );
    contents.push('\n');

    let variable: Vec<&str> = catalog.variable().map(|m| m.name.as_str()).collect();
    if !variable.is_empty() {
        let _ = writeln!(contents, "# Variable modifications");
        let _ = writeln!(contents, "variableModifications = {}\n", variable.join(", "));
    }

    let fixed: Vec<&str> = catalog.fixed().map(|m| m.name.as_str()).collect();
    if !fixed.is_empty() {
        let _ = writeln!(contents, "# Fixed modifications");
        let _ = writeln!(contents, "fixedModifications = {}\n", fixed.join(", "));
    }

    let _ = writeln!(contents, "# I is the same mass as L, U is very rare");
    let _ = writeln!(contents, "forbiddenResidues = I,U");
    contents
}

pub fn parameters_path(spectrum_file: &Path, output_folder: &Path) -> PathBuf {
    output_folder.join(format!("{}.novor_params.txt", file_stem(spectrum_file)))
}

pub fn modifications_path(spectrum_file: &Path, output_folder: &Path) -> PathBuf {
    output_folder.join(format!("{}.novor_mods.txt", file_stem(spectrum_file)))
}

pub fn build_command(
    settings: &NovorConfig,
    search: &SearchSettings,
    catalog: &ModificationCatalog,
    spectrum_file: &Path,
    output_folder: &Path,
) -> EngineCommand {
    let output_file = Engine::Novor.output_file(spectrum_file, output_folder);
    let parameters = parameters_path(spectrum_file, output_folder);
    let modifications = modifications_path(spectrum_file, output_folder);

    let mut command = EngineCommand::new(Engine::Novor, &settings.java, output_file.clone());
    command.working_dir = Some(settings.folder.clone());
    command.auxiliary_files = vec![
        AuxiliaryFile {
            path: parameters.clone(),
            contents: parameters_file(settings, search, catalog),
        },
        AuxiliaryFile {
            path: modifications.clone(),
            contents: modifications_file(catalog),
        },
    ];

    command
        .args(&settings.java_options)
        .arg("-jar")
        .arg(settings.folder.join(EXECUTABLE_FILE_NAME))
        .arg("-p")
        .arg(parameters)
        .arg("-m")
        .arg(modifications)
        .arg("-o")
        .arg(output_file)
        .arg("-f")
        .arg(spectrum_file);

    command
}

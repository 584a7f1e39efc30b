use std::path::Path;

use crate::config::{Digest, PepNovoConfig, SearchSettings};
use crate::identification::{Modification, ModificationCatalog};

use super::{Engine, EngineCommand};

/// Renders the catalog as PepNovo's `-PTMs` list: `M+16:C+57:^+42`.
pub fn ptm_list(catalog: &ModificationCatalog) -> String {
    let mut entries: Vec<String> = Vec::new();
    for modification in catalog.iter() {
        for entry in ptm_entries(modification) {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }
    entries.join(":")
}

fn ptm_entries(modification: &Modification) -> Vec<String> {
    let mass = modification.mass.round() as i64;
    let delta = if mass >= 0 {
        format!("+{}", mass)
    } else {
        mass.to_string()
    };

    if modification.kind.is_n_term() {
        vec![format!("^{}", delta)]
    } else if modification.kind.is_c_term() {
        vec![format!("${}", delta)]
    } else {
        modification
            .residues
            .iter()
            .map(|aa| format!("{}{}", aa.one_letter_code(), delta))
            .collect()
    }
}

pub fn build_command(
    settings: &PepNovoConfig,
    search: &SearchSettings,
    catalog: &ModificationCatalog,
    spectrum_file: &Path,
    output_folder: &Path,
) -> EngineCommand {
    let output_file = Engine::PepNovo.output_file(spectrum_file, output_folder);
    let mut command = EngineCommand::new(
        Engine::PepNovo,
        settings.folder.join(&settings.executable),
        output_file,
    );
    command.working_dir = Some(settings.folder.clone());
    command.stdout_to_output = true;

    command
        .arg("-file")
        .arg(spectrum_file)
        .arg("-model")
        .arg(&settings.model);

    if settings.correct_precursor_mass {
        command.arg("-correct_pm");
    }
    if !settings.estimate_charge {
        command.arg("-use_spectrum_charge");
    }

    command
        .arg("-fragment_tolerance")
        .arg(search.fragment_tolerance.in_daltons().to_string())
        .arg("-pm_tolerance")
        .arg(search.precursor_tolerance.in_daltons().to_string());

    let ptms = ptm_list(catalog);
    if !ptms.is_empty() {
        command.arg("-PTMs").arg(ptms);
    }

    let digest = match search.digest {
        Digest::Trypsin => "TRYPSIN",
        Digest::NonSpecific => "NON_SPECIFIC",
    };
    command
        .arg("-digest")
        .arg(digest)
        .arg("-num_solutions")
        .arg(search.num_solutions.to_string())
        .arg("-model_dir")
        .arg(settings.folder.join("Models"));

    command
}

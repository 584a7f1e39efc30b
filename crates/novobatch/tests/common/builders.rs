//! Builders for run configurations and engine output.

#![allow(dead_code)]

use serde_json::{json, Value};

use super::harness::TestHarness;

pub const PEPNOVO_HEADER: &str = "#Index\tRnkScr\tPnvScr\tN-Gap\tC-Gap\t[M+H]\tCharge\tSequence";
pub const NOVOR_HEADER: &str = "# id, scanNum, RT, mz(data), z, pepMass(denovo), err(data-denovo), ppm(1e6*err/(mz*z)), score, peptide, aaScore,";

/// Modifications used across the tests, in resolution order.
pub fn modifications() -> Value {
    json!([
        { "name": "Oxidation of M", "short_name": "ox", "mass": 15.994915, "kind": "residue", "residues": ["M"] },
        { "name": "Plus fifteen on C", "mass": 15.0, "kind": "residue", "residues": ["C"] },
        { "name": "Acetylation of peptide N-term", "short_name": "ace", "mass": 42.010565, "kind": "n_term" },
        { "name": "Carbamidomethylation of C", "short_name": "cmm", "mass": 57.021464, "kind": "residue", "residues": ["C"], "fixed": true }
    ])
}

/// Run configuration with the engines given as JSON sections.
pub struct ConfigBuilder<'a> {
    harness: &'a TestHarness,
    pepnovo: Option<Value>,
    novor: Option<Value>,
    export: Value,
    threads: usize,
    failure_policy: &'static str,
}

impl<'a> ConfigBuilder<'a> {
    pub fn new(harness: &'a TestHarness) -> Self {
        Self {
            harness,
            pepnovo: None,
            novor: None,
            export: json!({}),
            threads: 2,
            failure_policy: "continue",
        }
    }

    pub fn pepnovo(mut self, title_token_offset: usize) -> Self {
        self.pepnovo = Some(json!({
            "folder": self.harness.pepnovo_dir,
            "format": { "title_token_offset": title_token_offset }
        }));
        self
    }

    pub fn novor(mut self) -> Self {
        self.novor = Some(json!({
            "folder": self.harness.novor_dir,
            "java": self.harness.novor_dir.join("java")
        }));
        self
    }

    pub fn export(mut self, export: Value) -> Self {
        self.export = export;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn cancel_on_failure(mut self) -> Self {
        self.failure_policy = "cancel_run";
        self
    }

    pub fn to_json(&self) -> Value {
        let mut config = json!({
            "spectrum_inputs": [self.harness.input_dir],
            "output_folder": self.harness.output_dir,
            "threads": self.threads,
            "modifications": modifications(),
            "export": self.export,
            "failure_policy": self.failure_policy
        });
        if let Some(pepnovo) = &self.pepnovo {
            config["pepnovo"] = pepnovo.clone();
        }
        if let Some(novor) = &self.novor {
            config["novor"] = novor.clone();
        }
        config
    }

    pub fn build(&self) -> novobatch::RunConfig {
        self.harness.config(self.to_json())
    }
}

/// One PepNovo record. `rows` are `(rank score, score, n-gap, c-gap, charge, sequence)`.
pub fn pepnovo_record(title_line: &str, rows: &[(f64, f64, f64, f64, i32, &str)]) -> String {
    let mut record = format!("{}\n{}\n", title_line, PEPNOVO_HEADER);
    for (index, (rank_score, score, n_gap, c_gap, charge, sequence)) in rows.iter().enumerate() {
        record.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t1000.5\t{}\t{}\n",
            index, rank_score, score, n_gap, c_gap, charge, sequence
        ));
    }
    record.push('\n');
    record
}

/// Novor CSV with `rows` of `(id, scan, charge, score, peptide)`.
pub fn novor_csv(rows: &[(usize, usize, i32, f64, &str)]) -> String {
    let mut csv = format!("# v1.05.0573\n#\n{}\n", NOVOR_HEADER);
    for (id, scan, charge, score, peptide) in rows {
        csv.push_str(&format!(
            "{}, {}, 12.5, 500.0, {}, 998.0, 0.01, 5.0, {}, {}, 80-80-80,\n",
            id, scan, charge, score, peptide
        ));
    }
    csv
}

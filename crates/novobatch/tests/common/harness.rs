//! Isolated folders and fake engines for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use novobatch::config::{load_config_from_str, ConfigFormat, RunConfig};

pub struct TestHarness {
    temp_dir: TempDir,
    /// Spectrum files go here.
    pub input_dir: PathBuf,
    /// Engine results and reports land here.
    pub output_dir: PathBuf,
    /// Installation folder of the fake PepNovo.
    pub pepnovo_dir: PathBuf,
    /// Installation folder of the fake Novor.
    pub novor_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let input_dir = base.join("spectra");
        let output_dir = base.join("out");
        let pepnovo_dir = base.join("pepnovo");
        let novor_dir = base.join("novor");
        for dir in [&input_dir, &pepnovo_dir, &novor_dir] {
            std::fs::create_dir_all(dir).expect("Failed to create test directory");
        }

        Self {
            temp_dir,
            input_dir,
            output_dir,
            pepnovo_dir,
            novor_dir,
        }
    }

    pub fn base(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes an MGF with one `BEGIN IONS` block per title.
    pub fn write_mgf(&self, name: &str, titles: &[&str]) -> PathBuf {
        let mut contents = String::new();
        for title in titles {
            contents.push_str(&format!(
                "BEGIN IONS\nTITLE={}\nPEPMASS=500.0\nCHARGE=2+\n100.0 10.0\nEND IONS\n",
                title
            ));
        }
        let path = self.input_dir.join(name);
        std::fs::write(&path, contents).expect("Failed to write MGF");
        path
    }

    /// Installs an executable shell script.
    #[cfg(unix)]
    pub fn write_script(&self, path: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
        let mut permissions = std::fs::metadata(path).unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions).unwrap();
        path.to_path_buf()
    }

    /// Fake PepNovo printing `output` for every spectrum file.
    #[cfg(unix)]
    pub fn install_pepnovo(&self, output: &str) -> PathBuf {
        let canned = self.pepnovo_dir.join("canned.out");
        std::fs::write(&canned, output).unwrap();
        self.write_script(
            &self.pepnovo_dir.join("PepNovo_bin"),
            &format!("echo 'PepNovo+ Build 20120423' >&2\ncat '{}'", canned.display()),
        )
    }

    /// Fake `java` running Novor: writes `output` to the `-o` argument.
    #[cfg(unix)]
    pub fn install_novor(&self, output: &str) -> PathBuf {
        let canned = self.novor_dir.join("canned.csv");
        std::fs::write(&canned, output).unwrap();
        self.write_script(
            &self.novor_dir.join("java"),
            &format!(
                r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
echo "novor running"
cp '{}' "$out""#,
                canned.display()
            ),
        )
    }

    /// Fake `java` that runs until killed.
    #[cfg(unix)]
    pub fn install_hanging_novor(&self) -> PathBuf {
        self.write_script(&self.novor_dir.join("java"), "exec sleep 30")
    }

    /// Fake `java` that fails without writing anything.
    #[cfg(unix)]
    pub fn install_failing_novor(&self) -> PathBuf {
        self.write_script(
            &self.novor_dir.join("java"),
            "echo 'Exception in thread main' >&2\nexit 3",
        )
    }

    pub fn config(&self, json: serde_json::Value) -> RunConfig {
        load_config_from_str(&json.to_string(), ConfigFormat::Json).expect("Invalid test config")
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn read_output(&self, name: &str) -> String {
        std::fs::read_to_string(self.output_file(name)).expect("Missing output file")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

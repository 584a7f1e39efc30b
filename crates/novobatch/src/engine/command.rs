use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use super::Engine;

/// A file that must exist before the engine starts.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryFile {
    pub path: PathBuf,
    pub contents: String,
}

/// A fully resolved engine invocation. Arguments are passed as a discrete
/// vector, never through a shell.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub engine: Engine,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub output_file: PathBuf,
    /// The engine prints its results on stdout instead of writing a file.
    pub stdout_to_output: bool,
    pub auxiliary_files: Vec<AuxiliaryFile>,
}

impl EngineCommand {
    pub fn new(engine: Engine, program: impl Into<PathBuf>, output_file: PathBuf) -> Self {
        Self {
            engine,
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            output_file,
            stdout_to_output: false,
            auxiliary_files: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Space-joined rendering, for logs only.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }

    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|a| a.to_str())
    }

    /// Value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        let position = self.args.iter().position(|a| a == flag)?;
        self.arg_str(position + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let mut command = EngineCommand::new(
            Engine::PepNovo,
            "/opt/pepnovo/PepNovo_bin",
            PathBuf::from("/out/a.mgf.out"),
        );
        command.arg("-file").arg("/data/a b.mgf").args(["-num_solutions", "10"]);
        assert_eq!(
            command.command_line(),
            "/opt/pepnovo/PepNovo_bin -file /data/a b.mgf -num_solutions 10"
        );
        assert_eq!(command.flag_value("-file"), Some("/data/a b.mgf"));
        assert_eq!(command.flag_value("-model"), None);
        assert_eq!(command.args.len(), 4);
    }
}

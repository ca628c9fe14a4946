//! The stable flag contract every content module is invoked with
//!.
//!
//! A module is launched as a separate process and receives its inputs,
//! output location, and run-scoped plumbing (state file, progress file,
//! run id, instrumentation sink) purely as command-line flags. Nothing
//! about a module's internals is specified here, only the contract.

use std::process::Command;

use camino::Utf8PathBuf;
use cf_recipe::Params;
use cf_utils::RunId;

/// One module invocation, fully resolved and ready to become a
/// [`std::process::Command`].
#[derive(Debug, Clone)]
pub struct ModuleInvocation {
    pub entrypoint: Utf8PathBuf,
    pub inputs: Vec<Utf8PathBuf>,
    pub out: Utf8PathBuf,
    pub state_file: Utf8PathBuf,
    pub progress_file: Utf8PathBuf,
    pub run_id: RunId,
    pub instrumentation_sink: Option<Utf8PathBuf>,
    pub params: Params,
}

impl ModuleInvocation {
    /// Build the subprocess command for this invocation. Param flags are
    /// emitted in a stable, sorted order so two runs of the same stage
    /// produce byte-identical command lines (Testable Property 6).
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(self.entrypoint.as_std_path());

        for input in &self.inputs {
            cmd.arg("--input").arg(input.as_std_path());
        }
        cmd.arg("--out").arg(self.out.as_std_path());
        cmd.arg("--state-file").arg(self.state_file.as_std_path());
        cmd.arg("--progress-file").arg(self.progress_file.as_std_path());
        cmd.arg("--run-id").arg(self.run_id.as_str());
        if let Some(sink) = &self.instrumentation_sink {
            cmd.arg("--instrumentation-sink").arg(sink.as_std_path());
        }

        let mut names: Vec<&String> = self.params.keys().collect();
        names.sort();
        for name in names {
            let value = &self.params[name];
            if let Some(arg) = value.as_cli_arg() {
                cmd.arg(format!("--{name}")).arg(arg);
            }
        }

        cmd
    }
}

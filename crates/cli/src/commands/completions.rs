//! Shell completion scripts

use std::io::Write;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Generate shell completions
pub fn execute(args: CompletionsArgs) -> ExitCode {
    let script = render(args.shell);

    let written = match &args.output {
        Some(path) => std::fs::write(path, &script),
        None => std::io::stdout().write_all(&script),
    };
    match written {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("Failed to write completions: {e}");
            ExitCode::GeneralError
        }
    }
}

fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, name, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_cover_subcommands() {
        let script = String::from_utf8(render(Shell::Bash)).unwrap();
        assert!(script.contains("complete"));
        for sub in ["put", "cat", "get", "info", "alias"] {
            assert!(script.contains(sub), "missing {sub}");
        }
    }

    #[test]
    fn test_completions_per_shell() {
        let cases = [
            (Shell::Zsh, "compdef"),
            (Shell::Fish, "complete -c tf"),
            (Shell::PowerShell, "Register-ArgumentCompleter"),
        ];
        for (shell, marker) in cases {
            let script = String::from_utf8(render(shell)).unwrap();
            assert!(script.contains(marker), "{shell:?} script lacks {marker}");
        }
    }

    #[test]
    fn test_completions_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tf.bash");
        let code = execute(CompletionsArgs {
            shell: Shell::Bash,
            output: Some(path.clone()),
        });
        assert_eq!(code, ExitCode::Success);
        assert!(std::fs::metadata(path).unwrap().len() > 0);
    }
}

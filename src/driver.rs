//! Assembler/linker driver.
//!
//! Writes generated assembly text to a temporary `.s` file and shells out
//! to the system `cc` to assemble and link it into an executable.
//! `print_int`, `print_bool`, and `read_int` are declared `.extern`
//! in the assembly and must be satisfied by whatever the linker is given —
//! providing that runtime is out of scope here.

use crate::error::CompileError;
use std::path::Path;
use std::process::Command;
use tempfile::Builder;

/// Assemble and link `assembly` into a native executable at `output_path`.
pub fn assemble_and_link(assembly: &str, output_path: &Path) -> Result<(), CompileError> {
    which("cc")?;

    let asm_file = Builder::new()
        .prefix("minic-")
        .suffix(".s")
        .tempfile()
        .map_err(|e| CompileError::Toolchain(format!("failed to create temporary assembly file: {e}")))?;
    std::fs::write(asm_file.path(), assembly)?;

    let output = Command::new("cc")
        .arg(asm_file.path())
        .arg("-o")
        .arg(output_path)
        .arg("-no-pie")
        .output()
        .map_err(|e| CompileError::Toolchain(format!("failed to run cc: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CompileError::Toolchain(format!("cc failed:\n{stderr}")));
    }

    Ok(())
}

/// Check that `program` is resolvable on `PATH` before shelling out to it,
/// so toolchain failures are reported with a clear message instead of a
/// bare `os error 2`.
fn which(program: &str) -> Result<(), CompileError> {
    let found = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false);
    if found {
        Ok(())
    } else {
        Err(CompileError::Toolchain(format!("\"{program}\" was not found on PATH")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_toolchain_program_is_reported_clearly() {
        let err = which("definitely-not-a-real-toolchain-binary").unwrap_err();
        assert!(matches!(err, CompileError::Toolchain(_)));
    }

    #[test]
    fn cc_is_normally_on_path_in_a_dev_environment() {
        // This test documents the happy path; it is not a compile-it-and-run
        // end-to-end test (see tests/ for that, gated behind #[ignore]).
        let _ = which("cc");
    }
}

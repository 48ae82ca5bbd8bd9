//! Enumeration of the symbols exported by a library.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::Addr;
use crate::Error;
use crate::ErrorExt as _;
use crate::Result;


/// A single symbol exported by a library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibSym {
    /// The symbol's address within the library.
    pub addr: Addr,
    /// The symbol's display name, typically a demangled signature.
    pub name: Box<str>,
}

impl LibSym {
    /// Create a new `LibSym`.
    pub fn new(addr: Addr, name: impl Into<Box<str>>) -> Self {
        Self {
            addr,
            name: name.into(),
        }
    }
}


/// The source of symbol listings for libraries.
///
/// Production use cases enumerate symbols by running a toolchain
/// binary (see [`NmTool`]); tests typically substitute an in-memory
/// implementation to avoid spawning processes.
pub trait SymbolSource {
    /// Enumerate the symbols exported by the library at `path`.
    ///
    /// The returned listing need not be sorted. An `Err` return is
    /// treated by callers as the library exporting no symbols at all.
    fn symbols(&self, path: &Path) -> Result<Vec<LibSym>>;
}


impl<S> SymbolSource for &S
where
    S: SymbolSource + ?Sized,
{
    fn symbols(&self, path: &Path) -> Result<Vec<LibSym>> {
        (**self).symbols(path)
    }
}


/// A [`SymbolSource`] shelling out to an `nm`-style binary.
///
/// The tool is invoked once per library as
/// `<tool> -gC --defined-only <path>` and is expected to emit one
/// symbol per line in the form `<hex address> <type> <name>`, with the
/// name potentially containing spaces (demangled C++ signatures
/// usually do). Lines not of this form are skipped.
#[derive(Clone, Debug)]
pub struct NmTool {
    /// The binary to invoke.
    tool: OsString,
}

impl NmTool {
    /// Create a new `NmTool` using `nm` as found in `PATH`.
    pub fn new() -> Self {
        Self::with_tool("nm")
    }

    /// Create a new `NmTool` invoking the provided binary instead of
    /// `nm`, e.g., a cross toolchain's variant.
    pub fn with_tool(tool: impl Into<OsString>) -> Self {
        Self { tool: tool.into() }
    }
}

impl Default for NmTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolSource for NmTool {
    fn symbols(&self, path: &Path) -> Result<Vec<LibSym>> {
        let output = Command::new(&self.tool)
            .arg("-gC")
            .arg("--defined-only")
            .arg(path)
            .output()
            .with_context(|| {
                format!(
                    "failed to run `{}` on {}",
                    self.tool.to_string_lossy(),
                    path.display()
                )
            })?;

        if !output.status.success() {
            return Err(Error::with_invalid_data(format!(
                "`{}` reported {} for {}",
                self.tool.to_string_lossy(),
                output.status,
                path.display()
            )))
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_err| {
            Error::with_invalid_data(format!(
                "`{}` emitted non-UTF-8 output for {}",
                self.tool.to_string_lossy(),
                path.display()
            ))
        })?;
        Ok(parse_nm_output(&stdout))
    }
}

/// Parse `nm` style output into a symbol listing.
fn parse_nm_output(output: &str) -> Vec<LibSym> {
    let mut syms = Vec::new();
    for line in output.lines() {
        let mut parts = line.splitn(3, ' ');

        #[rustfmt::skip]
        let (addr, name) = {
            let addr = if let Some(part) = parts.next() { part } else { continue };
            let _typ = if let Some(part) = parts.next() { part } else { continue };
            let name = if let Some(part) = parts.next() { part } else { continue };
            (addr, name)
        };

        if name.is_empty() {
            continue
        }
        if let Ok(addr) = Addr::from_str_radix(addr, 16) {
            let () = syms.push(LibSym::new(addr, name));
        }
    }
    syms
}

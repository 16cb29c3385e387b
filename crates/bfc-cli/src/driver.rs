//! Compilation pipeline shared by the subcommands

use crate::error::{CliError, Result};
use bfc_codegen::{CodeGen, Toolchain, X86_64Linux};
use bfc_error::{DiagnosticRenderer, Diagnostics, SourceCache};
use bfc_ir::{Module, Options};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One loaded source file with its diagnostics context
pub struct Session {
    pub path: PathBuf,
    pub source: String,
    cache: SourceCache,
    file_id: u32,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut cache = SourceCache::new();
        let file_id = cache.add(path.display().to_string(), source.as_str());
        tracing::info!(path = %path.display(), bytes = source.len(), "loaded source");

        Ok(Self {
            path: path.to_path_buf(),
            source,
            cache,
            file_id,
        })
    }

    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    pub fn module_name(&self) -> String {
        Module::name_from_path(&self.path)
    }

    /// Prints diagnostics to stderr, colored when stderr is a terminal
    pub fn report(&self, diagnostics: &Diagnostics) {
        if diagnostics.is_empty() {
            return;
        }

        let mut renderer = DiagnosticRenderer::new(&self.cache);
        if !std::io::stderr().is_terminal() {
            renderer = renderer.without_colors();
        }
        eprintln!("{}", diagnostics.render(&renderer));
    }

    /// Parses the file into raw IR, failing on bracket errors
    pub fn parse(&self) -> Result<Module> {
        let (body, diagnostics) = bfc_parser::parse_source(&self.source, self.file_id);
        self.report(&diagnostics);

        if diagnostics.has_errors() {
            return Err(CliError::Compile(diagnostics.error_count()));
        }
        Ok(Module::new(self.module_name(), body))
    }

    /// Resolves selector names into options, reporting fallbacks
    pub fn options(&self, cell: Option<&str>, memory: Option<&str>) -> Options {
        let (options, diagnostics) = Options::from_selectors(self.module_name(), cell, memory);
        self.report(&diagnostics);
        options
    }
}

/// How far `bfc ir` runs the pipeline
pub fn run_passes(module: Module, options: &Options, flow: bool) -> Module {
    let module = bfc_opt::optimize(module);
    if flow {
        bfc_opt::analyze_flow(module, options)
    } else {
        module
    }
}

/// Optimizes and lowers a module to assembly text
pub fn compile(module: Module, options: &Options) -> String {
    let module = run_passes(module, options, true);
    X86_64Linux::new(options.clone()).generate(&module)
}

pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Assembles (and for programs links) `asm` into `output`
pub fn assemble(backend: &X86_64Linux, asm: &str, output: &Path, keep_asm: bool) -> Result<()> {
    let scratch = tempfile::tempdir().map_err(CliError::Scratch)?;

    let asm_path = if keep_asm {
        output.with_extension("asm")
    } else {
        scratch.path().join("module.asm")
    };
    write_file(&asm_path, asm)?;

    let object = scratch.path().join("module.o");
    match backend.linker_command(&object, output) {
        Some(linker) => {
            run_tool(backend.assembler_command(&asm_path, &object))?;
            run_tool(linker)?;
        }
        None => run_tool(backend.assembler_command(&asm_path, output))?,
    }

    Ok(())
}

fn run_tool(mut cmd: Command) -> Result<()> {
    let tool = cmd.get_program().to_string_lossy().into_owned();
    tracing::info!(command = ?cmd, "running");

    let status = cmd.status().map_err(|source| CliError::Spawn {
        tool: tool.clone(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(CliError::ToolFailed { tool, status })
    }
}

//! The debugger façade.
//!
//! Coordinates artifact loading, breakpoint translation, stepping and the
//! observable session state. Every public operation acquires the
//! session-wide mutex; `run` holds it for its entire duration, so no other
//! mutation can interleave with a running worker.

use crate::abi::ContractAbi;
use crate::args::ContractArg;
use crate::debug_map::DebugMap;
use crate::disassembler::Disassembler;
use crate::emulator::{DebuggerState, DebuggerStateKind, Emulator};
use crate::error::{DebuggerError, DebuggerResult};
use crate::interop::{RuntimeEvent, TriggerType, WitnessMode};
use neo_debugger_chain::{Blockchain, Transaction, TransactionOutput};
use neo_debugger_vm::StackItem;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which view drives line <-> offset resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugMode {
    /// Resolve lines through the debug map.
    #[default]
    Source,
    /// Resolve lines through the disassembly listing.
    Assembly,
}

/// UI-level invocation settings applied before a reset.
#[derive(Debug, Clone, Default)]
pub struct DebugParameters {
    pub witness_mode: WitnessMode,
    pub trigger: TriggerType,
    pub timestamp: Option<u64>,
    pub outputs: Vec<TransactionOutput>,
    pub args: Vec<ContractArg>,
}

/// The state returned to the UI after a step or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub state: DebuggerState,
    pub line: Option<u32>,
}

struct Session {
    chain_path: PathBuf,
    disassembler: Disassembler,
    abi: Option<ContractAbi>,
    debug_map: Option<DebugMap>,
    source_text: Option<String>,
    source_language: Option<String>,
    blockchain: Arc<Mutex<Blockchain>>,
    emulator: Emulator,
    mode: DebugMode,
    args: Vec<ContractArg>,
    current_line: Option<u32>,

    /// Forces a reset before the next step or run
    reset_flag: bool,
}

/// The debugger session façade driving one emulator.
#[derive(Default)]
pub struct DebugManager {
    session: Mutex<Option<Session>>,
}

impl DebugManager {
    /// Creates a manager with no loaded contract.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a compiled contract and its sibling artifacts:
    /// `.abi.json` and `.debug.json` when present, the `.chain` snapshot or
    /// a fresh chain, and deploys the bytecode under the file stem.
    ///
    /// On failure the previous session is left untouched.
    pub fn load_avm(&self, path: &Path) -> DebuggerResult<()> {
        let session = build_session(path).map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "failed to load contract");
            err
        })?;
        *self.session.lock() = Some(session);
        tracing::info!(path = %path.display(), "contract loaded");
        Ok(())
    }

    /// Returns `true` when a contract is loaded.
    pub fn is_loaded(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Translates a line in the active view into a breakpoint. Returns
    /// `false` when the line does not correspond to any opcode.
    pub fn add_breakpoint(&self, line: u32) -> DebuggerResult<bool> {
        self.with_session(|session| {
            match resolve_offset(session, line) {
                Some(offset) => {
                    session.emulator.add_breakpoint(offset);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Removes the breakpoint on a line of the active view. Returns `false`
    /// when the line does not correspond to any opcode.
    pub fn remove_breakpoint(&self, line: u32) -> DebuggerResult<bool> {
        self.with_session(|session| {
            match resolve_offset(session, line) {
                Some(offset) => {
                    session.emulator.remove_breakpoint(offset);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Advances execution by one instruction, resetting first when the
    /// previous run finished or faulted.
    pub fn step(&self) -> DebuggerResult<StepResult> {
        self.with_session(|session| {
            ensure_reset(session)?;
            let state = session.emulator.step();
            Ok(update_state(session, state))
        })
    }

    /// Runs until the state is no longer `Running`. The session lock is
    /// held for the whole run.
    pub fn run(&self) -> DebuggerResult<StepResult> {
        self.with_session(|session| {
            ensure_reset(session)?;
            let state = session.emulator.run();
            Ok(update_state(session, state))
        })
    }

    /// Swaps between source and assembly views without affecting execution.
    pub fn toggle_debug_mode(&self) -> DebuggerResult<DebugMode> {
        self.with_session(|session| {
            session.mode = match session.mode {
                DebugMode::Source => DebugMode::Assembly,
                DebugMode::Assembly => DebugMode::Source,
            };
            Ok(session.mode)
        })
    }

    /// Returns the active view mode.
    pub fn debug_mode(&self) -> DebuggerResult<DebugMode> {
        self.with_session(|session| Ok(session.mode))
    }

    /// Applies invocation settings and resets the emulator with them.
    pub fn set_debug_parameters(&self, parameters: DebugParameters) -> DebuggerResult<()> {
        self.with_session(|session| {
            session.emulator.set_witness_mode(parameters.witness_mode);
            session.emulator.set_trigger(parameters.trigger);
            session.emulator.set_timestamp(parameters.timestamp);
            if !parameters.outputs.is_empty() {
                session
                    .emulator
                    .set_transaction(Transaction::with_outputs(parameters.outputs.clone()));
            }
            session.args = parameters.args.clone();
            session.emulator.reset(&session.args)?;
            session.reset_flag = false;
            session.current_line = None;
            Ok(())
        })
    }

    /// Returns the state observed after the most recent step.
    pub fn state(&self) -> DebuggerResult<DebuggerState> {
        self.with_session(|session| Ok(session.emulator.last_state()))
    }

    /// Returns the source line of the current offset, per the active view.
    pub fn current_line(&self) -> DebuggerResult<Option<u32>> {
        self.with_session(|session| Ok(session.current_line))
    }

    /// Returns the rendered assembly listing.
    pub fn assembly_text(&self) -> DebuggerResult<String> {
        self.with_session(|session| Ok(session.disassembler.text().to_string()))
    }

    /// Returns the loaded source text, if a debug map was present.
    pub fn source_text(&self) -> DebuggerResult<Option<String>> {
        self.with_session(|session| Ok(session.source_text.clone()))
    }

    /// Returns the language inferred from the source file extension.
    pub fn source_language(&self) -> DebuggerResult<Option<String>> {
        self.with_session(|session| Ok(session.source_language.clone()))
    }

    /// Returns the parsed ABI, if present.
    pub fn abi(&self) -> DebuggerResult<Option<ContractAbi>> {
        self.with_session(|session| Ok(session.abi.clone()))
    }

    /// Returns the gas consumed since the last reset.
    pub fn used_gas(&self) -> DebuggerResult<f64> {
        self.with_session(|session| Ok(session.emulator.used_gas()))
    }

    /// Returns the item on top of the evaluation stack, if any.
    pub fn result_value(&self) -> DebuggerResult<Option<StackItem>> {
        self.with_session(|session| Ok(session.emulator.result_value()))
    }

    /// Returns the runtime notifications and logs emitted since the last
    /// reset.
    pub fn events(&self) -> DebuggerResult<Vec<RuntimeEvent>> {
        self.with_session(|session| Ok(session.emulator.events()))
    }

    /// Dumps the profiler tallies as CSV.
    pub fn dump_profiler_csv(&self) -> DebuggerResult<String> {
        self.with_session(|session| Ok(session.emulator.profiler().dump_csv()))
    }

    /// Returns the simulated blockchain handle.
    pub fn blockchain(&self) -> DebuggerResult<Arc<Mutex<Blockchain>>> {
        self.with_session(|session| Ok(Arc::clone(&session.blockchain)))
    }

    fn with_session<T>(
        &self,
        operation: impl FnOnce(&mut Session) -> DebuggerResult<T>,
    ) -> DebuggerResult<T> {
        let mut guard = self.session.lock();
        let session = guard
            .as_mut()
            .ok_or_else(|| DebuggerError::load("no contract loaded"))?;
        operation(session)
    }
}

fn build_session(path: &Path) -> DebuggerResult<Session> {
    let neomap_path = path.with_extension("neomap");
    if neomap_path.exists() {
        return Err(DebuggerError::load(format!(
            "legacy map file {} found; recompile the contract to emit a .debug.json",
            neomap_path.display()
        )));
    }

    let bytes =
        fs::read(path).map_err(|err| DebuggerError::load(format!("{}: {err}", path.display())))?;
    let disassembler = Disassembler::new(&bytes)?;

    let abi_path = path.with_extension("abi.json");
    let abi = if abi_path.exists() {
        Some(ContractAbi::load(&abi_path)?)
    } else {
        None
    };

    let map_path = path.with_extension("debug.json");
    let mut debug_map = None;
    let mut source_text = None;
    let mut source_language = None;
    if map_path.exists() {
        let map = DebugMap::load(&map_path)?;
        if let Some(url) = map.first_url() {
            let source_path = resolve_source_path(path, url);
            source_text = Some(fs::read_to_string(&source_path).map_err(|err| {
                DebuggerError::load(format!(
                    "debug map references missing source {}: {err}",
                    source_path.display()
                ))
            })?);
            source_language = source_path
                .extension()
                .map(|extension| extension.to_string_lossy().into_owned());
        }
        debug_map = Some(map);
    }

    let chain_path = path.with_extension("chain");
    let blockchain = if chain_path.exists() {
        Blockchain::load(&chain_path)?
    } else {
        Blockchain::new()
    };
    let blockchain = Arc::new(Mutex::new(blockchain));

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "contract".to_string());
    let contract_hash = blockchain
        .lock()
        .deploy_contract(&name, bytes)
        .script_hash()
        .to_vec();

    let mut emulator = Emulator::new(Arc::clone(&blockchain), contract_hash);
    if let Some(source) = &source_text {
        emulator.profiler_mut().set_source(source);
    }

    let mode = if debug_map.is_some() {
        DebugMode::Source
    } else {
        DebugMode::Assembly
    };

    Ok(Session {
        chain_path,
        disassembler,
        abi,
        debug_map,
        source_text,
        source_language,
        blockchain,
        emulator,
        mode,
        args: Vec::new(),
        current_line: None,
        reset_flag: true,
    })
}

fn resolve_source_path(avm_path: &Path, url: &str) -> PathBuf {
    let source = Path::new(url);
    if source.is_absolute() {
        return source.to_path_buf();
    }
    match avm_path.parent() {
        Some(parent) => parent.join(source),
        None => source.to_path_buf(),
    }
}

fn resolve_offset(session: &Session, line: u32) -> Option<usize> {
    match session.mode {
        DebugMode::Source => session
            .debug_map
            .as_ref()
            .and_then(|map| map.resolve_offset(line)),
        DebugMode::Assembly => session.disassembler.offset_at_line(line),
    }
}

fn resolve_line(session: &Session, offset: usize) -> Option<u32> {
    match session.mode {
        DebugMode::Source => session
            .debug_map
            .as_ref()
            .and_then(|map| map.resolve_line(offset)),
        DebugMode::Assembly => session.disassembler.line_at_offset(offset),
    }
}

fn ensure_reset(session: &mut Session) -> DebuggerResult<()> {
    if session.reset_flag
        || session.emulator.last_state().kind == DebuggerStateKind::Invalid
    {
        session.emulator.reset(&session.args)?;
        session.reset_flag = false;
        session.current_line = None;
    }
    Ok(())
}

fn update_state(session: &mut Session, state: DebuggerState) -> StepResult {
    let line = resolve_line(session, state.offset);
    session.current_line = line;
    session.emulator.profiler_mut().set_current_line(line);

    match state.kind {
        DebuggerStateKind::Finished => {
            if let Err(err) = session.blockchain.lock().save(&session.chain_path) {
                tracing::error!(
                    path = %session.chain_path.display(),
                    error = %err,
                    "failed to persist chain"
                );
            }
            session.reset_flag = true;
        }
        DebuggerStateKind::Exception => {
            session.reset_flag = true;
        }
        _ => {}
    }

    StepResult { state, line }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn write_avm(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_load_and_run_simple_contract() {
        let dir = tempfile::tempdir().unwrap();
        // PUSH2 PUSH3 ADD RET
        let path = write_avm(dir.path(), "add.avm", &[0x52, 0x53, 0x93, 0x66]);

        let manager = DebugManager::new();
        manager.load_avm(&path).unwrap();
        assert!(manager.is_loaded());
        assert_eq!(manager.debug_mode().unwrap(), DebugMode::Assembly);

        let result = manager.run().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Finished);

        // The chain snapshot is persisted on Finished
        assert!(dir.path().join("add.chain").exists());
    }

    #[test]
    fn test_legacy_neomap_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_avm(dir.path(), "old.avm", &[0x51, 0x66]);
        fs::write(dir.path().join("old.neomap"), b"legacy").unwrap();

        let manager = DebugManager::new();
        let err = manager.load_avm(&path).unwrap_err();
        assert!(err.to_string().contains("recompile"));
        assert!(!manager.is_loaded());
    }

    #[test]
    fn test_failed_load_preserves_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_avm(dir.path(), "good.avm", &[0x51, 0x66]);
        // Truncated PUSHDATA1
        let bad = write_avm(dir.path(), "bad.avm", &[0x4C, 0x05]);

        let manager = DebugManager::new();
        manager.load_avm(&good).unwrap();
        assert!(manager.load_avm(&bad).is_err());
        assert!(manager.is_loaded());
        assert_eq!(manager.run().unwrap().state.kind, DebuggerStateKind::Finished);
    }

    #[test]
    fn test_breakpoint_by_assembly_line() {
        let dir = tempfile::tempdir().unwrap();
        // PUSH1 PUSH2 ADD PUSH3 MUL RET -> MUL is assembly line 5, offset 4
        let path = write_avm(dir.path(), "bp.avm", &[0x51, 0x52, 0x93, 0x53, 0x95, 0x66]);

        let manager = DebugManager::new();
        manager.load_avm(&path).unwrap();
        assert!(manager.add_breakpoint(5).unwrap());
        assert!(!manager.add_breakpoint(99).unwrap());

        let result = manager.run().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Break);
        assert_eq!(result.state.offset, 4);
        assert_eq!(result.line, Some(5));

        let result = manager.run().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Finished);
    }

    #[test]
    fn test_source_mode_with_debug_map() {
        let dir = tempfile::tempdir().unwrap();
        // PUSH1(0) PUSH2(1) ADD(2) PUSH3(3) MUL(4) RET(5)
        let path = write_avm(dir.path(), "src.avm", &[0x51, 0x52, 0x93, 0x53, 0x95, 0x66]);
        fs::write(
            dir.path().join("src.debug.json"),
            r#"[{"start": 0, "end": 2, "url": "src.py", "line": 10},
                {"start": 3, "end": 5, "url": "src.py", "line": 11}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("src.py"), "a = 1 + 2\nb = a * 3\n").unwrap();

        let manager = DebugManager::new();
        manager.load_avm(&path).unwrap();
        assert_eq!(manager.debug_mode().unwrap(), DebugMode::Source);
        assert_eq!(manager.source_language().unwrap().as_deref(), Some("py"));

        // Line 11 starts at offset 3
        assert!(manager.add_breakpoint(11).unwrap());
        let result = manager.run().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Break);
        assert_eq!(result.state.offset, 3);
        assert_eq!(result.line, Some(11));
    }

    #[test]
    fn test_missing_source_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_avm(dir.path(), "gone.avm", &[0x51, 0x66]);
        fs::write(
            dir.path().join("gone.debug.json"),
            r#"[{"start": 0, "end": 1, "url": "gone.py", "line": 1}]"#,
        )
        .unwrap();

        let manager = DebugManager::new();
        assert!(matches!(
            manager.load_avm(&path),
            Err(DebuggerError::Load { .. })
        ));
    }

    #[test]
    fn test_step_resets_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_avm(dir.path(), "loop.avm", &[0x53, 0x66]);

        let manager = DebugManager::new();
        manager.load_avm(&path).unwrap();

        let result = manager.run().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Finished);
        assert!((manager.used_gas().unwrap() - 0.001).abs() < 1e-12);

        // The next step resets first, then executes from the top
        let result = manager.step().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Running);
        assert_eq!(manager.state().unwrap().kind, DebuggerStateKind::Running);
    }

    #[test]
    fn test_set_debug_parameters_applies_args() {
        let dir = tempfile::tempdir().unwrap();
        // ADD RET
        let path = write_avm(dir.path(), "args.avm", &[0x93, 0x66]);

        let manager = DebugManager::new();
        manager.load_avm(&path).unwrap();
        manager
            .set_debug_parameters(DebugParameters {
                args: vec![
                    ContractArg::Int(BigInt::from(2)),
                    ContractArg::Int(BigInt::from(5)),
                ],
                ..Default::default()
            })
            .unwrap();

        let result = manager.run().unwrap();
        assert_eq!(result.state.kind, DebuggerStateKind::Finished);
    }

    #[test]
    fn test_toggle_debug_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_avm(dir.path(), "toggle.avm", &[0x51, 0x66]);

        let manager = DebugManager::new();
        manager.load_avm(&path).unwrap();
        assert_eq!(manager.debug_mode().unwrap(), DebugMode::Assembly);
        assert_eq!(manager.toggle_debug_mode().unwrap(), DebugMode::Source);
        assert_eq!(manager.toggle_debug_mode().unwrap(), DebugMode::Assembly);
    }
}

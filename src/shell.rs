use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use nix::unistd::isatty;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::{debug, info};

use crate::ast::Pipeline;
use crate::builtins::{self, Builtin};
use crate::completion::Completer;
use crate::config::ShellConfig;
use crate::executor::{ExecutionOutcome, Executor};
use crate::history::HistoryStore;
use crate::jobs::JobTable;
use crate::parser;
use crate::recall;
use crate::signals::{self, ShellEvent};
use crate::tokenizer::{self, Token};
use crate::types::{ShellError, ShellResult};
use crate::utils::{render_prompt, Identity};

/// Process-wide shell state, owned by the read loop.
pub struct Shell {
    config: ShellConfig,
    cmd_id: u64,
    cwd: PathBuf,
    identity: Identity,
    history: HistoryStore,
    jobs: JobTable,
    executor: Executor,
    events: Receiver<ShellEvent>,
    event_tx: Sender<ShellEvent>,
    executing: Arc<AtomicBool>,
    prompt_cache: Arc<Mutex<String>>,
}

enum Input {
    Line(String),
    Interrupted,
    Eof,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        let (event_tx, events) = mpsc::channel();
        let cwd = std::env::current_dir().unwrap_or_else(|_| config.home.clone());
        Self {
            history: HistoryStore::with_capacity(config.history_size),
            config,
            cmd_id: 0,
            cwd,
            identity: Identity::lookup(),
            jobs: JobTable::new(),
            executor: Executor::new(),
            events,
            event_tx,
            executing: Arc::new(AtomicBool::new(false)),
            prompt_cache: Arc::new(Mutex::new(String::new())),
        }
    }

    #[cfg(test)]
    pub fn cmd_id(&self) -> u64 {
        self.cmd_id
    }

    #[cfg(test)]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    #[cfg(test)]
    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Set while a foreground pipeline runs; read by the SIGINT handler.
    pub fn executing_flag(&self) -> Arc<AtomicBool> {
        self.executing.clone()
    }

    pub fn event_sender(&self) -> Sender<ShellEvent> {
        self.event_tx.clone()
    }

    pub fn prompt(&self) -> String {
        render_prompt(self.cmd_id, &self.identity, &self.cwd, &self.config.home)
    }

    /// Applies queued signal events. A child exit reaps every finished
    /// background child and drops its job.
    pub fn apply_events(&mut self) {
        let mut child_exited = false;
        while let Ok(event) = self.events.try_recv() {
            match event {
                ShellEvent::ChildExited => child_exited = true,
            }
        }
        if child_exited {
            let reaped = self.executor.reap(&mut self.jobs);
            if !reaped.is_empty() {
                debug!(?reaped, "reaped background children");
            }
        }
    }

    /// Handles one input line: history expansion, parsing, dispatch, and
    /// recording the line on success.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> ShellResult<ExecutionOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ExecutionOutcome::NoOp);
        }
        let id = self.cmd_id;
        self.cmd_id += 1;

        let line = recall::expand(line, &self.history)?;
        debug!(id, %line, "executing");

        let tokens = tokenizer::tokenize(&line)?
            .into_iter()
            .map(Token::expand)
            .collect::<Vec<_>>();
        let pipeline = parser::parse(tokens)?;

        let builtin = pipeline
            .stages
            .first()
            .and_then(|stage| stage.program())
            .and_then(Builtin::lookup);
        // `history` lists itself, so it is recorded before it runs
        let records_itself = builtin == Some(Builtin::History);
        if records_itself {
            self.history.append(id, &line);
        }

        let outcome = self.run(&pipeline, builtin, out)?;
        if !records_itself && outcome != ExecutionOutcome::NoOp {
            self.history.append(id, &line);
        }
        Ok(outcome)
    }

    fn run<W: Write>(
        &mut self,
        pipeline: &Pipeline,
        builtin: Option<Builtin>,
        out: &mut W,
    ) -> ShellResult<ExecutionOutcome> {
        if pipeline.is_empty() {
            return Ok(ExecutionOutcome::NoOp);
        }
        let args = &pipeline.stages[0].tokens[1..];

        match builtin {
            Some(Builtin::Cd) => {
                if let Some(cwd) = builtins::cd(args, &self.config.home) {
                    self.cwd = cwd;
                }
                Ok(ExecutionOutcome::Builtin)
            }
            Some(Builtin::Setenv) => {
                builtins::setenv(args);
                Ok(ExecutionOutcome::Builtin)
            }
            Some(Builtin::Jobs) => {
                self.executor.reap(&mut self.jobs);
                builtins::jobs(&self.jobs, out).map_err(|e| ShellError::io("jobs", e))?;
                Ok(ExecutionOutcome::Builtin)
            }
            Some(Builtin::History) => {
                builtins::history(&self.history, out).map_err(|e| ShellError::io("history", e))?;
                Ok(ExecutionOutcome::Builtin)
            }
            Some(Builtin::Exit) => Ok(ExecutionOutcome::Exit),
            None => {
                out.flush().map_err(|e| ShellError::io("flush stdout", e))?;
                self.executing.store(!pipeline.background, Ordering::SeqCst);
                let outcome = self.executor.execute(pipeline, &mut self.jobs);
                self.executing.store(false, Ordering::SeqCst);
                outcome
            }
        }
    }

    /// The interactive read loop. Returns on end of input; `exit` ends the
    /// process directly.
    pub fn run_loop(mut self) -> anyhow::Result<()> {
        signals::watch_children(self.event_sender()).context("failed to watch SIGCHLD")?;
        signals::install_interrupt_handler(self.executing_flag(), self.prompt_cache.clone())
            .context("failed to install SIGINT handler")?;

        let interactive = isatty(libc::STDIN_FILENO).unwrap_or(false);
        let mut editor = if interactive {
            let mut editor: Editor<Completer, DefaultHistory> =
                Editor::new().context("failed to create line editor")?;
            editor.set_helper(Some(Completer::new()));
            Some(editor)
        } else {
            None
        };
        info!(interactive, "pipesh started");

        loop {
            self.apply_events();
            let prompt = self.prompt();
            if let Ok(mut cached) = self.prompt_cache.lock() {
                cached.clone_from(&prompt);
            }

            let line = match read_input(editor.as_mut(), &prompt) {
                Ok(Input::Line(line)) => line,
                Ok(Input::Interrupted) => continue,
                Ok(Input::Eof) => break,
                Err(e) => {
                    eprintln!("pipesh: {e}");
                    continue;
                }
            };
            if let Some(editor) = editor.as_mut() {
                let _ = editor.add_history_entry(line.as_str());
            }

            // built-ins lock stdout per write, leaving it free for the SIGINT handler
            let mut out = io::stdout();
            match self.handle_line(&line, &mut out) {
                Ok(ExecutionOutcome::Exit) => {
                    info!("exit");
                    let _ = out.flush();
                    std::process::exit(0);
                }
                Ok(outcome) => debug!(?outcome, "command finished"),
                Err(e) => eprintln!("pipesh: {e}"),
            }
            let _ = out.flush();
        }

        info!("end of input");
        Ok(())
    }
}

fn read_input(
    editor: Option<&mut Editor<Completer, DefaultHistory>>,
    prompt: &str,
) -> ShellResult<Input> {
    let Some(editor) = editor else {
        let line = read_line_lossy(&mut io::stdin().lock())
            .map_err(|e| ShellError::io("read stdin", e))?;
        return Ok(line.map_or(Input::Eof, Input::Line));
    };

    match editor.readline(prompt) {
        Ok(line) => Ok(Input::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
        Err(ReadlineError::Eof) => Ok(Input::Eof),
        Err(e) => Err(e.into()),
    }
}

/// Reads one line of raw bytes. Invalid UTF-8 is replaced, not rejected;
/// `None` at end of input.
pub(crate) fn read_line_lossy<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

use std::fs;
use tempfile::NamedTempFile;

use super::{run, shell};
use crate::executor::{ExecutionOutcome, Executor, EXEC_FAILURE_STATUS};
use crate::jobs::JobTable;
use crate::parser::parse;
use crate::tokenizer::{tokenize, Token};
use crate::types::ShellError;

fn pipeline(line: &str) -> crate::ast::Pipeline {
    let tokens = tokenize(line).unwrap().into_iter().map(Token::expand);
    parse(tokens).unwrap()
}

#[test]
fn test_pipeline_wiring() {
    let mut shell = shell();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let cmd = format!("echo hello | tr a-z A-Z > {}", path);
    let outcome = run(&mut shell, &cmd).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 0 });
    assert_eq!(fs::read_to_string(path).unwrap(), "HELLO\n");
}

#[test]
fn test_multiple_pipes() {
    let mut shell = shell();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let cmd = format!("printf 'b\\na\\nb\\n' | sort | uniq -c | wc -l > {}", path);
    run(&mut shell, &cmd).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap().trim(), "2");
}

#[test]
fn test_large_output_through_pipe() {
    // more than a pipe buffer, so the writer blocks until the reader drains it
    let mut shell = shell();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let cmd = format!("seq 1 100000 | tail -n 1 > {}", path);
    run(&mut shell, &cmd).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap().trim(), "100000");
}

#[test]
fn test_early_exit_reader_does_not_hang() {
    let mut shell = shell();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let cmd = format!("yes | head -n 3 > {}", path);
    let outcome = run(&mut shell, &cmd).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 0 });
    assert_eq!(fs::read_to_string(path).unwrap(), "y\ny\ny\n");
}

#[test]
fn test_terminal_stage_status() {
    let mut executor = Executor::new();
    let mut jobs = JobTable::new();

    let outcome = executor.execute(&pipeline("false"), &mut jobs).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 1 });

    let outcome = executor.execute(&pipeline("sh -c 'exit 3'"), &mut jobs).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 3 });

    let outcome = executor.execute(&pipeline("false | true"), &mut jobs).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 0 });

    let outcome = executor.execute(&pipeline("sh -c 'kill -9 $$'"), &mut jobs).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 128 + 9 });
    assert!(executor.detached().is_empty());
}

#[test]
fn test_command_not_found_is_an_exit_status() {
    let mut shell = shell();

    let outcome = run(&mut shell, "pipesh-no-such-program --flag").unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: EXEC_FAILURE_STATUS });

    let outcome = run(&mut shell, "echo hi | pipesh-no-such-program").unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: EXEC_FAILURE_STATUS });

    // the shell keeps going
    let outcome = run(&mut shell, "true").unwrap();
    assert_eq!(outcome, ExecutionOutcome::Foreground { status: 0 });
}

#[test]
fn test_variables_are_expanded_before_exec() {
    let mut shell = shell();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    run(&mut shell, "setenv PIPESH_PIPELINE_VAR expanded").unwrap();
    let cmd = format!("echo $PIPESH_PIPELINE_VAR '$PIPESH_PIPELINE_VAR' > {}", path);
    run(&mut shell, &cmd).unwrap();
    assert_eq!(
        fs::read_to_string(path).unwrap(),
        "expanded $PIPESH_PIPELINE_VAR\n"
    );

    // children see the variable too
    let cmd = format!("sh -c 'echo $PIPESH_PIPELINE_VAR' > {}", path);
    run(&mut shell, &cmd).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "expanded\n");
}

#[test]
fn test_pipeline_errors() {
    let mut shell = shell();

    for line in ["echo hello |", "| echo hello", "echo a | | wc", "echo >"] {
        let result = run(&mut shell, line);
        assert!(
            matches!(result, Err(ShellError::Syntax(_))),
            "{line:?} gave {result:?}"
        );
    }
    assert!(shell.history().is_empty());
}

#[test]
fn test_empty_and_comment_lines_are_noops() {
    let mut shell = shell();
    assert_eq!(run(&mut shell, "").unwrap(), ExecutionOutcome::NoOp);
    assert_eq!(run(&mut shell, "   ").unwrap(), ExecutionOutcome::NoOp);
    assert_eq!(run(&mut shell, "# just a note").unwrap(), ExecutionOutcome::NoOp);
    assert!(shell.history().is_empty());
}

#[test]
fn test_nul_in_argument_is_rejected() {
    let mut executor = Executor::new();
    let mut jobs = JobTable::new();
    let mut bad = pipeline("echo x");
    bad.stages[0].tokens[1] = "a\0b".into();
    assert!(matches!(
        executor.execute(&bad, &mut jobs),
        Err(ShellError::Syntax(_))
    ));
}

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use termgate_core::command::Builtin;
use termgate_core::path::normalize;
use termgate_core::{
    Capabilities, DisabledBridge, ExecOptions, ExecOutcome, Executor, FixedAnswer, Session,
};

fn executor() -> Executor {
    Executor::new(
        Capabilities::none(),
        Arc::new(DisabledBridge),
        Duration::from_secs(10),
    )
}

async fn run(executor: &Executor, session: &mut Session, line: &str) -> String {
    let confirm = FixedAnswer(false);
    executor
        .execute_line(session, line, ExecOptions::interactive(&confirm))
        .await
}

#[tokio::test]
async fn test_every_builtin_without_arguments_returns_text() {
    let executor = executor();
    let confirm = FixedAnswer(false);

    for builtin in Builtin::all() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path());
        let outcome = executor
            .execute(&mut session, builtin.name(), ExecOptions::remote(&confirm))
            .await;
        match builtin {
            Builtin::Clear => assert_eq!(outcome, ExecOutcome::ClearScreen),
            _ => assert!(matches!(outcome, ExecOutcome::Output(_)), "{}", builtin.name()),
        }
    }
}

#[tokio::test]
async fn test_empty_directory_reports_sentinel() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::new(dir.path());
    assert_eq!(run(&executor(), &mut session, "ls").await, "[Empty Directory]");
}

#[tokio::test]
async fn test_cd_then_pwd_reports_normalized_path() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(run(&executor, &mut session, "cd a/./b/..").await, "");
    assert_eq!(
        run(&executor, &mut session, "pwd").await,
        normalize(&dir.path().join("a")).display().to_string()
    );

    run(&executor, &mut session, "cd").await;
    let home = dirs::home_dir().unwrap();
    assert_eq!(
        run(&executor, &mut session, "pwd").await,
        normalize(&home).display().to_string()
    );
}

#[tokio::test]
async fn test_mkdir_ls_rm_cycle() {
    let dir = TempDir::new().unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(
        run(&executor, &mut session, "mkdir foo").await,
        "Created directory 'foo'"
    );
    assert!(run(&executor, &mut session, "ls").await.contains("foo"));

    assert_eq!(run(&executor, &mut session, "rm -r foo").await, "Removed dir 'foo'");
    assert!(!run(&executor, &mut session, "ls").await.contains("foo"));

    assert_eq!(
        run(&executor, &mut session, "rm foo").await,
        "rm: foo: No such file or directory"
    );
    assert_eq!(run(&executor, &mut session, "rm -f foo").await, "");
}

#[tokio::test]
async fn test_touch_creates_and_preserves_content() {
    let dir = TempDir::new().unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(run(&executor, &mut session, "touch a.txt").await, "Touched 'a.txt'");
    assert_eq!(fs::metadata(dir.path().join("a.txt")).unwrap().len(), 0);

    fs::write(dir.path().join("a.txt"), "kept").unwrap();
    assert_eq!(run(&executor, &mut session, "touch a.txt").await, "Touched 'a.txt'");
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "kept");
}

#[tokio::test]
async fn test_cp_into_directory_and_mv_with_many_sources() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a"), "alpha").unwrap();
    fs::write(dir.path().join("c"), "gamma").unwrap();
    fs::create_dir(dir.path().join("b")).unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(run(&executor, &mut session, "cp a b").await, "Copied 'a' -> 'b'");
    assert_eq!(fs::read_to_string(dir.path().join("b/a")).unwrap(), "alpha");

    assert_eq!(
        run(&executor, &mut session, "mv a c missing").await,
        "mv: target 'missing' is not a directory"
    );
    assert_eq!(
        run(&executor, &mut session, "mv a c b").await,
        "Moved 'a' -> 'b'\nMoved 'c' -> 'b'"
    );
    assert!(dir.path().join("b/c").exists());
    assert!(!dir.path().join("a").exists());
}

#[tokio::test]
async fn test_quoting_and_parse_errors() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("my file"), "spaced").unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(run(&executor, &mut session, "cat 'my file'").await, "spaced");
    let text = run(&executor, &mut session, "cat \"foo").await;
    assert!(text.starts_with("Parse error: "), "{}", text);
}

#[tokio::test]
async fn test_unknown_verb_is_command_not_found() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::new(dir.path());
    assert_eq!(
        run(&executor(), &mut session, "fooobarbaz").await,
        "fooobarbaz: command not found"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_programs_run_in_session_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("inner")).unwrap();
    fs::write(dir.path().join("inner/marker"), "").unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    run(&executor, &mut session, "cd inner").await;
    assert_eq!(run(&executor, &mut session, "sh -c 'ls'").await.trim(), "marker");
}

#[tokio::test]
async fn test_history_records_parse_failures_but_not_blank_lines() {
    let dir = TempDir::new().unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(run(&executor, &mut session, "").await, "");
    assert_eq!(run(&executor, &mut session, "   ").await, "");
    assert!(session.history.is_empty());

    run(&executor, &mut session, "pwd").await;
    run(&executor, &mut session, "echo 'oops").await;
    assert_eq!(
        run(&executor, &mut session, "history").await,
        "1 pwd\n2 echo 'oops\n3 history"
    );
}

#[tokio::test]
async fn test_exit_only_terminates_interactive_sessions() {
    let dir = TempDir::new().unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());
    let confirm = FixedAnswer(false);

    let outcome = executor
        .execute(&mut session, "exit", ExecOptions::interactive(&confirm))
        .await;
    assert_eq!(outcome, ExecOutcome::Terminate);

    let outcome = executor
        .execute(&mut session, "exit", ExecOptions::remote(&confirm))
        .await;
    assert_ne!(outcome, ExecOutcome::Terminate);
}

#[tokio::test]
async fn test_rm_interactive_follows_confirm_policy() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("victim"), "").unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    let decline = FixedAnswer(false);
    executor
        .execute(&mut session, "rm -i victim", ExecOptions::remote(&decline))
        .await;
    assert!(dir.path().join("victim").exists());

    let accept = FixedAnswer(true);
    let text = executor
        .execute_line(&mut session, "rm -i victim", ExecOptions::remote(&accept))
        .await;
    assert_eq!(text, "Removed 'victim'");
}

#[tokio::test]
async fn test_monitoring_without_metrics_is_explicit() {
    let dir = TempDir::new().unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    for verb in ["top", "cpu", "mem", "uptime"] {
        let text = run(&executor, &mut session, verb).await;
        assert!(text.contains("unavailable"), "{}: {}", verb, text);
    }
}

#[tokio::test]
async fn test_cp_never_copies_onto_or_into_itself() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "precious data").unwrap();
    fs::create_dir(dir.path().join("d")).unwrap();
    fs::write(dir.path().join("d/f"), "x").unwrap();
    let executor = executor();
    let mut session = Session::new(dir.path());

    assert_eq!(
        run(&executor, &mut session, "cp a.txt .").await,
        "cp: 'a.txt' and '.' are the same file"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "precious data"
    );

    assert_eq!(
        run(&executor, &mut session, "cp d d").await,
        "cp: cannot copy a directory, 'd', into itself"
    );
    assert!(!dir.path().join("d/d").exists());

    // The session survives and keeps working.
    assert_eq!(run(&executor, &mut session, "ls d").await, "f");
}

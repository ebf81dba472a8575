use archweave_core::db::Database;
use archweave_core::persistence::keys;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    /// Isolated environment whose generation service is unreachable.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(xdg_config.join("archweave")).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        fs::write(
            xdg_config.join("archweave/config.toml"),
            "[generation]\nbase_url = \"http://127.0.0.1:9\"\ntimeout_secs = 2\n",
        )
        .expect("failed to write config");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("archweave/state.db")
    }
}

fn run(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("archweave"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("ARCHWEAVE_AUTH_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute archweave: {e}"))
}

fn run_ok(env: &CliTestEnv, args: &[&str]) -> String {
    let output = run(env, args);
    if !output.status.success() {
        let rendered_args = args
            .iter()
            .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        panic!(
            "archweave {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn project_lifecycle_persists_between_runs() {
    let env = CliTestEnv::new();

    assert!(run_ok(&env, &["project", "list"]).contains("No projects."));

    let created = run_ok(&env, &["project", "new", "Checkout"]);
    assert!(created.starts_with("Created project Checkout ("));

    let listed = run_ok(&env, &["project", "list", "--json"]);
    assert!(listed.contains("\"name\": \"Checkout\""));
    assert!(env.db_path().exists());

    let db = Database::open(&env.db_path()).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    let raw = db
        .read_blob(keys::PROJECTS)
        .expect("failed to read projects")
        .expect("projects were not persisted");
    assert!(raw.contains("\"createdAt\""));
    drop(db);

    run_ok(&env, &["project", "delete", "Checkout"]);
    assert!(run_ok(&env, &["project", "list"]).contains("No projects."));
}

#[test]
fn blank_project_name_is_a_quiet_no_op() {
    let env = CliTestEnv::new();

    let output = run_ok(&env, &["project", "new", "   "]);
    assert!(output.contains("Nothing to create: project name is empty."));
    assert!(run_ok(&env, &["project", "list"]).contains("No projects."));

    let status = run_ok(&env, &["status"]);
    assert!(status.contains("Projects:        0"));
    assert!(status.contains("Stored docs:     none"));
}

#[test]
fn offline_conversation_degrades_to_fallback() {
    let env = CliTestEnv::new();
    run_ok(&env, &["project", "new", "Shop"]);

    let output = run(&env, &["arch", "send", "Shop", "design", "a", "store"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.starts_with("# Software Architecture Design"));
    assert!(stdout.contains("\"design a store\""));
    assert!(!stdout.contains("Solution to Your Question"));
    assert!(stderr.contains("fallback"));

    let diagrams = run_ok(&env, &["arch", "show", "Shop", "--last", "--view", "diagrams"]);
    assert!(diagrams.trim_start().starts_with("```mermaid"));

    let prompts = run_ok(&env, &["arch", "show", "Shop", "--role", "user"]);
    assert!(prompts.contains("user design a store"));
    assert!(!prompts.contains("Software Architecture Design"));
    let bad_role = run(&env, &["arch", "show", "Shop", "--role", "system"]);
    assert!(!bad_role.status.success());

    let status = run_ok(&env, &["status"]);
    assert!(status.contains("Projects:        1"));
    assert!(status.contains("context: yes"));
    assert!(status.contains("architectureContext"));
    assert!(status.contains("projectChats"));

    let threads = run_ok(&env, &["issue", "threads", "Shop"]);
    assert!(threads.contains("New Chat"));

    let answer = run_ok(&env, &["issue", "send", "Shop", "0", "how to scale?"]);
    assert!(answer.contains("**Note**"));

    let threads = run_ok(&env, &["issue", "threads", "Shop"]);
    assert!(threads.contains("how to scale?"));
    assert!(threads.contains("2 message(s)"));

    let replies = run_ok(&env, &["issue", "show", "Shop", "0", "--role", "assistant"]);
    assert!(replies.contains("assistant > **Note**"));
    assert!(!replies.contains("user how to scale?"));

    let reset = run_ok(&env, &["issue", "reset", "Shop"]);
    assert!(reset.contains("New Chat"));
    assert!(reset.contains("0 message(s)"));
}

#[test]
fn enhance_offline_uses_template() {
    let env = CliTestEnv::new();

    let enhanced = run_ok(&env, &["enhance", "a", "chat", "app"]);
    assert!(enhanced.starts_with("Please design a comprehensive software architecture for: a chat app"));
}

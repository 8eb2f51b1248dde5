//! Integration tests for winbar against a fake i3 IPC server.
//!
//! The fake server listens on a Unix socket in a temporary directory and
//! answers GET_TREE, SUBSCRIBE and RUN_COMMAND the way i3 does. Tests run the
//! real `winbar` and `winbar-focus` binaries against it.
//!
//! Run with: RUST_LOG=debug cargo test --test integration

use std::io::{BufRead, BufReader, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);
const FOCUS_CMD: &str = "/opt/winbar/winbar-focus";
const EVENT_WORKSPACE: u32 = 1 << 31;
const EVENT_WINDOW: u32 = (1 << 31) | 3;

const CONFIG: &str = r#"
[general]
click_command = "/opt/winbar/winbar-focus"

[[icons]]
match = "class=Signal"
glyph = "S"

[[icons]]
match = "*"
glyph = "W"

[[formatters]]
class = "Firefox"
strip = " - Mozilla Firefox"
"#;

fn write_frame(stream: &mut UnixStream, message_type: u32, payload: &[u8]) -> std::io::Result<()> {
    let mut frame = Vec::new();
    frame.extend_from_slice(b"i3-ipc");
    frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&message_type.to_ne_bytes());
    frame.extend_from_slice(payload);
    stream.write_all(&frame)?;
    stream.flush()
}

fn read_frame(stream: &mut UnixStream) -> std::io::Result<(u32, Vec<u8>)> {
    let mut header = [0u8; 14];
    stream.read_exact(&mut header)?;
    assert_eq!(&header[..6], b"i3-ipc");
    let length = u32::from_ne_bytes([header[6], header[7], header[8], header[9]]);
    let message_type = u32::from_ne_bytes([header[10], header[11], header[12], header[13]]);
    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload)?;
    Ok((message_type, payload))
}

/// Shared state of the fake window manager
#[derive(Default)]
struct FakeState {
    tree: Value,
    subscribers: Vec<UnixStream>,
    commands: Vec<String>,
}

/// Fake i3 listening on a socket in a temporary directory
struct FakeI3 {
    _dir: TempDir,
    socket_path: PathBuf,
    config_path: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

impl FakeI3 {
    fn start(tree: Value) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let socket_path = dir.path().join("ipc.sock");
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, CONFIG).expect("write config");

        let listener = UnixListener::bind(&socket_path).expect("bind fake i3 socket");
        let state = Arc::new(Mutex::new(FakeState {
            tree,
            ..FakeState::default()
        }));

        let server_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let state = Arc::clone(&server_state);
                thread::spawn(move || serve(stream, state));
            }
        });

        Self {
            _dir: dir,
            socket_path,
            config_path,
            state,
        }
    }

    fn set_tree(&self, tree: Value) {
        self.state.lock().unwrap().tree = tree;
    }

    fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Send an event to every subscribed connection
    fn broadcast(&self, event_type: u32, payload: Value) {
        let payload = payload.to_string();
        let mut state = self.state.lock().unwrap();
        for stream in state.subscribers.iter_mut() {
            write_frame(stream, event_type, payload.as_bytes()).expect("send event");
        }
    }

    /// Close every subscribed connection, as if i3 exited
    fn disconnect_subscribers(&self) {
        let mut state = self.state.lock().unwrap();
        for stream in state.subscribers.drain(..) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn wait_for_subscriber(&self) {
        let start = Instant::now();
        while self.subscriber_count() == 0 {
            assert!(start.elapsed() < TIMEOUT, "winbar never subscribed");
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn serve(mut stream: UnixStream, state: Arc<Mutex<FakeState>>) {
    while let Ok((message_type, payload)) = read_frame(&mut stream) {
        let reply = match message_type {
            // RUN_COMMAND
            0 => {
                let command = String::from_utf8_lossy(&payload).to_string();
                let success = !command.contains("con_id=404");
                state.lock().unwrap().commands.push(command);
                if success {
                    json!([{ "success": true }])
                } else {
                    json!([{ "success": false, "error": "No window matches given criteria" }])
                }
            }
            // SUBSCRIBE: register before replying so no event can be missed
            2 => {
                let events: Vec<String> = serde_json::from_slice(&payload).unwrap_or_default();
                assert_eq!(events, vec!["workspace", "window"]);
                let subscriber = stream.try_clone().expect("clone subscriber stream");
                state.lock().unwrap().subscribers.push(subscriber);
                json!({ "success": true })
            }
            // GET_TREE
            4 => state.lock().unwrap().tree.clone(),
            other => panic!("unexpected message type {}", other),
        };
        if write_frame(&mut stream, message_type, reply.to_string().as_bytes()).is_err() {
            break;
        }
    }
}

fn leaf(id: u64, class: &str, name: &str, focused: bool, urgent: bool) -> Value {
    json!({
        "id": id,
        "type": "con",
        "name": name,
        "focused": focused,
        "urgent": urgent,
        "window_properties": { "class": class },
        "nodes": []
    })
}

fn workspace(id: u64, name: &str, windows: Vec<Value>) -> Value {
    json!({ "id": id, "type": "workspace", "name": name, "nodes": windows })
}

fn root(workspaces: Vec<Value>) -> Value {
    json!({
        "id": 1,
        "type": "root",
        "name": "root",
        "nodes": [{
            "id": 2,
            "type": "output",
            "name": "eDP-1",
            "nodes": [
                {
                    "id": 3,
                    "type": "dockarea",
                    "name": "topdock",
                    "nodes": [leaf(4, "Lemonbar", "bar", false, false)]
                },
                { "id": 5, "type": "con", "name": "content", "nodes": workspaces }
            ]
        }]
    })
}

/// Signal on workspace 2 (urgent), Firefox on workspace 1 (focused)
fn initial_tree() -> Value {
    root(vec![
        workspace(10, "2", vec![leaf(11, "Signal", "chat", false, true)]),
        workspace(20, "1", vec![leaf(21, "Firefox", "Docs - Mozilla Firefox", true, false)]),
    ])
}

fn entry(id: u64, underline: &str, glyph: &str, title: &str, focused: bool) -> String {
    let mut label = format!("%{{T3}}{}%{{T-}}  {}", glyph, title);
    if focused {
        label = format!("%{{F#fff}}{}%{{F}}", label);
    }
    format!(
        "%{{u{}}} %{{A1:{} {}:}}{}%{{A}} %{{u-}}",
        underline, FOCUS_CMD, id, label
    )
}

fn winbar(fake: &FakeI3) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_winbar"));
    command
        .arg("--config")
        .arg(&fake.config_path)
        .arg("--socket")
        .arg(&fake.socket_path)
        .env("RUST_LOG", "debug")
        .env_remove("I3SOCK")
        .env_remove("SWAYSOCK");
    command
}

/// Running winbar whose stdout lines arrive on a channel
struct BarProcess {
    child: Child,
    lines: Receiver<String>,
}

impl BarProcess {
    fn spawn(fake: &FakeI3) -> Self {
        let mut child = winbar(fake)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn winbar");
        let stdout = child.stdout.take().expect("winbar stdout");
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { child, lines }
    }

    fn next_line(&self) -> String {
        self.lines
            .recv_timeout(TIMEOUT)
            .expect("winbar printed no line in time")
    }

    fn wait_exit(&mut self) -> std::process::ExitStatus {
        let start = Instant::now();
        loop {
            if let Some(status) = self.child.try_wait().expect("poll winbar") {
                return status;
            }
            assert!(start.elapsed() < TIMEOUT, "winbar did not exit");
            thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for BarProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn expected_initial_line() -> String {
    format!(
        "{}%{{O12}}{}",
        entry(21, "#b4619a", "W", "Docs", true),
        entry(11, "#e84f4f", "S", "chat", false)
    )
}

#[test]
fn test_once_prints_sorted_line() {
    let fake = FakeI3::start(initial_tree());

    let output = winbar(&fake).arg("--once").output().expect("run winbar");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, format!("{}\n", expected_initial_line()));
}

#[test]
fn test_once_with_no_windows_prints_empty_line() {
    let fake = FakeI3::start(root(vec![workspace(10, "1", Vec::new())]));

    let output = winbar(&fake).arg("--once").output().expect("run winbar");

    assert!(output.status.success());
    assert_eq!(output.stdout, b"\n");
}

#[test]
fn test_check_config_rejects_missing_wildcard() {
    let fake = FakeI3::start(initial_tree());
    std::fs::write(
        &fake.config_path,
        "[[icons]]\nmatch = \"class=Signal\"\nglyph = \"S\"\n",
    )
    .unwrap();

    let output = winbar(&fake).arg("--check-config").output().expect("run winbar");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_check_config_accepts_valid_config() {
    let fake = FakeI3::start(initial_tree());

    let output = winbar(&fake).arg("--check-config").output().expect("run winbar");

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_rerenders_on_each_event() {
    let fake = FakeI3::start(initial_tree());
    let bar = BarProcess::spawn(&fake);

    assert_eq!(bar.next_line(), expected_initial_line());
    fake.wait_for_subscriber();

    // Focus moves to the Signal window on workspace 2
    fake.set_tree(root(vec![
        workspace(10, "2", vec![leaf(11, "Signal", "chat", true, false)]),
        workspace(20, "1", vec![leaf(21, "Firefox", "Docs - Mozilla Firefox", false, false)]),
    ]));
    fake.broadcast(EVENT_WORKSPACE, json!({ "change": "focus" }));
    assert_eq!(
        bar.next_line(),
        format!(
            "{}%{{O12}}{}",
            entry(21, "#404040", "W", "Docs", false),
            entry(11, "#b4619a", "S", "chat", true)
        )
    );

    // Ignored workspace event, then a title change renders exactly once
    fake.set_tree(root(vec![
        workspace(10, "2", vec![leaf(11, "Signal", "new message", true, false)]),
        workspace(20, "1", vec![leaf(21, "Firefox", "Docs - Mozilla Firefox", false, false)]),
    ]));
    fake.broadcast(EVENT_WORKSPACE, json!({ "change": "empty" }));
    fake.broadcast(EVENT_WINDOW, json!({ "change": "title" }));
    assert_eq!(
        bar.next_line(),
        format!(
            "{}%{{O12}}{}",
            entry(21, "#404040", "W", "Docs", false),
            entry(11, "#b4619a", "S", "new mes...", true)
        )
    );

    // Window focus event: same tree, identical line
    fake.broadcast(EVENT_WINDOW, json!({ "change": "focus" }));
    let repeated = bar.next_line();
    assert!(repeated.contains("new mes..."));
    assert!(bar.lines.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_exits_when_connection_lost() {
    let fake = FakeI3::start(initial_tree());
    let mut bar = BarProcess::spawn(&fake);

    assert_eq!(bar.next_line(), expected_initial_line());
    fake.wait_for_subscriber();
    fake.disconnect_subscribers();

    let status = bar.wait_exit();
    assert!(!status.success());
}

#[test]
fn test_exits_without_socket() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, CONFIG).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_winbar"))
        .arg("--config")
        .arg(&config_path)
        .arg("--socket")
        .arg(dir.path().join("missing.sock"))
        .output()
        .expect("run winbar");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

fn focus_command(socket: &Path, window: &str) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_winbar-focus"))
        .arg("--socket")
        .arg(socket)
        .arg(window)
        .output()
        .expect("run winbar-focus")
}

#[test]
fn test_focus_sends_con_id_command() {
    let fake = FakeI3::start(initial_tree());

    let output = focus_command(&fake.socket_path, "21");
    assert!(output.status.success());

    let output = focus_command(&fake.socket_path, "0xb");
    assert!(output.status.success());

    assert_eq!(
        fake.commands(),
        vec!["[con_id=21] focus".to_string(), "[con_id=11] focus".to_string()]
    );
}

#[test]
fn test_focus_reports_failure() {
    let fake = FakeI3::start(initial_tree());

    let output = focus_command(&fake.socket_path, "404");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No window matches"));
}

#[test]
fn test_focus_rejects_bad_id() {
    let fake = FakeI3::start(initial_tree());

    let output = focus_command(&fake.socket_path, "not-a-window");

    assert!(!output.status.success());
    assert!(fake.commands().is_empty());
}

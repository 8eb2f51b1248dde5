//! i3 IPC client.
//!
//! Speaks the binary-framed JSON protocol i3 (and sway) expose on a Unix
//! socket. Every message is the magic string `i3-ipc`, a native-endian `u32`
//! payload length, a native-endian `u32` message type, then the payload.
//!
//! Two connections are used by the bar: one for `GET_TREE` requests and one
//! that is switched to event mode by `SUBSCRIBE`.

use std::io::{BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::event::{ChangeEvent, ChangeHandler, ChangeSource, TreeSource};
use crate::tree::Node;
use crate::types::WindowAttributes;

pub const MAGIC: &[u8; 6] = b"i3-ipc";

const HEADER_LEN: usize = MAGIC.len() + 8;

/// Set on the message type of every event
pub const EVENT_MASK: u32 = 1 << 31;

/// Largest payload accepted from the peer (64 MiB)
pub const MAX_PAYLOAD_LEN: u32 = 64 * 1024 * 1024;

/// Request message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    RunCommand = 0,
    Subscribe = 2,
    GetTree = 4,
}

/// Event types, without [`EVENT_MASK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Workspace,
    Window,
    Other(u32),
}

impl EventType {
    pub fn from_code(code: u32) -> Self {
        match code & !EVENT_MASK {
            0 => EventType::Workspace,
            3 => EventType::Window,
            other => EventType::Other(other),
        }
    }
}

/// Locate the IPC socket.
///
/// Order: the explicit path, `I3SOCK`, `SWAYSOCK`, then `i3 --get-socketpath`.
pub fn socket_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    for var in ["I3SOCK", "SWAYSOCK"] {
        if let Some(path) = std::env::var_os(var).filter(|value| !value.is_empty()) {
            return Ok(PathBuf::from(path));
        }
    }

    let output = Command::new("i3")
        .arg("--get-socketpath")
        .output()
        .context("run i3 --get-socketpath")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("i3 --get-socketpath failed: {}", stderr.trim());
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        bail!("i3 --get-socketpath printed nothing");
    }
    Ok(PathBuf::from(path))
}

/// Write one framed message.
pub fn write_message(writer: &mut impl Write, message_type: u32, payload: &[u8]) -> Result<()> {
    let length = u32::try_from(payload.len()).context("IPC payload too large")?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&length.to_ne_bytes());
    frame.extend_from_slice(&message_type.to_ne_bytes());
    frame.extend_from_slice(payload);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed message, returning its type and payload.
pub fn read_message(reader: &mut impl Read) -> Result<(u32, Vec<u8>)> {
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .context("read IPC message header")?;
    if &header[..MAGIC.len()] != MAGIC {
        bail!("invalid IPC magic {:?}", &header[..MAGIC.len()]);
    }
    let length = u32::from_ne_bytes([header[6], header[7], header[8], header[9]]);
    let message_type = u32::from_ne_bytes([header[10], header[11], header[12], header[13]]);
    if length > MAX_PAYLOAD_LEN {
        bail!(
            "IPC payload of {} bytes exceeds limit of {} bytes",
            length,
            MAX_PAYLOAD_LEN
        );
    }

    let mut payload = vec![0u8; length as usize];
    reader
        .read_exact(&mut payload)
        .context("read IPC message payload")?;
    Ok((message_type, payload))
}

/// Outcome of one command in a `RUN_COMMAND` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscribeReply {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    change: String,
}

/// Request/reply connection to the window manager.
pub struct I3Connection {
    stream: UnixStream,
}

impl I3Connection {
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("connect to i3 IPC socket {:?}", path))?;
        log::info!("Connected to i3 IPC at {:?}", path);
        Ok(Self { stream })
    }

    fn request(&mut self, message_type: MessageType, payload: &str) -> Result<Vec<u8>> {
        write_message(&mut self.stream, message_type as u32, payload.as_bytes())
            .with_context(|| format!("send {:?} request", message_type))?;
        let (reply_type, reply) = read_message(&mut self.stream)?;
        if reply_type != message_type as u32 {
            bail!(
                "expected {:?} reply, got message type {}",
                message_type,
                reply_type
            );
        }
        Ok(reply)
    }

    /// Fetch the full layout tree.
    pub fn get_tree(&mut self) -> Result<Node> {
        let reply = self.request(MessageType::GetTree, "")?;
        serde_json::from_slice(&reply).context("parse GET_TREE reply")
    }

    /// Run a command string, returning one outcome per command.
    pub fn run_command(&mut self, command: &str) -> Result<Vec<CommandOutcome>> {
        log::debug!("Running command: {}", command);
        let reply = self.request(MessageType::RunCommand, command)?;
        serde_json::from_slice(&reply).context("parse RUN_COMMAND reply")
    }

    /// Switch this connection to event mode.
    pub fn subscribe(mut self, events: &[&str]) -> Result<EventStream> {
        let payload = serde_json::to_string(events)?;
        let reply = self.request(MessageType::Subscribe, &payload)?;
        let reply: SubscribeReply =
            serde_json::from_slice(&reply).context("parse SUBSCRIBE reply")?;
        if !reply.success {
            bail!("i3 rejected subscription to {:?}", events);
        }
        log::info!("Subscribed to {:?} events", events);
        Ok(EventStream {
            reader: BufReader::new(self.stream),
        })
    }
}

/// A raw event read from a subscribed connection.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub event_type: EventType,
    pub payload: Vec<u8>,
}

impl RawEvent {
    /// Map to a render trigger; `None` for events the bar ignores.
    pub fn to_change(&self) -> Result<Option<ChangeEvent>> {
        let change = match self.event_type {
            EventType::Workspace | EventType::Window => {
                let payload: ChangePayload = serde_json::from_slice(&self.payload)
                    .context("parse event payload")?;
                payload.change
            }
            EventType::Other(_) => return Ok(None),
        };
        let event = match self.event_type {
            EventType::Workspace if change == "focus" => Some(ChangeEvent::WorkspaceFocus),
            EventType::Workspace => None,
            EventType::Window if change == "focus" => Some(ChangeEvent::WindowFocus),
            EventType::Window => Some(ChangeEvent::Window { change }),
            EventType::Other(_) => None,
        };
        Ok(event)
    }
}

/// Event side of a subscribed connection.
pub struct EventStream {
    reader: BufReader<UnixStream>,
}

impl EventStream {
    /// Block until the next event arrives.
    pub fn next_event(&mut self) -> Result<RawEvent> {
        let (code, payload) = read_message(&mut self.reader)?;
        if code & EVENT_MASK == 0 {
            bail!("unexpected reply type {} on event connection", code);
        }
        Ok(RawEvent {
            event_type: EventType::from_code(code),
            payload,
        })
    }
}

/// Tree snapshots fetched over a dedicated connection.
pub struct I3TreeSource {
    conn: I3Connection,
}

impl I3TreeSource {
    pub fn connect(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: I3Connection::connect(path)?,
        })
    }
}

impl TreeSource for I3TreeSource {
    fn windows(&mut self) -> Result<Vec<WindowAttributes>> {
        Ok(self.conn.get_tree()?.leaves())
    }
}

/// Workspace and window events from a subscribed connection.
pub struct I3ChangeSource {
    events: EventStream,
    handler: Option<ChangeHandler>,
}

impl I3ChangeSource {
    /// Connect and subscribe immediately, so nothing that happens after this
    /// returns is missed.
    pub fn connect(path: &Path) -> Result<Self> {
        let events = I3Connection::connect(path)?.subscribe(&["workspace", "window"])?;
        Ok(Self {
            events,
            handler: None,
        })
    }
}

impl ChangeSource for I3ChangeSource {
    fn subscribe(&mut self, handler: ChangeHandler) {
        self.handler = Some(handler);
    }

    fn run(&mut self) -> Result<()> {
        let Some(handler) = self.handler.as_mut() else {
            bail!("no change handler subscribed");
        };
        loop {
            let raw = self.events.next_event()?;
            match raw.to_change()? {
                Some(event) => handler(event)?,
                None => log::trace!("Ignoring {:?} event", raw.event_type),
            }
        }
    }
}

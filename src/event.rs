//! Event loop adapter.
//!
//! Connects a source of change notifications to the render pipeline. The
//! listener runs on its own thread and only forwards events; every render
//! happens on the calling thread, in the order events were observed.

use std::io::Write;
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};

use crate::config::BarConfig;
use crate::render::{emit_line, render_all};
use crate::types::WindowAttributes;

/// A change notification that should trigger a re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Focus moved to another workspace
    WorkspaceFocus,
    /// Focus moved to another window
    WindowFocus,
    /// Any other window event (`new`, `close`, `title`, `urgent`, ...)
    Window { change: String },
}

/// Callback invoked for every change event.
pub type ChangeHandler = Box<dyn FnMut(ChangeEvent) -> Result<()> + Send>;

/// Producer of change notifications.
pub trait ChangeSource {
    /// Register the handler that `run` delivers events to.
    fn subscribe(&mut self, handler: ChangeHandler);

    /// Block delivering events until the source fails or ends.
    fn run(&mut self) -> Result<()>;
}

/// Producer of window tree snapshots.
pub trait TreeSource {
    /// Fetch the current leaf windows.
    fn windows(&mut self) -> Result<Vec<WindowAttributes>>;
}

enum LoopMessage {
    Change(ChangeEvent),
    Stopped(Result<()>),
}

/// Fetch a snapshot, render it and write one line.
pub fn render_once<T, W>(config: &BarConfig, tree: &mut T, out: &mut W) -> Result<()>
where
    T: TreeSource + ?Sized,
    W: Write + ?Sized,
{
    let windows = tree.windows().context("fetch window tree")?;
    let line = render_all(config, &windows);
    log::debug!("Rendered {} window(s)", windows.len());
    emit_line(out, &line).context("write bar line")
}

/// Render at startup and then once per change event.
///
/// Only returns on failure: a change source that stops, for whatever reason,
/// ends the loop with an error.
pub fn run_bar<T, C, W>(config: &BarConfig, tree: &mut T, mut changes: C, out: &mut W) -> Result<()>
where
    T: TreeSource + ?Sized,
    C: ChangeSource + Send + 'static,
    W: Write + ?Sized,
{
    let (tx, rx) = mpsc::channel();

    let event_tx = tx.clone();
    changes.subscribe(Box::new(move |event: ChangeEvent| {
        event_tx
            .send(LoopMessage::Change(event))
            .map_err(|_| anyhow!("render loop has stopped"))
    }));

    // The listener thread starts only after the startup line is written
    render_once(config, tree, out).context("startup render")?;

    let listener = thread::Builder::new()
        .name("winbar-listener".to_string())
        .spawn(move || {
            let result = changes.run();
            let _ = tx.send(LoopMessage::Stopped(result));
        })
        .context("spawn listener thread")?;

    for message in rx.iter() {
        match message {
            LoopMessage::Change(event) => {
                log::debug!("Change event: {:?}", event);
                render_once(config, tree, out)?;
            }
            LoopMessage::Stopped(Ok(())) => bail!("change source closed"),
            LoopMessage::Stopped(Err(e)) => return Err(e.context("change source failed")),
        }
    }

    if listener.join().is_err() {
        bail!("listener thread panicked");
    }
    bail!("listener thread exited without reporting")
}

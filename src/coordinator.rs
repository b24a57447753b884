//! Activation coordinator
//!
//! Each activation runs its two external calls on a blocking-pool worker:
//! `install_hook()` first, whose text is committed to the Status cell right
//! there, then `derive_color()`, whose result is posted to the interactive
//! executor and committed to the Visual Attribute on the interactive thread.
//! Status is therefore always committed before the color of the same
//! activation. Distinct activations are not serialized; each field is
//! last-write-wins.

use ratatui::style::Color;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::executor::InteractiveHandle;
use crate::view::ViewState;

/// Installs a process-wide runtime interception. May block.
pub trait HookInstaller: Send + Sync + 'static {
    type Outcome: fmt::Display + Send;

    fn install_hook(&self) -> Self::Outcome;
}

/// Derives the display color from ambient process state. May block.
pub trait ColorSource: Send + Sync + 'static {
    fn derive_color(&self) -> Color;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivationId(pub u64);

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Textual outcome of the last committed install attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub activation: Option<ActivationId>,
    pub committed_at: Option<Instant>,
}

pub struct Coordinator<I, C> {
    installer: Arc<I>,
    colors: Arc<C>,
    status: Arc<watch::Sender<Status>>,
    ui: InteractiveHandle<ViewState>,
    runtime: Handle,
    next_id: AtomicU64,
}

impl<I: HookInstaller, C: ColorSource> Coordinator<I, C> {
    pub fn new(installer: I, colors: C, ui: InteractiveHandle<ViewState>, runtime: Handle) -> Self {
        let (status, _) = watch::channel(Status::default());
        Self {
            installer: Arc::new(installer),
            colors: Arc::new(colors),
            status: Arc::new(status),
            ui,
            runtime,
            next_id: AtomicU64::new(0),
        }
    }

    /// Reader side of the Status cell, for the presentation layer
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Schedule one activation and return without waiting on it
    pub fn handle_activation(&self) -> ActivationId {
        let id = ActivationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let installer = Arc::clone(&self.installer);
        let colors = Arc::clone(&self.colors);
        let status = Arc::clone(&self.status);
        let ui = self.ui.clone();

        let worker = self.runtime.spawn_blocking({
            let ui = ui.clone();
            move || run_activation(id, &*installer, &*colors, &status, &ui)
        });

        // A panicking collaborator only takes down its own worker
        self.runtime.spawn(async move {
            if let Err(e) = worker.await {
                tracing::warn!(activation = %id, "activation worker failed: {}", e);
                post_to_ui(&ui, id, "abandon", move |view| view.abandon(id));
            }
        });

        tracing::debug!(activation = %id, "activation scheduled");
        id
    }
}

fn run_activation<I: HookInstaller, C: ColorSource>(
    id: ActivationId,
    installer: &I,
    colors: &C,
    status: &watch::Sender<Status>,
    ui: &InteractiveHandle<ViewState>,
) {
    let text = installer.install_hook().to_string();
    let committed_at = Instant::now();

    // watch publishes before returning, so the commit is visible to every
    // reader before derive_color runs
    status.send_replace(Status {
        text: text.clone(),
        activation: Some(id),
        committed_at: Some(committed_at),
    });
    tracing::debug!(activation = %id, status = %text, "status committed");

    post_to_ui(ui, id, "status log entry", move |view| {
        view.note_status(id, text, committed_at)
    });

    let color = colors.derive_color();

    post_to_ui(ui, id, "color commit", move |view| view.commit_color(id, color));
}

/// Returns false when the interactive context has shut down and the job was
/// dropped
fn post_to_ui<F>(ui: &InteractiveHandle<ViewState>, id: ActivationId, what: &str, job: F) -> bool
where
    F: FnOnce(&mut ViewState) + Send + 'static,
{
    match ui.post(job) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(activation = %id, "{}, dropping {}", e, what);
            false
        }
    }
}

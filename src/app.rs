//! Terminal player screen.
//!
//! A mount pairs one `PlaybackController` with one input binding. Mounting
//! binds input and starts initialization in the background; unmounting drops
//! both, which releases the listeners and tears the session down. Reload is
//! unmount followed by mount, and is how a failed load gets retried.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{PlayerConfig, matches_binding};
use crate::engine::Engine;
use crate::error::EngineInitError;
use crate::input::{InputDispatcher, TerminalInput};
use crate::player::{InitOutcome, PlaybackController};
use crate::renderer::Renderer;
use crate::types::RenderContext;

type InitTask = JoinHandle<Result<InitOutcome, EngineInitError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadState {
    Loading,
    Loaded,
    Failed(String),
}

struct Mount<E: Engine> {
    controller: Arc<PlaybackController<E>>,
    dispatcher: InputDispatcher<TerminalInput>,
    renders: watch::Receiver<RenderContext>,
    init: Option<InitTask>,
}

impl<E> Mount<E>
where
    E: Engine + Clone + 'static,
{
    fn new(engine: &E, resource: &str) -> io::Result<Self> {
        let controller = Arc::new(PlaybackController::new(engine.clone()));
        let mut dispatcher = InputDispatcher::new(TerminalInput::new());
        dispatcher.bind(controller.clone())?;
        let renders = controller.subscribe();

        let init = {
            let controller = controller.clone();
            let resource = resource.to_string();
            tokio::spawn(async move { controller.initialize(&resource).await })
        };

        Ok(Self {
            controller,
            dispatcher,
            renders,
            init: Some(init),
        })
    }
}

pub struct PlayerApp<E> {
    engine: E,
    resource: String,
    config: PlayerConfig,
}

impl<E> PlayerApp<E>
where
    E: Engine + Clone + 'static,
{
    pub fn new(engine: E, resource: impl Into<String>, config: PlayerConfig) -> Self {
        Self {
            engine,
            resource: resource.into(),
            config,
        }
    }

    /// Run the player in the terminal.
    ///
    /// Sets up the terminal, enters the event loop, and restores the terminal
    /// on exit (even on error).
    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout).await;

        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    async fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let mut events = EventStream::new();
        let mut mount = Mount::new(&self.engine, &self.resource).context("failed to bind input")?;
        let mut state = LoadState::Loading;
        self.redraw(stdout, &mount, &state)?;

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        break;
                    };
                    let event = event.context("failed to read terminal event")?;
                    if let Event::Key(key) = &event {
                        let interrupt = key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL);
                        if interrupt || matches_binding(&self.config.key_bindings.quit, key) {
                            break;
                        }
                        if matches_binding(&self.config.key_bindings.reload, key) {
                            if key.kind == KeyEventKind::Press {
                                tracing::info!(resource = %self.resource, "reloading");
                                drop(mount);
                                mount = Mount::new(&self.engine, &self.resource)
                                    .context("failed to bind input")?;
                                state = LoadState::Loading;
                                self.redraw(stdout, &mount, &state)?;
                            }
                            continue;
                        }
                    }
                    if let Event::Resize(_, _) = event {
                        self.redraw(stdout, &mount, &state)?;
                        continue;
                    }
                    if let Some(outcome) = mount.dispatcher.dispatch(&event).await {
                        tracing::trace!(?outcome, "input dispatched");
                    }
                }
                changed = mount.renders.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    mount.renders.borrow_and_update();
                    self.redraw(stdout, &mount, &state)?;
                }
                joined = wait_init(&mut mount.init), if mount.init.is_some() => {
                    mount.init = None;
                    state = match joined {
                        Ok(Ok(outcome)) => {
                            tracing::debug!(?outcome, "initialization finished");
                            LoadState::Loaded
                        }
                        Ok(Err(e)) => {
                            let reason = format!("{:#}", anyhow::Error::from(e));
                            tracing::warn!(%reason, "script failed to load");
                            LoadState::Failed(reason)
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "initialization task failed");
                            LoadState::Failed(e.to_string())
                        }
                    };
                    self.redraw(stdout, &mount, &state)?;
                }
            }
        }

        Ok(())
    }

    fn redraw(&self, stdout: &mut io::Stdout, mount: &Mount<E>, state: &LoadState) -> Result<()> {
        let size = terminal::size()?;
        let ctx = mount.controller.render_context();
        let status = self.status_line(mount, state);
        Renderer::draw(stdout, &ctx, &self.config.key_bindings, &status, size)?;
        stdout.flush()?;
        Ok(())
    }

    fn status_line(&self, mount: &Mount<E>, state: &LoadState) -> String {
        match state {
            LoadState::Loading => format!("loading {}…", self.resource),
            LoadState::Loaded => format!(
                "{} | {} updates",
                mount.controller.resource().unwrap_or(&self.resource),
                mount.controller.publish_count()
            ),
            LoadState::Failed(reason) => format!(
                "not loaded: {reason} | {} to retry",
                self.config.key_bindings.reload
            ),
        }
    }
}

async fn wait_init(
    init: &mut Option<InitTask>,
) -> Result<Result<InitOutcome, EngineInitError>, tokio::task::JoinError> {
    match init.as_mut() {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

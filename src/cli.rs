//! Line-mode runner.
//!
//! Reads one command per line and prints the render context whenever the
//! controller publishes a new one. Useful over pipes and in terminals where
//! raw mode is unavailable.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::engine::Engine;
use crate::player::PlaybackController;
use crate::types::{CommandToken, RenderContext};

const GREETING: &str = "Welcome to ks-player!";
const HELP: &str = "Type a key name (Enter, ArrowRight, ...) or press return to advance. q quits.";

/// Drive `controller` from `input` until EOF or `q`.
///
/// A failed load is reported and the placeholder stays on screen; every
/// command is then dropped by the controller.
pub async fn run_lines<E, R, W>(
    controller: &PlaybackController<E>,
    resource: &str,
    input: R,
    out: &mut W,
) -> std::io::Result<()>
where
    E: Engine,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut renders = controller.subscribe();
    out.write_all(format!("{GREETING}\n{HELP}\n").as_bytes()).await?;
    let initial = renders.borrow_and_update().clone();
    print_context(out, &initial).await?;

    if let Err(e) = controller.initialize(resource).await {
        tracing::warn!(error = %e, "script failed to load");
        let reason = format!("! {:#}\n", anyhow::Error::from(e));
        out.write_all(reason.as_bytes()).await?;
    }
    print_if_changed(out, &mut renders).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let token = match line.trim_end_matches('\r') {
            "q" => break,
            "" => CommandToken::key("Enter"),
            key => CommandToken::key(key),
        };
        let outcome = controller.handle_input(token).await;
        tracing::debug!(?outcome, "line handled");
        print_if_changed(out, &mut renders).await?;
    }

    out.flush().await
}

async fn print_if_changed<W: AsyncWrite + Unpin>(
    out: &mut W,
    renders: &mut watch::Receiver<RenderContext>,
) -> std::io::Result<()> {
    if !renders.has_changed().unwrap_or(false) {
        return Ok(());
    }
    let ctx = renders.borrow_and_update().clone();
    print_context(out, &ctx).await
}

async fn print_context<W: AsyncWrite + Unpin>(out: &mut W, ctx: &RenderContext) -> std::io::Result<()> {
    let mut block = String::new();
    block.push_str(&format!("[scene] {}\n", ctx.scene.join(", ")));
    for line in &ctx.text {
        block.push_str(&format!("  {line}\n"));
    }
    out.write_all(block.as_bytes()).await?;
    out.flush().await
}

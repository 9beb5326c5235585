//! task serve command implementation

use std::process::{Command, Stdio};

use crate::error::Result;
use crate::server;
use crate::storage::Storage;

use super::{load_context, GlobalOptions};

pub fn run(globals: &GlobalOptions, port: Option<u16>, open: bool) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let port = port.unwrap_or(ctx.config.serve.port);
    let storage = ctx.storage().clone();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve_viewer(storage, port, open, globals.quiet))
}

async fn serve_viewer(storage: Storage, port: u16, open: bool, quiet: bool) -> Result<()> {
    let listener = server::bind(port).await?;
    let url = format!("http://127.0.0.1:{port}");
    if !quiet {
        println!("Starting task server on {url}");
        println!("Press Ctrl+C to stop");
    }
    if open {
        open_browser(&url);
    }
    server::serve_on(listener, storage).await
}

/// Launch the platform URL opener; failure only logs a warning
fn open_browser(url: &str) {
    let Some(mut command) = browser_command(url) else {
        tracing::warn!("opening a browser is not supported on this platform");
        return;
    };
    let spawned = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(err) = spawned {
        tracing::warn!("failed to open browser: {err}");
    }
}

fn browser_command(url: &str) -> Option<Command> {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("rundll32", &["url.dll,FileProtocolHandler"])
    } else if cfg!(unix) {
        ("xdg-open", &[])
    } else {
        return None;
    };
    let mut command = Command::new(program);
    command.args(args).arg(url);
    Some(command)
}

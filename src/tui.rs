use crate::events::AppEvent;
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::{Stream, StreamExt};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stderr};
use tokio::sync::mpsc;
use tokio::time::Duration;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

const TICK_RATE: Duration = Duration::from_millis(300);

/// Merges terminal input, animation ticks and request completions into one
/// stream for the main loop.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(forward_terminal_events(event::EventStream::new(), tx.clone()));

        let tx_tick = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_RATE);
            loop {
                interval.tick().await;
                if tx_tick.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Handler with no background tasks; events come only from `sender()`
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, tx }
    }

    /// Sender for background tasks that report back to the loop
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward terminal input until the stream fails or ends, then send
/// `AppEvent::InputLost` so the loop shuts down.
async fn forward_terminal_events<S>(mut stream: S, tx: mpsc::UnboundedSender<AppEvent>)
where
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    while let Some(evt) = stream.next().await {
        let app_event = match evt {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
            Ok(Event::Mouse(mouse)) => Some(AppEvent::Mouse(mouse)),
            Ok(Event::Paste(text)) => Some(AppEvent::Paste(text)),
            Ok(Event::Resize(w, h)) => Some(AppEvent::Resize(w, h)),
            Ok(_) => None,
            Err(err) => {
                tracing::error!(error = %err, "terminal event stream failed");
                let _ = tx.send(AppEvent::InputLost(err.to_string()));
                return;
            }
        };

        if let Some(event) = app_event {
            if tx.send(event).is_err() {
                return;
            }
        }
    }

    tracing::warn!("terminal event stream ended");
    let _ = tx.send(AppEvent::InputLost("terminal event stream ended".to_string()));
}

pub fn init() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(
        io::stderr(),
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )
    .context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(
        io::stderr(),
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    disable_raw_mode()?;
    Ok(())
}

/// Restore the terminal before the default panic output is printed
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}

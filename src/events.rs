use crate::error::TransportError;

/// Everything the main loop reacts to
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Mouse event
    Mouse(crossterm::event::MouseEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Animation tick
    Tick,

    /// Terminal input can no longer be read; the loop must shut down
    InputLost(String),

    /// The in-flight request finished
    Answer(Result<String, TransportError>),
}

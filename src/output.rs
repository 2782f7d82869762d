// ABOUTME: Terminal feedback for launcher commands.
// ABOUTME: Plain text, quiet (results only) or one JSON event per line.

use serde::Serialize;
use std::io::Write;
use std::time::Instant;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Text with progress lines
    Normal,
    /// Results and warnings only
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// One line of JSON output.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a, T: Serialize> {
    Progress {
        message: &'a str,
        percent: f64,
    },
    Field {
        name: &'a str,
        value: &'a str,
    },
    Record {
        kind: &'a str,
        data: &'a T,
    },
    Success {
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
    Warning {
        message: &'a str,
    },
    Error {
        message: &'a str,
    },
}

type Plain<'a> = Event<'a, ()>;

/// Prints command feedback according to the selected mode.
pub struct Output {
    mode: OutputMode,
    started: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Time the rest of the command; success lines report the elapsed seconds.
    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    fn elapsed(&self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64())
    }

    fn emit<T: Serialize>(event: &Event<'_, T>, to_stderr: bool) {
        let Ok(json) = serde_json::to_string(event) else {
            return;
        };
        if to_stderr {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }

    /// A step in progress. Text mode only.
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Pull progress. Text mode rewrites a single line until 100%.
    pub fn percent(&self, label: &str, percent: f64) {
        match self.mode {
            OutputMode::Normal => {
                print!("\r{label} {percent:5.1}%");
                if percent >= 100.0 {
                    println!();
                }
                let _ = std::io::stdout().flush();
            }
            OutputMode::Quiet => {}
            OutputMode::Json => Self::emit(
                &Plain::Progress {
                    message: label,
                    percent,
                },
                false,
            ),
        }
    }

    /// A named value such as `engine: available`.
    pub fn field(&self, name: &str, value: &str) {
        match self.mode {
            OutputMode::Json => Self::emit(&Plain::Field { name, value }, false),
            _ => println!("{name}: {value}"),
        }
    }

    /// A whole value: YAML in text modes, one JSON event otherwise.
    pub fn record<T: Serialize>(&self, kind: &str, data: &T) {
        match self.mode {
            OutputMode::Json => Self::emit(&Event::Record { kind, data }, false),
            _ => {
                if let Ok(yaml) = serde_yaml::to_string(data) {
                    print!("{yaml}");
                }
            }
        }
    }

    pub fn success(&self, message: &str) {
        match (self.mode, self.elapsed()) {
            (OutputMode::Json, duration_secs) => Self::emit(
                &Plain::Success {
                    message,
                    duration_secs,
                },
                false,
            ),
            (OutputMode::Normal, Some(secs)) => println!("{message} ({secs:.1}s)"),
            _ => println!("{message}"),
        }
    }

    /// A problem that does not fail the command.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Json => Self::emit(&Plain::Warning { message }, true),
            _ => eprintln!("Warning: {message}"),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Json => Self::emit(&Plain::Error { message }, true),
            _ => eprintln!("Error: {message}"),
        }
    }
}

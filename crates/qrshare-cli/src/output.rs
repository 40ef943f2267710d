use crate::cli::OutputFormat;
use colored::Colorize;
use qrshare_core::{DisplayModel, Notice, NoticeKind, ScannerState, SessionView, View, ViewModel};
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_pretty(value)),
        OutputFormat::Table => print_as_table(value),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn to_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn print_as_table(value: &Value) {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in obj {
                let val = match val {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                builder.push_record([key.as_str(), val.as_str()]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
        Value::String(s) => println!("{s}"),
        other => println!("{}", to_pretty(other)),
    }
}

pub fn print_bundle(model: &DisplayModel, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let value = serde_json::to_value(model).unwrap_or(Value::Null);
            println!("{}", to_pretty(&value));
        }
        OutputFormat::Table => {
            if model.entries.is_empty() {
                println!("No resources shared.");
                return;
            }
            let mut builder = Builder::default();
            builder.push_record(["#", "ResourceType", "Title"]);
            for (i, entry) in model.entries.iter().enumerate() {
                builder.push_record([
                    (i + 1).to_string(),
                    entry.resource_type.clone(),
                    entry.title.clone(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            for entry in &model.entries {
                println!("\n{}", entry.heading().cyan());
                println!("{}", entry.raw_json);
            }
        }
    }
}

pub fn print_session(session: &SessionView, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let value = json!({
                "sessionId": session.session_id,
                "expiresAt": session.expires_at,
                "purpose": session.purpose,
                "qrCodeImage": session.qr_data_url,
            });
            println!("{}", to_pretty(&value));
        }
        OutputFormat::Table => {
            println!("{}: {}", "Session".cyan(), session.session_id);
            println!("{}: {}", "Expires".cyan(), session.expires_at);
            if let Some(purpose) = session.purpose.as_deref().filter(|p| !p.is_empty()) {
                println!("{}: {}", "Purpose".cyan(), purpose);
            }
            println!(
                "{}: qrshare cancel {}",
                "Cancel with".cyan(),
                session.cancel.session_id
            );
        }
    }
}

/// Terminal rendering of the app state. Only prints what changed since the
/// previous render so repeated renders stay quiet.
pub struct TerminalView {
    format: OutputFormat,
    last: Option<ViewModel>,
}

impl TerminalView {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, last: None }
    }
}

impl View for TerminalView {
    fn render(&mut self, model: &ViewModel) {
        let previous = self.last.take();
        let prev_session = previous.as_ref().and_then(|m| m.session.as_ref());
        let prev_bundle = previous.as_ref().and_then(|m| m.bundle.as_ref());
        let prev_scanner = previous.as_ref().map_or(ScannerState::Idle, |m| m.scanner);

        if let Some(session) = &model.session
            && prev_session != Some(session)
        {
            print_session(session, self.format);
        }
        if model.scanner != prev_scanner && model.scanner == ScannerState::Active {
            eprintln!(
                "{} Camera active, point it at a QR code (Ctrl-C to stop)",
                "●".yellow()
            );
        }
        if let Some(bundle) = &model.bundle
            && prev_bundle != Some(bundle)
        {
            print_bundle(bundle, self.format);
        }
        self.last = Some(model.clone());
    }

    fn notify(&mut self, notice: &Notice) {
        match notice.kind {
            NoticeKind::Info => print_success(&notice.message),
            NoticeKind::Error => print_error(&notice.message),
        }
    }
}

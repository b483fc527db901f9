use colored::*;

use super::{Toast, ToastKind};

/// Receives each toast as it is added
pub trait ToastRenderer: Send + Sync {
    fn render(&self, toast: &Toast);
}

/// Prints toasts as one-line banners on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRenderer;

impl ToastRenderer for TerminalRenderer {
    fn render(&self, toast: &Toast) {
        eprintln!("{}", banner(toast));
    }
}

fn banner(toast: &Toast) -> String {
    let badge = match toast.kind {
        ToastKind::Success => " OK ".black().on_green(),
        ToastKind::Error => " ERROR ".white().on_red(),
        ToastKind::Warning => " WARN ".black().on_yellow(),
        ToastKind::Info => " INFO ".black().on_cyan(),
    };
    format!("{} {}", badge.bold(), toast.text)
}

use std::fmt;

/// Oldest notifications are dropped past this many.
pub const MAX_TOASTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    fn icon(&self) -> &'static str {
        match self {
            ToastKind::Info => "ℹ️",
            ToastKind::Success => "✅",
            ToastKind::Warning => "⚠️",
            ToastKind::Error => "⛔",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToastMessage {
    pub kind: ToastKind,
    pub text: String,
}

impl ToastMessage {
    pub fn new(kind: ToastKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for ToastMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.icon(), self.text)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Toasts {
    entries: Vec<ToastMessage>,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> &ToastMessage {
        if self.entries.len() >= MAX_TOASTS {
            self.entries.remove(0);
        }
        self.entries.push(ToastMessage::new(kind, message));
        &self.entries[self.entries.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToastMessage> {
        self.entries.iter()
    }

    /// Hands out every pending toast, oldest first.
    pub fn drain(&mut self) -> Vec<ToastMessage> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_capped_and_drops_oldest() {
        let mut toasts = Toasts::default();
        for i in 0..7 {
            toasts.push(ToastKind::Info, format!("message {i}"));
        }
        let texts: Vec<&str> = toasts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts.len(), MAX_TOASTS);
        assert_eq!(texts[0], "message 2");
        assert_eq!(texts[4], "message 6");
    }

    #[test]
    fn drain_hands_out_oldest_first_and_empties() {
        let mut toasts = Toasts::default();
        toasts.push(ToastKind::Warning, "overweight");
        toasts.push(ToastKind::Success, "saved");
        let shown = toasts.drain();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].text, "overweight");
        assert_eq!(shown[1].to_string(), "✅ saved");
        assert!(toasts.iter().next().is_none());
    }
}

//! In-process notification sink.
//!
//! Collects success/error notices raised by services (most notably the
//! request wrapper) and flushes them to stderr at the end of a command.
//! Quiet in `--json` mode: the output envelope already carries the outcome.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

pub struct Notifier {
    quiet: bool,
    notices: Vec<Notice>,
}

impl Notifier {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            notices: Vec::new(),
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.notices.push(Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notices.push(Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn flush(&mut self) {
        for notice in self.notices.drain(..) {
            if self.quiet {
                continue;
            }
            match notice.kind {
                NoticeKind::Success => eprintln!("✓ {}", notice.message),
                NoticeKind::Error => eprintln!("✗ {}", notice.message),
            }
        }
    }
}

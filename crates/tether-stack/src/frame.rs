use std::ffi::c_void;
use std::fmt;
use std::sync::OnceLock;

/// One return address from a captured stack.
///
/// The textual form (symbol and `file:line`) is resolved on first use and
/// cached; capture itself only records addresses. Two frames are equal when
/// they point at the same address.
#[derive(Clone)]
pub struct Frame {
    ip: usize,
    text: OnceLock<String>,
}

impl Frame {
    pub fn new(ip: usize) -> Self {
        Self {
            ip,
            text: OnceLock::new(),
        }
    }

    /// A frame whose description is already known, skipping symbol lookup.
    pub fn with_text(ip: usize, text: impl Into<String>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(text.into());
        Self { ip, text: cell }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Symbolicated description, `0x…` when no symbol covers the address.
    ///
    /// Resolution allocates and may take the `backtrace` crate's global lock.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| resolve(self.ip))
    }
}

fn resolve(ip: usize) -> String {
    // Return addresses point one past the call instruction; look up the call
    // itself so the line number belongs to the caller.
    let lookup = ip.saturating_sub(1);
    let mut described: Option<String> = None;

    backtrace::resolve(lookup as *mut c_void, |symbol| {
        if described.is_some() {
            return;
        }
        let mut text = match symbol.name() {
            Some(name) => format!("{name:#}"),
            None => format!("0x{ip:x}"),
        };
        if let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) {
            text.push_str(&format!(" at {}:{line}", file.display()));
        }
        described = Some(text);
    });

    described.unwrap_or_else(|| format!("0x{ip:x}"))
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip
    }
}

impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Frame");
        out.field("ip", &format_args!("0x{:x}", self.ip));
        if let Some(text) = self.text.get() {
            out.field("text", text);
        }
        out.finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_text_is_used_verbatim() {
        let frame = Frame::with_text(0x1000, "app::handler at src/app.rs:12");
        assert_eq!(frame.text(), "app::handler at src/app.rs:12");
        assert_eq!(frame.to_string(), "app::handler at src/app.rs:12");
    }

    #[test]
    fn equality_is_by_address() {
        assert_eq!(Frame::new(0x40), Frame::with_text(0x40, "anything"));
        assert_ne!(Frame::new(0x40), Frame::new(0x41));
    }

    #[test]
    fn unmapped_address_falls_back_to_hex() {
        let frame = Frame::new(0x10);
        assert_eq!(frame.text(), "0x10");
    }

    #[test]
    fn resolves_a_real_function() {
        #[inline(never)]
        fn marker_function_for_resolution() -> usize {
            marker_function_for_resolution as *const () as usize
        }
        // One byte into the function so `ip - 1` still lands on its entry.
        let frame = Frame::new(marker_function_for_resolution() + 1);
        assert!(
            frame.text().contains("marker_function_for_resolution"),
            "unexpected resolution: {}",
            frame.text()
        );
    }
}

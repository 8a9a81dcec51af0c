use tether_stack::StackSnapshot;

/// Header plus formatted chain, as written by every report.
pub fn render_report(headline: &str, chain: &StackSnapshot) -> String {
    format!("tether: {headline}; causal chain:\n{chain}")
}

/// Write `text` to stderr with one `write` call, retrying only after an
/// interruption or a short write. Bypasses Rust's stderr lock so it is
/// usable from a signal handler.
pub fn emit(text: &str) {
    write_stderr(text.as_bytes());
}

#[cfg(unix)]
fn write_stderr(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: the pointer and length describe a live, initialized slice.
        let written =
            unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if written < 0 {
            if std::io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return;
        }
        if written == 0 {
            return;
        }
        bytes = &bytes[written as usize..];
    }
}

#[cfg(not(unix))]
fn write_stderr(bytes: &[u8]) {
    use std::io::Write;
    let _ = std::io::stderr().write_all(bytes);
}

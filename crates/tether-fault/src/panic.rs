use tether_stack::StackSnapshot;
use tracing::debug;

use crate::emit::{emit, render_report};

/// Report the chain on every panic, after the previously installed hook ran.
///
/// The hook cannot tell whether the panic will be caught further up, so
/// caught panics are reported too.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        let chain = StackSnapshot::capture(1);
        let headline = match info.location() {
            Some(location) => format!("panic at {}:{}", location.file(), location.line()),
            None => "panic".to_string(),
        };
        emit(&render_report(&headline, &chain));
    }));
    debug!("installed panic hook");
}

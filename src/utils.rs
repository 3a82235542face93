use std::sync::Once;

use log::{Level, LevelFilter};

pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[macro_export]
macro_rules! console_warn {
    ( $( $t:tt )* ) => {
        web_sys::console::warn_1(&format!( $( $t )* ).into());
    }
}

static LOGGER: Once = Once::new();

/// Installs the console logger once per page. Sessions constructed with
/// `debug` raise the level for the whole page.
pub fn init_logging(debug: bool) {
    LOGGER.call_once(|| {
        // another crate on the page may own the logger already
        let _ = console_log::init_with_level(Level::Debug);
        log::set_max_level(LevelFilter::Warn);
    });
    if debug {
        log::set_max_level(LevelFilter::Debug);
    }
}

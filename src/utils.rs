//! 运行时辅助：panic 钩子与日志输出。

use log::LevelFilter;
use once_cell::sync::OnceCell;

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, Log, Metadata, Record};

    /// 将 `log` 记录转发到浏览器控制台。
    pub(super) struct ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
            let value = wasm_bindgen::JsValue::from_str(&line);
            match record.level() {
                Level::Error => web_sys::console::error_1(&value),
                Level::Warn => web_sys::console::warn_1(&value),
                Level::Info => web_sys::console::info_1(&value),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&value),
            }
        }

        fn flush(&self) {}
    }

    pub(super) static LOGGER: ConsoleLogger = ConsoleLogger;
}

static LOGGING: OnceCell<()> = OnceCell::new();

#[cfg(target_arch = "wasm32")]
fn install_logger(level: LevelFilter) {
    if log::set_logger(&console::LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// 原生目标使用 env_logger，`RUST_LOG` 优先于传入的级别。
#[cfg(not(target_arch = "wasm32"))]
fn install_logger(level: LevelFilter) {
    use env_logger::Env;

    // 宿主程序可能已装好日志器。
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level.as_str()))
        .try_init();
}

/// 安装日志器，重复调用无副作用。
pub fn init_logging(level: LevelFilter) {
    LOGGING.get_or_init(|| install_logger(level));
}

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

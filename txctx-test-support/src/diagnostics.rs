//! Logging bootstrap for tests, copied in spirit from
//! `test-tools-core::diagnostics::init_logger_for_test_path`: folds the
//! calling test file's name into `RUST_LOG` so a bare `cargo test` still
//! shows that test's own `log::` output without drowning in every other
//! module's.

use std::{env, path::Path};

pub fn init_logger_for_test_path(full_path_to_test_file: &str) {
    let mut rust_log = env::var(env_logger::DEFAULT_FILTER_ENV)
        .ok()
        .unwrap_or_default();
    if rust_log.ends_with(',') || rust_log.is_empty() {
        let path = Path::new(full_path_to_test_file);
        let file = path.file_stem().unwrap();
        let test_level = env::var("RUST_TEST_LOG").unwrap_or_else(|_| "info".to_string());
        rust_log.push_str(&format!("{}={}", file.to_str().unwrap(), test_level));
        env::set_var(env_logger::DEFAULT_FILTER_ENV, rust_log);
    }

    let _ = env_logger::builder()
        .format_timestamp_micros()
        .is_test(true)
        .try_init();
}

#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::diagnostics::init_logger_for_test_path(::std::file!());
    };
}

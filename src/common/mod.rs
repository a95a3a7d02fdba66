// Shared test helpers.

use verinfo_rs::{BuildInfo, BuildSetting};

/// Installs the color-eyre panic hook once per test binary.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = color_eyre::install();
    });
}

pub fn settings(pairs: &[(&str, &str)]) -> Vec<BuildSetting> {
    pairs.iter().map(|(k, v)| BuildSetting::new(*k, *v)).collect()
}

/// Build info of a fictional `github.com/acme/tool` binary.
pub fn build_info(version: &str, pairs: &[(&str, &str)]) -> BuildInfo {
    BuildInfo {
        path: "github.com/acme/tool".to_string(),
        main_version: version.to_string(),
        toolchain_version: "rustc 1.85.0".to_string(),
        settings: settings(pairs),
    }
}

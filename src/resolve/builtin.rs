//! Runtime-provided modules that are never bundled.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

/// Scheme prefix that always denotes a runtime module.
const RUNTIME_SCHEME: &str = "node:";

static BUILTINS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "assert", "assert/strict", "async_hooks", "buffer", "child_process", "cluster", "console",
        "constants", "crypto", "dgram", "diagnostics_channel", "dns", "dns/promises", "domain",
        "events", "fs", "fs/promises", "http", "http2", "https", "inspector", "module", "net",
        "os", "path", "path/posix", "path/win32", "perf_hooks", "process", "punycode",
        "querystring", "readline", "readline/promises", "repl", "stream", "stream/consumers",
        "stream/promises", "stream/web", "string_decoder", "sys", "timers", "timers/promises",
        "tls", "trace_events", "tty", "url", "util", "util/types", "v8", "vm", "wasi",
        "worker_threads", "zlib",
    ]
    .into_iter()
    .collect()
});

/// Whether `specifier` names a runtime-provided module.
pub fn is_builtin(specifier: &str) -> bool {
    specifier.starts_with(RUNTIME_SCHEME) || BUILTINS.contains(specifier)
}

//! Node.js built-in module detection.
//!
//! Membership is strict for both spellings: `fs` and `node:fs` are built-ins,
//! `node:made-up` is not.

/// Namespace prefix the runtime reserves for built-ins.
pub const BUILTIN_PREFIX: &str = "node:";

/// Modules importable with or without the `node:` prefix.
const BUILTIN_MODULES: &[&str] = &[
    "_http_agent",
    "_http_client",
    "_http_common",
    "_http_incoming",
    "_http_outgoing",
    "_http_server",
    "_stream_duplex",
    "_stream_passthrough",
    "_stream_readable",
    "_stream_transform",
    "_stream_wrap",
    "_stream_writable",
    "_tls_common",
    "_tls_wrap",
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Modules that only exist under the `node:` prefix.
const PREFIX_ONLY_MODULES: &[&str] = &["sea", "sqlite", "test", "test/reporters"];

/// True when `specifier` names a runtime built-in.
pub fn is_builtin(specifier: &str) -> bool {
    match specifier.strip_prefix(BUILTIN_PREFIX) {
        Some(name) => BUILTIN_MODULES.contains(&name) || PREFIX_ONLY_MODULES.contains(&name),
        None => BUILTIN_MODULES.contains(&specifier),
    }
}

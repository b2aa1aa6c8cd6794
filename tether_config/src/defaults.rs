// Default values. Each call returns a fresh value.

pub(crate) fn default_network() -> String {
    "tcp".to_string()
}

pub(crate) fn default_addr() -> String {
    "localhost:6379".to_string()
}

pub(crate) fn default_addrs() -> Vec<String> {
    vec![default_addr()]
}

pub(crate) fn default_protocol() -> u8 {
    3
}

pub(crate) fn default_dial_timeout_ms() -> u64 {
    5_000
}

pub(crate) fn default_read_timeout_ms() -> u64 {
    3_000
}

pub(crate) fn default_write_timeout_ms() -> u64 {
    3_000
}

pub(crate) fn default_max_retries() -> i32 {
    3
}

pub(crate) fn default_min_retry_backoff_ms() -> u64 {
    8
}

pub(crate) fn default_max_retry_backoff_ms() -> u64 {
    512
}

pub(crate) fn default_pool_size() -> i32 {
    10
}

pub(crate) fn default_pool_timeout_ms() -> u64 {
    4_000
}

pub(crate) fn default_conn_max_idle_time_ms() -> u64 {
    30 * 60 * 1_000
}

pub(crate) fn default_max_redirects() -> i32 {
    3
}

pub(crate) fn default_master_name() -> String {
    "mymaster".to_string()
}

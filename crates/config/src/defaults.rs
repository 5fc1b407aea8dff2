pub fn default_enabled() -> bool {
    true
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_chain_id() -> u64 {
    3
}

pub fn default_ipfs_gateway() -> String {
    "gitcoin.mypinata.cloud".to_string()
}

pub fn default_price_api_base() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

pub fn default_request_timeout_ms() -> u64 {
    10_000
}

pub fn default_max_concurrent_requests() -> usize {
    8
}

pub fn default_page_size() -> usize {
    1000
}

pub fn default_ttl_seconds() -> u64 {
    300
}

pub fn default_max_entries() -> usize {
    1000
}

pub fn default_testnet_usd_rate() -> f64 {
    1000.0
}

pub fn default_round_timeout_seconds() -> u64 {
    30
}

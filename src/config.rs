pub const DSS_HOST_DEFAULT: &str = "dp-sps-na.amazon.com";
pub const DSS_PORT_DEFAULT: u16 = 443;
// Port of the transparent proxy reachable on the encoded setup network.
pub const DSS_SETUP_PROXY_PORT: u16 = 8888;

pub const DSS_HOST_MAX: usize = 128;
pub const NONCE_MAX: usize = 64;
// Random nonce length in base64 characters.
pub const NONCE_LEN: usize = 32;
pub const SESSION_ID_MAX: usize = 128;
pub const SALT_MAX: usize = 64;
pub const HASHED_PIN_MAX: usize = 44;
pub const SIGNATURE_MAX: usize = 72;
// Base64 form of the largest DER signature.
pub const SIGNATURE_HEADER_MAX: usize = 96;
pub const PIN_HASH_SIZE: usize = 32;
pub const LOCATION_MAX: usize = 256;
pub const SSID_MAX: usize = 32;
pub const WIFI_KEY_MAX: usize = 64;
pub const BSSID_SIZE: usize = 6;
pub const REASON_MAX: usize = 128;
pub const WAIT_TIME_MAX: usize = 32;
pub const REGISTRATION_TOKEN_MAX: usize = 512;
pub const CONFIGURATION_ENTRIES_MAX: usize = 6;
pub const CONFIGURATION_VALUE_MAX: usize = 64;
pub const DEVICE_DETAIL_MAX: usize = 64;
pub const ERROR_DETAIL_MAX: usize = 64;
pub const WIFI_CREDENTIALS_PAGE_MAX: usize = 8;
pub const BATCH_LIST_CAPACITY: usize = 16;

pub const MAX_REDIRECTS_DEFAULT: u8 = 3;
pub const MAX_SCAN_PAGES_DEFAULT: u16 = 8;
pub const MAX_CREDENTIAL_PAGES_DEFAULT: u16 = 8;
// 5 minutes: upper bound on any server-advised back-off.
pub const MAX_WAIT_TIME_DEFAULT_MS: u32 = 300_000;
pub const DEFAULT_RETRY_WAIT_MS: u32 = 1_000;

/// Session-wide knobs for the provisionee engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvisioneeConfig {
    pub dss_port: u16,
    pub max_redirects: u8,
    pub max_scan_pages: u16,
    pub max_credential_pages: u16,
    pub max_wait_time_ms: u32,
    pub default_retry_wait_ms: u32,
    pub verify_signatures: bool,
}

impl Default for ProvisioneeConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ProvisioneeConfig {
    pub const fn defaults() -> Self {
        Self {
            dss_port: DSS_PORT_DEFAULT,
            max_redirects: MAX_REDIRECTS_DEFAULT,
            max_scan_pages: MAX_SCAN_PAGES_DEFAULT,
            max_credential_pages: MAX_CREDENTIAL_PAGES_DEFAULT,
            max_wait_time_ms: MAX_WAIT_TIME_DEFAULT_MS,
            default_retry_wait_ms: DEFAULT_RETRY_WAIT_MS,
            verify_signatures: true,
        }
    }

    pub const fn sanitized(self) -> Self {
        let dss_port = if self.dss_port == 0 {
            DSS_PORT_DEFAULT
        } else {
            self.dss_port
        };
        let max_redirects = clamp_u8(self.max_redirects, 0, 8);
        let max_scan_pages = clamp_u16(self.max_scan_pages, 1, 32);
        let max_credential_pages = clamp_u16(self.max_credential_pages, 1, 32);
        let max_wait_time_ms = clamp_u32(self.max_wait_time_ms, 0, 3_600_000);
        let mut default_retry_wait_ms = clamp_u32(self.default_retry_wait_ms, 0, 60_000);
        if default_retry_wait_ms > max_wait_time_ms {
            default_retry_wait_ms = max_wait_time_ms;
        }
        Self {
            dss_port,
            max_redirects,
            max_scan_pages,
            max_credential_pages,
            max_wait_time_ms,
            default_retry_wait_ms,
            verify_signatures: self.verify_signatures,
        }
    }
}

const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

const fn clamp_u16(value: u16, min: u16, max: u16) -> u16 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

const fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

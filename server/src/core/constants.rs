// =============================================================================
// Application Identity
// =============================================================================

/// Application name (service name, tracer name, command name)
pub const APP_NAME: &str = "goque";

// =============================================================================
// Configuration Keys
// =============================================================================

pub const KEY_JQ_FILTER: &str = "jq";
pub const KEY_PATH: &str = "path";
pub const KEY_HOST: &str = "host";
pub const KEY_PORT: &str = "port";
pub const KEY_SCHEME: &str = "scheme";
pub const KEY_ESCAPE_HTML: &str = "escapeHtml";
pub const KEY_LOG_LEVEL: &str = "logLevel";
pub const KEY_TRACER_DISABLE: &str = "tracerDisable";
pub const KEY_TRACER_RATIO: &str = "tracerRatio";
pub const KEY_TRACER_ENDPOINT: &str = "tracerEndpoint";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for the startup jq filter
pub const ENV_JQ_FILTER: &str = "GOQUE_JQ_FILTER";

/// Environment variable for the filter endpoint path
pub const ENV_PATH: &str = "GOQUE_PATH";

/// Environment variable for server host
pub const ENV_HOST: &str = "GOQUE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "GOQUE_PORT";

/// Environment variable for server scheme
pub const ENV_SCHEME: &str = "GOQUE_SCHEME";

/// Environment variable for HTML escaping of JSON output
pub const ENV_HTML_ESCAPE: &str = "GOQUE_HTML_ESCAPE";

/// Environment variable for log level
pub const ENV_LOG_LEVEL: &str = "GOQUE_LOG_LEVEL";

pub const ENV_TRACER_DISABLE: &str = "GOQUE_TRACER_DISABLE";
pub const ENV_TRACER_RATIO: &str = "GOQUE_TRACER_RATIO";
pub const ENV_TRACER_ENDPOINT: &str = "GOQUE_TRACER_ENDPOINT";

// =============================================================================
// Command Line Flags
// =============================================================================

pub const FLAG_JQ_FILTER: &str = "jq";
pub const FLAG_PATH: &str = "a";
pub const FLAG_HOST: &str = "h";
pub const FLAG_PORT: &str = "p";
pub const FLAG_SCHEME: &str = "s";
pub const FLAG_ESCAPE_HTML: &str = "e";
pub const FLAG_LOG_LEVEL: &str = "l";
pub const FLAG_TRACER_DISABLE: &str = "td";
pub const FLAG_TRACER_RATIO: &str = "tr";
pub const FLAG_TRACER_ENDPOINT: &str = "te";

// =============================================================================
// Defaults
// =============================================================================

/// No startup filter unless one is configured
pub const DEFAULT_JQ_FILTER: &str = "";

/// Default filter endpoint path
pub const DEFAULT_PATH: &str = "/api/v1/jq";

/// Default server host (empty binds all interfaces)
pub const DEFAULT_HOST: &str = "";

/// Default server port
pub const DEFAULT_PORT: &str = "8080";

pub const DEFAULT_SCHEME: &str = "";

pub const DEFAULT_ESCAPE_HTML: bool = false;

pub const DEFAULT_TRACER_DISABLE: bool = false;

/// Sample every trace unless told otherwise
pub const DEFAULT_TRACER_RATIO: f64 = 1.0;

/// Default OTLP/HTTP traces endpoint
pub const DEFAULT_TRACER_ENDPOINT: &str = "http://localhost:4318/v1/traces";

/// Host used for binding when the configured host is empty
pub const BIND_ALL_INTERFACES: &str = "0.0.0.0";

// =============================================================================
// HTTP
// =============================================================================

/// Request header carrying a per-request jq filter
pub const FILTER_HEADER: &str = "x-goque-jq-filter";

/// Error message when neither a header filter nor a startup filter exists
pub const MISSING_FILTER_MESSAGE: &str = "A JQ filter was not sent with request";

/// Maximum accepted request body (10MB)
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

// =============================================================================
// Tracing
// =============================================================================

/// Span around filter compilation
pub const SPAN_COMPILE_FILTER: &str = "compile_filter";

/// Span around filter execution
pub const SPAN_RUN_FILTER: &str = "run_filter";

/// Span around a whole filter request
pub const SPAN_JQ_REQUEST: &str = "jq_request";

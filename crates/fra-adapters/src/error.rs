use fra_schemas::order::ExchangeTag;

/// The error taxonomy from spec §7. Every fallible core operation returns
/// a `Result<T, CoreError>` (or a narrower per-crate error that the
/// orchestrator classifies into one of these at its boundary).
///
/// Exhaustive `match` is deliberate (design note §9): the source tolerates
/// drift via untyped error strings; this does not.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// No adapter registered for a required venue. Recoverable per-opportunity.
    AdapterUnavailable { venue: ExchangeTag },
    /// Adapter call failed (network/5xx/permission/rate limit).
    VenueError { venue: ExchangeTag, detail: String },
    /// Notional fell below `minPositionUsd` after all constraints.
    InsufficientCapital { notional_usd: f64, min_usd: f64 },
    /// Open-interest gate or OI-derived size cap below `minPositionUsd`.
    InsufficientLiquidity { reason: String },
    /// Historical spread invalid, or equals the current-spread fallback
    /// sentinel (spec §4.2.3 / design note).
    DataQualityFail { reason: String },
    /// Plan construction's net-return gate rejected the candidate.
    ProfitabilityFail { reason: String },
    /// Venue rejected order placement outright.
    OrderRejected { venue: ExchangeTag, detail: String },
    /// All close attempts, including the final fallback, failed.
    CloseFailure { key: String, detail: String },
    /// An exception escaped the cycle's outer boundary.
    FatalOrchestrationError { detail: String },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::AdapterUnavailable { venue } => {
                write!(f, "AdapterUnavailable: no adapter for venue {venue}")
            }
            CoreError::VenueError { venue, detail } => {
                write!(f, "VenueError[{venue}]: {detail}")
            }
            CoreError::InsufficientCapital { notional_usd, min_usd } => write!(
                f,
                "InsufficientCapital: notional {notional_usd:.2} < minPositionUsd {min_usd:.2}"
            ),
            CoreError::InsufficientLiquidity { reason } => {
                write!(f, "InsufficientLiquidity: {reason}")
            }
            CoreError::DataQualityFail { reason } => write!(f, "DataQualityFail: {reason}"),
            CoreError::ProfitabilityFail { reason } => write!(f, "ProfitabilityFail: {reason}"),
            CoreError::OrderRejected { venue, detail } => {
                write!(f, "OrderRejected[{venue}]: {detail}")
            }
            CoreError::CloseFailure { key, detail } => {
                write!(f, "CloseFailure[{key}]: {detail}")
            }
            CoreError::FatalOrchestrationError { detail } => {
                write!(f, "FatalOrchestrationError: {detail}")
            }
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

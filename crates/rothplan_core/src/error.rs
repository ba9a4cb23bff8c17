use std::fmt;

/// Errors in the shape of a tax bracket table
#[derive(Debug, Clone, PartialEq)]
pub enum BracketError {
    Empty,
    /// The first bracket must start at zero taxable income
    NonZeroStart { lower: f64 },
    /// `upper <= lower` within a single bracket
    Inverted { index: usize },
    /// Bracket `index` does not start where bracket `index - 1` ends
    Discontinuous { index: usize },
    /// Only the final bracket may be unbounded
    UnboundedNotLast { index: usize },
    InvalidRate { index: usize, rate: f64 },
}

impl fmt::Display for BracketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketError::Empty => write!(f, "tax bracket table is empty"),
            BracketError::NonZeroStart { lower } => {
                write!(f, "first tax bracket starts at {lower}, expected 0")
            }
            BracketError::Inverted { index } => {
                write!(f, "tax bracket {index} has an upper bound at or below its lower bound")
            }
            BracketError::Discontinuous { index } => write!(
                f,
                "tax bracket {index} overlaps or leaves a gap with the bracket before it"
            ),
            BracketError::UnboundedNotLast { index } => {
                write!(f, "tax bracket {index} is unbounded but is not the last bracket")
            }
            BracketError::InvalidRate { index, rate } => {
                write!(f, "tax bracket {index} has rate {rate}, expected 0 <= rate < 1")
            }
        }
    }
}

impl std::error::Error for BracketError {}

/// A pure calculator was handed an amount it cannot work with.
///
/// Every amount the engine derives from a validated [`PlanConfig`](crate::config::PlanConfig)
/// is finite and non-negative, so seeing this from inside a simulation means a bug.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidInput {
    NegativeAmount { name: &'static str, value: f64 },
    NonFiniteAmount { name: &'static str, value: f64 },
    Brackets(BracketError),
}

impl InvalidInput {
    /// Reject negative and non-finite amounts
    pub fn check_amount(name: &'static str, value: f64) -> Result<f64, InvalidInput> {
        if !value.is_finite() {
            Err(InvalidInput::NonFiniteAmount { name, value })
        } else if value < 0.0 {
            Err(InvalidInput::NegativeAmount { name, value })
        } else {
            Ok(value)
        }
    }
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInput::NegativeAmount { name, value } => {
                write!(f, "{name} must be non-negative, got {value}")
            }
            InvalidInput::NonFiniteAmount { name, value } => {
                write!(f, "{name} must be finite, got {value}")
            }
            InvalidInput::Brackets(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InvalidInput {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvalidInput::Brackets(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BracketError> for InvalidInput {
    fn from(e: BracketError) -> Self {
        InvalidInput::Brackets(e)
    }
}

/// Errors found while validating a plan, before any year is simulated
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    AgeRange { start_age: u32, end_age: u32 },
    NegativeBalance { account: &'static str, value: f64 },
    InvalidAmount { name: &'static str, value: f64 },
    InvalidRate { name: &'static str, value: f64 },
    Brackets(BracketError),
    NoConversionPhases,
    /// The first phase starts after the first simulated age
    PhaseGap { start_age: u32, first_phase_age: u32 },
    PhasesNotAscending { index: usize },
    TravelWindow { start_age: u32, end_age: u32 },
    NoScenarios,
    DuplicateScenario(String),
    InvalidScenario { name: String, reason: &'static str },
    ZeroTrials,
    InvalidPercentile(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::AgeRange { start_age, end_age } => {
                write!(f, "end age {end_age} is before start age {start_age}")
            }
            ConfigError::NegativeBalance { account, value } => {
                write!(f, "starting {account} balance is negative ({value})")
            }
            ConfigError::InvalidAmount { name, value } => {
                write!(f, "{name} must be a finite non-negative amount, got {value}")
            }
            ConfigError::InvalidRate { name, value } => {
                write!(f, "{name} is out of range ({value})")
            }
            ConfigError::Brackets(e) => write!(f, "{e}"),
            ConfigError::NoConversionPhases => write!(f, "conversion phase table is empty"),
            ConfigError::PhaseGap {
                start_age,
                first_phase_age,
            } => write!(
                f,
                "conversion phases start at age {first_phase_age} but the plan starts at {start_age}"
            ),
            ConfigError::PhasesNotAscending { index } => write!(
                f,
                "conversion phase {index} does not start after the phase before it"
            ),
            ConfigError::TravelWindow { start_age, end_age } => {
                write!(f, "travel budget ends at {end_age} before it starts at {start_age}")
            }
            ConfigError::NoScenarios => write!(f, "no market scenarios configured"),
            ConfigError::DuplicateScenario(name) => {
                write!(f, "market scenario '{name}' is defined more than once")
            }
            ConfigError::InvalidScenario { name, reason } => {
                write!(f, "market scenario '{name}': {reason}")
            }
            ConfigError::ZeroTrials => write!(f, "Monte Carlo trial count must be positive"),
            ConfigError::InvalidPercentile(p) => {
                write!(f, "percentile {p} is outside 0..=100")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Brackets(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BracketError> for ConfigError {
    fn from(e: BracketError) -> Self {
        ConfigError::Brackets(e)
    }
}

/// Errors from the year-transition engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The terminal year has already been simulated
    Closed,
    InvalidInput(InvalidInput),
    /// A plan problem only detectable at a specific age, such as a phase gap
    Config(ConfigError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Closed => write!(f, "simulation is closed; no further years"),
            EngineError::InvalidInput(e) => write!(f, "invalid engine input: {e}"),
            EngineError::Config(e) => write!(f, "configuration error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::InvalidInput(e) => Some(e),
            EngineError::Config(e) => Some(e),
            EngineError::Closed => None,
        }
    }
}

impl From<InvalidInput> for EngineError {
    fn from(e: InvalidInput) -> Self {
        EngineError::InvalidInput(e)
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

/// Errors related to market sampling and Monte Carlo batches
#[derive(Debug, Clone, PartialEq)]
pub enum MarketError {
    InvalidDistributionParameters {
        profile_type: &'static str,
        mean: f64,
        std_dev: f64,
        reason: &'static str,
    },
    NonFiniteReturn {
        year_index: usize,
        value: f64,
    },
    PathLength {
        expected: usize,
        actual: usize,
    },
    Engine(EngineError),
    /// Monte Carlo batch was cancelled by the caller
    Cancelled,
    Config(ConfigError),
    ThreadPool(String),
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketError::InvalidDistributionParameters {
                profile_type,
                mean,
                std_dev,
                reason,
            } => {
                write!(
                    f,
                    "invalid {profile_type} parameters (mean={mean}, std_dev={std_dev}): {reason}"
                )
            }
            MarketError::NonFiniteReturn { year_index, value } => {
                write!(f, "sampled return for year {year_index} is not finite ({value})")
            }
            MarketError::PathLength { expected, actual } => {
                write!(f, "return path has {actual} years, expected {expected}")
            }
            MarketError::Engine(e) => write!(f, "{e}"),
            MarketError::Cancelled => write!(f, "simulation cancelled"),
            MarketError::Config(e) => write!(f, "configuration error: {e}"),
            MarketError::ThreadPool(msg) => write!(f, "could not build worker pool: {msg}"),
        }
    }
}

impl std::error::Error for MarketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MarketError::Engine(e) => Some(e),
            MarketError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for MarketError {
    fn from(e: ConfigError) -> Self {
        MarketError::Config(e)
    }
}

impl From<EngineError> for MarketError {
    fn from(e: EngineError) -> Self {
        MarketError::Engine(e)
    }
}

/// Errors from a single deterministic or explicit-path run
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Config(ConfigError),
    Engine(EngineError),
    PathLength { expected: usize, actual: usize },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "configuration error: {e}"),
            SimulationError::Engine(e) => write!(f, "{e}"),
            SimulationError::PathLength { expected, actual } => {
                write!(f, "return path has {actual} years, expected {expected}")
            }
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Engine(e) => Some(e),
            SimulationError::PathLength { .. } => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<EngineError> for SimulationError {
    fn from(e: EngineError) -> Self {
        SimulationError::Engine(e)
    }
}

impl From<SimulationError> for MarketError {
    fn from(e: SimulationError) -> Self {
        match e {
            SimulationError::Config(e) => MarketError::Config(e),
            SimulationError::Engine(e) => MarketError::Engine(e),
            SimulationError::PathLength { expected, actual } => {
                MarketError::PathLength { expected, actual }
            }
        }
    }
}

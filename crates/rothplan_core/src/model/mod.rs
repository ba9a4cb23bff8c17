mod accounts;
mod market;
mod records;
mod results;
mod schedule;
mod tax_config;

pub use accounts::{AccountKind, AccountSnapshot};
pub use market::{MarketScenario, ReturnDistribution};
pub use records::{AccountDraw, FundingBreakdown, TaxPayment, YearRecord};
pub use results::{
    DistributionStats, MonteCarloConfig, MonteCarloProgress, MonteCarloReport, PlanSummary,
    ScenarioResult, ScenarioSummary, ThresholdProbability, TrialOutcome,
};
pub use schedule::{
    ConversionPhase, ConversionPolicy, ExpenseSchedule, OneTimeExpense, SocialSecurity,
    TravelBudget,
};
pub use tax_config::{TaxBracket, TaxConfig, TaxPolicy};

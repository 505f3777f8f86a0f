//! Derived member statistics
//!
//! Pure calculations live in [`bills`] and [`presence`]; [`refresh`] loads
//! their inputs from the database and writes the results back onto the
//! member rows. Request handlers only ever read the cached values.

pub mod bills;
pub mod presence;
pub mod refresh;

use serde::{Deserialize, Serialize};

pub use bills::BillStageCounts;
pub use presence::{age, average_weekly_presence, committee_meetings_per_month, service_time};
pub use refresh::{recalc_member, refresh_all, refresh_bill, RefreshSummary};

/// How bills are attributed to the current knesset when counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatsStrategy {
    /// Bills with a private proposal by the member dated inside the knesset term
    #[default]
    ProposalDate,
    /// Bills proposed by the member whose stage changed since the knesset started
    StageDate,
}

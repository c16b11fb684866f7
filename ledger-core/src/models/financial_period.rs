use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lock marker for one accounting month.
///
/// A period with no row in the store is open by definition; rows are created
/// lazily on first close and toggled thereafter, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub id: i64,
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

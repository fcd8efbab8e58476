use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesQuery {
    /// A day count or `all`; omitted means the last week.
    pub days: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopScoresQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    pub user_id: Option<Uuid>,
    pub test_id: Option<Uuid>,
}

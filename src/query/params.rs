//! Report request parameters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::model::ReportModel;
use super::{BindParams, BindValue, QueryError, QueryResult};

static US_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{4})\s*$").unwrap());

/// Filters, paging and sorting requested by a report.
///
/// Every field is optional. Numeric ids are bound as `:dim_<name>_id`
/// comparisons on the fact table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    pub cluster_id: Option<i64>,
    pub queue_id: Option<i64>,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
    pub cpus_id: Option<i64>,
    /// `MM/DD/YYYY`
    pub start_date: Option<String>,
    /// `MM/DD/YYYY`
    pub end_date: Option<String>,
    pub last_days: Option<i64>,
    pub year: Option<i64>,
    pub month: Option<i64>,
    /// Free-text search applied to the model's filter expression.
    pub filter: Option<String>,
    /// Select alias to order by.
    pub sort: Option<String>,
    /// `ASC` or `DESC`
    pub dir: Option<String>,
    pub start: Option<i64>,
    pub limit: Option<i64>,
    pub tag: Option<String>,
    pub model: Option<String>,
}

/// Restriction on `dim_date`, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFilter {
    /// Inclusive ISO dates.
    Range { start: String, end: String },
    LastDays(i64),
    Month { year: i64, month: Option<i64> },
}

impl TimeFilter {
    /// The WHERE fragment and its parameters.
    pub fn to_sql(&self) -> (String, BindParams) {
        let mut params = BindParams::new();
        let sql = match self {
            TimeFilter::Range { start, end } => {
                params.insert(":start_date".to_string(), BindValue::Text(start.clone()));
                params.insert(":end_date".to_string(), BindValue::Text(end.clone()));
                "date BETWEEN :start_date AND :end_date".to_string()
            }
            TimeFilter::LastDays(days) => {
                params.insert(":last_days".to_string(), BindValue::Int(*days));
                "date >= DATE_SUB(CURDATE(), INTERVAL :last_days DAY)".to_string()
            }
            TimeFilter::Month { year, month } => {
                params.insert(":year".to_string(), BindValue::Int(*year));
                match month {
                    Some(month) => {
                        params.insert(":month".to_string(), BindValue::Int(*month));
                        "year = :year AND month = :month".to_string()
                    }
                    None => "year = :year".to_string(),
                }
            }
        };
        (sql, params)
    }
}

impl ReportParams {
    /// Build from string pairs, as received in a request query string.
    ///
    /// Empty values are treated as absent; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = ReportParams::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            if value.is_empty() {
                continue;
            }
            let text = || Some(value.to_string());
            match key {
                "cluster_id" => params.cluster_id = Some(parse_int(key, value)?),
                "queue_id" => params.queue_id = Some(parse_int(key, value)?),
                "user_id" => params.user_id = Some(parse_int(key, value)?),
                "group_id" => params.group_id = Some(parse_int(key, value)?),
                "cpus_id" => params.cpus_id = Some(parse_int(key, value)?),
                "start_date" => params.start_date = text(),
                "end_date" => params.end_date = text(),
                "last_days" => params.last_days = Some(parse_int(key, value)?),
                "year" => params.year = Some(parse_int(key, value)?),
                "month" => params.month = Some(parse_int(key, value)?),
                "filter" => params.filter = text(),
                "sort" => params.sort = text(),
                "dir" => params.dir = text(),
                "start" => params.start = Some(parse_int(key, value)?),
                "limit" => params.limit = Some(parse_int(key, value)?),
                "tag" => params.tag = text(),
                "model" => params.model = text(),
                other => tracing::trace!(key = other, "ignoring unknown report parameter"),
            }
        }
        Ok(params)
    }

    /// Date restriction: explicit range, else last N days, else year/month.
    pub fn time_filter(&self) -> QueryResult<Option<TimeFilter>> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => {
                return Ok(Some(TimeFilter::Range {
                    start: parse_date(start)?,
                    end: parse_date(end)?,
                }))
            }
            (Some(_), None) | (None, Some(_)) => return Err(QueryError::IncompleteDateRange),
            (None, None) => {}
        }

        if let Some(days) = self.last_days {
            if days < 0 {
                return Err(QueryError::OutOfRange {
                    key: "last_days".into(),
                    value: days,
                });
            }
            return Ok(Some(TimeFilter::LastDays(days)));
        }

        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(QueryError::OutOfRange {
                    key: "month".into(),
                    value: month,
                });
            }
        }
        Ok(self.year.map(|year| TimeFilter::Month {
            year,
            month: self.month,
        }))
    }

    pub fn descending(&self) -> QueryResult<bool> {
        match self.dir.as_deref() {
            None => Ok(false),
            Some(dir) if dir.eq_ignore_ascii_case("desc") => Ok(true),
            Some(dir) if dir.eq_ignore_ascii_case("asc") => Ok(false),
            Some(dir) => Err(QueryError::InvalidDirection(dir.to_string())),
        }
    }

    pub fn report_model(&self) -> QueryResult<Option<ReportModel>> {
        self.model.as_deref().map(str::parse::<ReportModel>).transpose()
    }

    /// Row count and optional offset; the offset only applies with a limit.
    pub fn limit(&self) -> QueryResult<Option<(u64, Option<u64>)>> {
        let Some(limit) = self.limit else {
            return Ok(None);
        };
        let row_count = non_negative("limit", limit)?;
        let offset = self.start.map(|s| non_negative("start", s)).transpose()?;
        Ok(Some((row_count, offset)))
    }
}

/// Convert `MM/DD/YYYY` into ISO `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> QueryResult<String> {
    let invalid = || QueryError::InvalidDate(value.to_string());
    let caps = US_DATE.captures(value).ok_or_else(invalid)?;
    let month: u32 = caps[1].parse().map_err(|_| invalid())?;
    let day: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year: u32 = caps[3].parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return Err(invalid());
    }
    Ok(format!("{year:04}-{month:02}-{day:02}"))
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}

fn parse_int(key: &str, value: &str) -> QueryResult<i64> {
    value.trim().parse().map_err(|_| QueryError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn non_negative(key: &str, value: i64) -> QueryResult<u64> {
    u64::try_from(value).map_err(|_| QueryError::OutOfRange {
        key: key.to_string(),
        value,
    })
}

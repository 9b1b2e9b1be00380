//! Report models: the entity a report groups job activity by.

use std::fmt;
use std::str::FromStr;

use super::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportModel {
    User,
    Group,
    Queue,
    Cluster,
}

/// What a model adds to a report query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    /// Dimension to join.
    pub dimension: &'static str,
    pub group_by: &'static str,
    /// Column searched by the free-text filter.
    pub filter: &'static str,
    /// `(alias, expression)` select columns.
    pub columns: &'static [(&'static str, &'static str)],
}

static MODELS: [ModelSpec; 4] = [
    ModelSpec {
        name: "user",
        dimension: "dim_user",
        group_by: "dim_user_id",
        filter: "name",
        columns: &[
            ("user_id", "dim_user_id"),
            ("name", "name"),
            ("display_name", "COALESCE(display_name, name)"),
        ],
    },
    ModelSpec {
        name: "group",
        dimension: "dim_group",
        group_by: "dim_group_id",
        filter: "group_name",
        columns: &[("group_id", "dim_group_id"), ("group_name", "group_name")],
    },
    ModelSpec {
        name: "queue",
        dimension: "dim_queue",
        group_by: "dim_queue_id",
        filter: "queue",
        columns: &[("queue_id", "dim_queue_id"), ("queue", "queue")],
    },
    ModelSpec {
        name: "cluster",
        dimension: "dim_cluster",
        group_by: "dim_cluster_id",
        filter: "host",
        columns: &[("cluster_id", "dim_cluster_id"), ("host", "host")],
    },
];

impl ReportModel {
    pub const ALL: [ReportModel; 4] = [
        ReportModel::User,
        ReportModel::Group,
        ReportModel::Queue,
        ReportModel::Cluster,
    ];

    pub fn spec(self) -> &'static ModelSpec {
        &MODELS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl FromStr for ReportModel {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownModel(s.to_string()))
    }
}

impl fmt::Display for ReportModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

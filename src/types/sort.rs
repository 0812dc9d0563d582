use crate::error::KeeperError;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" | "asc" => Ok(SortDirection::Ascending),
            "descending" | "desc" => Ok(SortDirection::Descending),
            other => Err(KeeperError::validation(format!(
                "Invalid sort direction `{other}`; expected ascending or descending"
            ))),
        }
    }
}

/// Sortable application fields, keyed by their JSON names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationSort {
    #[default]
    Name,
    CreatedAt,
    TotalRequests,
}

impl ApplicationSort {
    pub fn column(self) -> &'static str {
        match self {
            ApplicationSort::Name => "name",
            ApplicationSort::CreatedAt => "created_at",
            ApplicationSort::TotalRequests => "total_requests",
        }
    }
}

impl FromStr for ApplicationSort {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(ApplicationSort::Name),
            "createdAt" => Ok(ApplicationSort::CreatedAt),
            "totalRequests" => Ok(ApplicationSort::TotalRequests),
            other => Err(KeeperError::validation(format!(
                "Cannot sort applications by `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenSort {
    #[default]
    Name,
    CreatedAt,
    LastUsedAt,
    TotalRequests,
}

impl TokenSort {
    pub fn column(self) -> &'static str {
        match self {
            TokenSort::Name => "name",
            TokenSort::CreatedAt => "created_at",
            TokenSort::LastUsedAt => "last_used_at",
            TokenSort::TotalRequests => "total_requests",
        }
    }
}

impl FromStr for TokenSort {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(TokenSort::Name),
            "createdAt" => Ok(TokenSort::CreatedAt),
            "lastUsedAt" => Ok(TokenSort::LastUsedAt),
            "totalRequests" => Ok(TokenSort::TotalRequests),
            other => Err(KeeperError::validation(format!("Cannot sort tokens by `{other}`"))),
        }
    }
}

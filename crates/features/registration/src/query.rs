//! Search parameter parsing and pagination arithmetic.

use crate::error::RegistrationError;
use crate::model::SearchParams;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Columns the registrant list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    FirstName,
    LastName,
    RegisteredAt,
}

impl SortField {
    /// Store column the field is persisted under.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::RegisteredAt => "registered_at",
        }
    }

    /// Name used in the HTTP API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::RegisteredAt => "registeredAt",
        }
    }
}

impl FromStr for SortField {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firstName" => Ok(Self::FirstName),
            "lastName" => Ok(Self::LastName),
            "registeredAt" => Ok(Self::RegisteredAt),
            _ => Err(RegistrationError::InvalidSortField { context: None }),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(RegistrationError::validation("Order must be either asc or desc"))
        }
    }
}

/// Validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Lowercased needle; empty matches everything.
    pub needle: String,
    pub field: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl SearchQuery {
    /// Checks raw parameters.
    ///
    /// Without `sortBy` the list is ordered newest first and `order` is ignored.
    ///
    /// # Errors
    /// * [`RegistrationError::InvalidSortField`] for an unknown `sortBy`.
    /// * [`RegistrationError::Validation`] for a bad `order`, `page` or `limit`.
    pub fn parse(params: &SearchParams) -> Result<Self, RegistrationError> {
        let (field, order) = match params.sort_by.as_deref() {
            Some(sort_by) => {
                let field = sort_by.parse::<SortField>()?;
                let order = params.order.as_deref().map_or(Ok(SortOrder::Asc), str::parse)?;
                (field, order)
            },
            None => (SortField::RegisteredAt, SortOrder::Desc),
        };

        Ok(Self {
            needle: params.search.as_deref().unwrap_or_default().to_lowercase(),
            field,
            order,
            page: positive(params.page, DEFAULT_PAGE, "Page")?,
            limit: positive(params.limit, DEFAULT_LIMIT, "Limit")?,
        })
    }

    /// Records skipped before the requested page.
    #[must_use]
    pub fn start(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// `ORDER BY` clause rendered from the closed field and order enums.
    ///
    /// Equal names fall back to admission order.
    #[must_use]
    pub fn order_clause(&self) -> String {
        let keyword = self.order.keyword();
        match self.field {
            SortField::RegisteredAt => format!("registered_at {keyword}"),
            field => format!("{} {keyword}, registered_at {keyword}", field.column()),
        }
    }
}

/// `ceil(total / limit)`; zero when nothing matched.
#[must_use]
pub fn total_pages(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit))
}

fn positive(value: Option<i64>, default: u32, name: &str) -> Result<u32, RegistrationError> {
    match value {
        None => Ok(default),
        Some(v) => u32::try_from(v)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| RegistrationError::validation(format!("{name} must be a positive integer"))),
    }
}

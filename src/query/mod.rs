//! Query options (`$filter`, `$orderby`, `$top`, `$skip`, `$count`, `$expand`, `$select`, `$resultFormat`).

pub mod expand;
pub mod filter;

pub use expand::{parse_expand, split_top_level, ExpandEntry, ExpansionPlan};
pub use filter::{parse_filter, CompareOp, FilterExpr, Operand};

use crate::case::to_snake_case;
use crate::config::Settings;
use crate::error::AppError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResultFormat {
    #[default]
    Default,
    DataArray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `$orderby` term; `field` is the snake_case path as the backend stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub top: u32,
    pub skip: u32,
}

/// Parsed query options for one collection or one `$expand` level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    pub filter: Option<FilterExpr>,
    pub order_by: Vec<OrderBy>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    pub count: bool,
    /// Raw `$expand` text, parsed per level against the entity type being expanded.
    pub expand: Option<String>,
    pub select: Vec<String>,
    pub result_format: ResultFormat,
}

impl QueryOptions {
    /// Parse from `key=value` pairs. Unknown keys are ignored; later keys override earlier ones.
    pub fn from_params<I, K, V>(params: I, settings: &Settings) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = QueryOptions::default();
        for (key, value) in params {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "$filter" => options.filter = Some(parse_filter(value)?),
                "$orderby" => options.order_by = parse_order_by(value)?,
                "$top" => {
                    let top = parse_u32("$top", value)?;
                    if top == 0 || top > settings.max_top {
                        return Err(AppError::BadRequest(format!(
                            "$top must be between 1 and {}",
                            settings.max_top
                        )));
                    }
                    options.top = Some(top);
                }
                "$skip" => options.skip = Some(parse_u32("$skip", value)?),
                "$count" => {
                    options.count = match value {
                        "true" => true,
                        "false" => false,
                        other => return Err(AppError::BadRequest(format!("$count must be true or false, got {}", other))),
                    }
                }
                "$expand" => options.expand = Some(value.to_string()).filter(|v| !v.is_empty()),
                "$select" => {
                    options.select = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                "$resultFormat" => {
                    options.result_format = match value {
                        "dataArray" => ResultFormat::DataArray,
                        other => return Err(AppError::BadRequest(format!("unsupported $resultFormat {}", other))),
                    }
                }
                _ => {}
            }
        }
        Ok(options)
    }

    /// Effective page: `$top` falls back to the configured default, `$skip` to zero.
    pub fn pagination(&self, settings: &Settings) -> Pagination {
        Pagination {
            top: self.top.unwrap_or(settings.default_top).min(settings.max_top),
            skip: self.skip.unwrap_or(0),
        }
    }

    pub fn is_data_array(&self) -> bool {
        self.result_format == ResultFormat::DataArray
    }
}

fn parse_u32(name: &str, raw: &str) -> Result<u32, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer, got {}", name, raw)))
}

fn parse_order_by(raw: &str) -> Result<Vec<OrderBy>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|term| {
            let mut parts = term.split_whitespace();
            let field = parts.next().unwrap_or_default();
            let direction = match parts.next().map(str::to_lowercase).as_deref() {
                None | Some("asc") => Direction::Asc,
                Some("desc") => Direction::Desc,
                Some(other) => return Err(AppError::BadRequest(format!("invalid $orderby direction {}", other))),
            };
            if parts.next().is_some() {
                return Err(AppError::BadRequest(format!("invalid $orderby term {}", term)));
            }
            Ok(OrderBy {
                field: to_snake_case(field),
                direction,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<QueryOptions, AppError> {
        QueryOptions::from_params(pairs.iter().copied(), &Settings::default())
    }

    #[test]
    fn parses_all_options() {
        let o = parse(&[
            ("$filter", "result gt 10"),
            ("$orderby", "phenomenonTime desc, id"),
            ("$top", "5"),
            ("$skip", "10"),
            ("$count", "true"),
            ("$expand", "Datastream"),
            ("$select", "id, result"),
            ("$resultFormat", "dataArray"),
            ("unrelated", "x"),
        ])
        .unwrap();
        assert!(o.filter.is_some());
        assert_eq!(
            o.order_by,
            vec![
                OrderBy { field: "phenomenon_time".into(), direction: Direction::Desc },
                OrderBy { field: "id".into(), direction: Direction::Asc },
            ]
        );
        assert_eq!((o.top, o.skip, o.count), (Some(5), Some(10), true));
        assert_eq!(o.expand.as_deref(), Some("Datastream"));
        assert_eq!(o.select, vec!["id", "result"]);
        assert!(o.is_data_array());
    }

    #[test]
    fn pagination_defaults() {
        let o = parse(&[]).unwrap();
        assert_eq!(o.pagination(&Settings::default()), Pagination { top: 100, skip: 0 });
        assert!(!o.count);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(parse(&[("$top", "0")]), Err(AppError::BadRequest(_))));
        assert!(matches!(parse(&[("$top", "1001")]), Err(AppError::BadRequest(_))));
        assert!(matches!(parse(&[("$skip", "-1")]), Err(AppError::BadRequest(_))));
        assert!(matches!(parse(&[("$count", "yes")]), Err(AppError::BadRequest(_))));
        assert!(matches!(parse(&[("$resultFormat", "csv")]), Err(AppError::BadRequest(_))));
        assert!(matches!(parse(&[("$orderby", "name sideways")]), Err(AppError::BadRequest(_))));
        assert!(matches!(parse(&[("$filter", "name eq")]), Err(AppError::FilterParse(_))));
    }
}

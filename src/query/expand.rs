//! `$expand` parsing into an expansion plan.
//!
//! `Datastreams($top=2;$expand=Observations),Locations/HistoricalLocations` becomes two entries:
//! `Datastreams` with its own options, and `Locations` whose nested `$expand` is `HistoricalLocations`.

use crate::config::Settings;
use crate::error::AppError;
use crate::model::{find_relation, EntityId, EntityType, JoinField, Relation};
use crate::query::QueryOptions;

/// One relation to inline, with the options that apply to the related entities.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandEntry {
    pub relation: &'static Relation,
    pub join_field: JoinField,
    /// Filled while walking the parent batch: parent ids or foreign key values, no duplicates.
    pub join_ids: Vec<EntityId>,
    pub options: QueryOptions,
}

impl ExpandEntry {
    pub fn add_join_id(&mut self, id: EntityId) {
        if !self.join_ids.contains(&id) {
            self.join_ids.push(id);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpansionPlan {
    entries: Vec<ExpandEntry>,
}

impl ExpansionPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ExpandEntry] {
        &self.entries
    }

    pub fn get_mut(&mut self, relation: &Relation) -> Option<&mut ExpandEntry> {
        self.entries.iter_mut().find(|e| e.relation.name == relation.name)
    }
}

/// Split at `separators` outside parentheses and quoted strings.
pub fn split_top_level<'a>(input: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            c if !quoted && depth == 0 && separators.contains(&c) => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Split `Name(options)/Rest` into its name, the options text and the chained remainder.
fn split_item(item: &str) -> Result<(&str, Option<&str>, Option<&str>), AppError> {
    let mut depth = 0usize;
    let mut open = None;
    let mut close = None;
    let mut slash = None;
    for (i, c) in item.char_indices() {
        match c {
            '(' => {
                if depth == 0 && open.is_none() {
                    open = Some(i);
                }
                depth += 1;
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| AppError::BadRequest(format!("unbalanced parentheses in $expand: {}", item)))?;
                if depth == 0 && close.is_none() {
                    close = Some(i);
                }
            }
            '/' if depth == 0 => {
                slash = Some(i);
                break;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(AppError::BadRequest(format!("unbalanced parentheses in $expand: {}", item)));
    }
    let head_end = slash.unwrap_or(item.len());
    let rest = slash.map(|i| &item[i + 1..]).filter(|r| !r.is_empty());
    match (open, close) {
        (Some(o), Some(c)) if o < head_end => {
            if c + 1 != head_end {
                return Err(AppError::BadRequest(format!("unexpected text after options in $expand: {}", item)));
            }
            Ok((item[..o].trim(), Some(&item[o + 1..c]), rest))
        }
        _ => Ok((item[..head_end].trim(), None, rest)),
    }
}

fn nested_params(options: &str) -> Result<Vec<(String, String)>, AppError> {
    split_top_level(options, &['&', ';'])
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| AppError::BadRequest(format!("expected key=value in $expand options, got {}", pair)))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse `$expand` for `entity_type`. Unknown relation names are skipped.
pub fn parse_expand(entity_type: EntityType, expand: Option<&str>, settings: &Settings) -> Result<ExpansionPlan, AppError> {
    let Some(expand) = expand.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(ExpansionPlan::default());
    };

    // relation -> accumulated raw nested params, in first-reference order
    let mut pending: Vec<(&'static Relation, Vec<(String, String)>)> = Vec::new();
    for item in split_top_level(expand, &[',']).into_iter().map(str::trim).filter(|i| !i.is_empty()) {
        let (name, options, chained) = split_item(item)?;
        let Some(relation) = find_relation(entity_type, name) else {
            tracing::debug!(entity_type = %entity_type, relation = name, "skipping unknown $expand relation");
            continue;
        };
        let index = match pending.iter().position(|(r, _)| r.name == relation.name) {
            Some(i) => i,
            None => {
                pending.push((relation, Vec::new()));
                pending.len() - 1
            }
        };
        let params = &mut pending[index].1;
        if let Some(options) = options {
            for (key, value) in nested_params(options)? {
                if key == "$expand" {
                    push_expand(params, value);
                } else {
                    params.push((key, value));
                }
            }
        }
        if let Some(chained) = chained {
            push_expand(params, chained.to_string());
        }
    }

    let entries = pending
        .into_iter()
        .map(|(relation, params)| {
            Ok(ExpandEntry {
                relation,
                join_field: relation.join_field(),
                join_ids: Vec::new(),
                options: QueryOptions::from_params(params, settings)?,
            })
        })
        .collect::<Result<_, AppError>>()?;
    Ok(ExpansionPlan { entries })
}

/// Merge another nested `$expand` into the accumulated params, comma-joined.
fn push_expand(params: &mut Vec<(String, String)>, value: String) {
    match params.iter_mut().find(|(k, _)| k == "$expand") {
        Some((_, existing)) => {
            existing.push(',');
            existing.push_str(&value);
        }
        None => params.push(("$expand".to_string(), value)),
    }
}

//! In-memory workbook: named sheets of `ID | JSON_DATA | READABLE_INFO |
//! UPDATED_AT` rows.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use quill_core::Money;

use crate::store::document_id;

pub const HEADER: [&str; 4] = ["ID", "JSON_DATA", "READABLE_INFO", "UPDATED_AT"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub id: String,
    pub json_data: String,
    pub readable_info: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    fn provisioned() -> Self {
        Sheet {
            header: HEADER.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetBook {
    sheets: BTreeMap<String, Sheet>,
}

impl SheetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Returns the sheet, creating it with the header row on first use.
    pub fn ensure_sheet(&mut self, name: &str) -> &mut Sheet {
        self.sheets.entry(name.to_string()).or_insert_with(|| {
            info!(sheet = %name, "Provisioning sheet");
            Sheet::provisioned()
        })
    }

    /// Every decodable `JSON_DATA` cell in row order. Rows that do not
    /// parse are skipped.
    pub fn get_all(&self, name: &str) -> Vec<Value> {
        let Some(sheet) = self.sheets.get(name) else {
            return Vec::new();
        };
        sheet
            .rows
            .iter()
            .filter(|row| !row.json_data.is_empty())
            .filter_map(|row| match serde_json::from_str(&row.json_data) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(sheet = %name, id = %row.id, error = %e, "Skipping unreadable row");
                    None
                }
            })
            .collect()
    }

    /// Updates the row whose id matches `item.id`, or appends one.
    pub fn save(&mut self, name: &str, item: &Value) -> Result<(), String> {
        let id = document_id(item).ok_or_else(|| "item is missing an id".to_string())?;
        let row = SheetRow {
            json_data: item.to_string(),
            readable_info: readable_info(item, &id),
            updated_at: Utc::now().to_rfc3339(),
            id,
        };

        let sheet = self.ensure_sheet(name);
        match sheet.rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => sheet.rows.push(row),
        }
        Ok(())
    }

    /// Deletes the first row with this id. Returns whether one was removed.
    pub fn delete(&mut self, name: &str, id: &str) -> bool {
        let sheet = self.ensure_sheet(name);
        match sheet.rows.iter().position(|r| r.id == id) {
            Some(index) => {
                sheet.rows.remove(index);
                true
            }
            None => false,
        }
    }
}

/// `name`, else `code`, else `ID <id>`; suffixed with ` - <amount>đ` when
/// the entity carries a non-zero `totalAmount`.
fn readable_info(item: &Value, id: &str) -> String {
    let non_empty = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let mut readable = non_empty("name")
        .or_else(|| non_empty("code"))
        .unwrap_or_else(|| format!("ID {id}"));

    if let Some(total) = item.get("totalAmount") {
        let amount: Money = serde_json::from_value(total.clone()).unwrap_or_default();
        if !amount.is_zero() {
            readable.push_str(&format!(" - {}đ", amount.grouped()));
        }
    }
    readable
}

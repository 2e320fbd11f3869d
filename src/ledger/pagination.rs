// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, LedgerResult};
use crate::models::Transaction;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub first: usize,
    pub after: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            first: DEFAULT_PAGE_SIZE,
            after: None,
        }
    }
}

impl PageRequest {
    pub fn first(n: usize) -> Self {
        Self {
            first: n,
            after: None,
        }
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.after = cursor;
        self
    }

    pub(crate) fn limit(&self) -> usize {
        self.first.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Keyset position of a transaction in `(date DESC, id DESC)` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCursor {
    pub date: DateTime<Utc>,
    pub id: i64,
}

impl From<&Transaction> for TransactionCursor {
    fn from(tx: &Transaction) -> Self {
        Self {
            date: tx.date,
            id: tx.id,
        }
    }
}

impl TransactionCursor {
    pub fn encode(&self) -> String {
        // Serializing a DateTime and an i64 cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        general_purpose::URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    pub fn decode(s: &str) -> LedgerResult<Self> {
        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(s.trim().as_bytes())
            .map_err(|e| LedgerError::validation(format!("invalid cursor: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LedgerError::validation(format!("invalid cursor: {}", e)))
    }
}

/// Trims the look-ahead row fetched past the page and computes the cursor.
pub(crate) fn into_page(mut rows: Vec<Transaction>, limit: usize) -> Page<Transaction> {
    let has_next_page = rows.len() > limit;
    rows.truncate(limit);
    let end_cursor = rows.last().map(|t| TransactionCursor::from(t).encode());
    Page {
        items: rows,
        has_next_page,
        end_cursor,
    }
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger engine. Every function takes the acting user explicitly and only
//! ever reads or writes rows owned by that user.

pub mod accounts;
pub mod balances;
pub mod categories;
pub mod journal;
pub mod pagination;
pub mod recurring;
pub mod setup;

pub use pagination::{Page, PageRequest};

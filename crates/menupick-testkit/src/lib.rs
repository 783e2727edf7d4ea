// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use menupick_app::{Record, RecordId, RecordStore, StoreError, StoreResult};
use std::collections::VecDeque;
use std::path::PathBuf;

const DISHES: [&str; 24] = [
    "Beef lok lak",
    "Fish amok",
    "Kuy teav",
    "Bai sach chrouk",
    "Nom banh chok",
    "Samlor korko",
    "Lort cha",
    "Num pang",
    "Fried rice",
    "Chicken curry",
    "Pad thai",
    "Tom yum",
    "Pho",
    "Banh mi",
    "Ramen",
    "Bibimbap",
    "Dumplings",
    "Fried noodles",
    "Congee",
    "Laksa",
    "Satay",
    "Green papaya salad",
    "Spring rolls",
    "Mango sticky rice",
];

const STYLES: [&str; 8] = [
    "Spicy",
    "Grilled",
    "Crispy",
    "Garlic",
    "Lemongrass",
    "Street-style",
    "Homemade",
    "Smoky",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible, distinct dish names.
#[derive(Debug, Clone)]
pub struct MenuFaker {
    rng: DeterministicRng,
    issued: Vec<String>,
}

impl MenuFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            issued: Vec::new(),
        }
    }

    pub fn dish(&mut self) -> String {
        loop {
            let base = DISHES[self.rng.int_n(DISHES.len())];
            let name = if self.rng.bool() {
                base.to_owned()
            } else {
                format!("{} {}", STYLES[self.rng.int_n(STYLES.len())], base.to_lowercase())
            };
            if !self.issued.contains(&name) {
                self.issued.push(name.clone());
                return name;
            }
            if self.issued.len() >= DISHES.len() * (STYLES.len() + 1) {
                let name = format!("{base} #{}", self.issued.len() + 1);
                self.issued.push(name.clone());
                return name;
            }
        }
    }

    pub fn menu(&mut self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.dish()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Insert(String),
    Update(RecordId, String),
    Delete(RecordId),
}

/// In-memory authoritative store with call recording and scripted failures.
///
/// Names are unique by default, matching the SQLite backend. Scripted
/// failures are consumed one per call, in order, before the call runs.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    records: Vec<Record>,
    last_id: i64,
    unique_names: bool,
    failures: VecDeque<StoreError>,
    calls: Vec<StoreCall>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            last_id: 0,
            unique_names: true,
            failures: VecDeque::new(),
            calls: Vec::new(),
        }
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds records with ids `1..=names.len()`.
    pub fn with_names(names: &[&str]) -> Self {
        let mut store = Self::default();
        for name in names {
            store.last_id += 1;
            store.records.push(Record::new(store.last_id, *name));
        }
        store
    }

    pub fn allow_duplicate_names(mut self) -> Self {
        self.unique_names = false;
        self
    }

    pub fn fail_next(&mut self, error: StoreError) {
        self.failures.push_back(error);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    pub fn mutation_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| !matches!(call, StoreCall::List))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Removes a record behind the client's back, as another operator would.
    pub fn remove_out_of_band(&mut self, id: RecordId) -> Option<Record> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    fn scripted_failure(&mut self) -> StoreResult<()> {
        match self.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_unique(&self, name: &str, except: Option<RecordId>) -> StoreResult<()> {
        if !self.unique_names {
            return Ok(());
        }
        let clash = self
            .records
            .iter()
            .any(|record| record.name == name && Some(record.id) != except);
        if clash {
            return Err(StoreError::DuplicateName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn list(&mut self) -> StoreResult<Vec<Record>> {
        self.calls.push(StoreCall::List);
        self.scripted_failure()?;
        let mut records = self.records.clone();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn insert(&mut self, name: &str) -> StoreResult<Record> {
        self.calls.push(StoreCall::Insert(name.to_owned()));
        self.scripted_failure()?;
        self.check_unique(name, None)?;
        self.last_id += 1;
        let record = Record::new(self.last_id, name);
        self.records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, id: RecordId, name: &str) -> StoreResult<Record> {
        self.calls.push(StoreCall::Update(id, name.to_owned()));
        self.scripted_failure()?;
        self.check_unique(name, Some(id))?;
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound { id })?;
        record.name = name.to_owned();
        Ok(record.clone())
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        self.calls.push(StoreCall::Delete(id));
        self.scripted_failure()?;
        self.remove_out_of_band(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("menupick.db");
    Ok((dir, db_path))
}

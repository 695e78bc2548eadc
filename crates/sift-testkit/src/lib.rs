// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use sift_grid::{Column, DataType};
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, Duration, Month};

const DEPARTMENTS: [&str; 8] = [
    "Engineering",
    "Finance",
    "Legal",
    "Marketing",
    "Operations",
    "Research",
    "Sales",
    "Support",
];

const TITLES: [&str; 10] = [
    "Analyst",
    "Associate",
    "Coordinator",
    "Director",
    "Engineer",
    "Lead",
    "Manager",
    "Specialist",
    "Technician",
    "Consultant",
];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CITIES: [(&str, &str); 14] = [
    ("Austin", "TX"),
    ("Seattle", "WA"),
    ("Denver", "CO"),
    ("Madison", "WI"),
    ("Raleigh", "NC"),
    ("Pittsburgh", "PA"),
    ("Portland", "OR"),
    ("Boise", "ID"),
    ("Phoenix", "AZ"),
    ("Nashville", "TN"),
    ("San Diego", "CA"),
    ("Oakland", "CA"),
    ("Omaha", "NE"),
    ("Buffalo", "NY"),
];

const REFERENCE_YEAR: i32 = 2026;

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

/// Seeded generator of employee-shaped JSON rows. Same seed, same rows.
#[derive(Debug, Clone)]
pub struct RowFaker {
    rng: DeterministicRng,
    next_id: u64,
}

impl RowFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// One employee row. Roughly one in eight rows has a null `age`.
    pub fn employee(&mut self) -> Value {
        let id = self.next_id;
        self.next_id += 1;

        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let (city, state) = CITIES[self.rng.int_n(CITIES.len())];
        let age = if self.rng.int_n(8) == 0 {
            Value::Null
        } else {
            json!(self.int_range(22, 67))
        };

        json!({
            "id": format!("emp-{id:04}"),
            "name": format!("{first} {last}"),
            "email": format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
            "title": self.pick(&TITLES),
            "department": self.pick(&DEPARTMENTS),
            "city": city,
            "state": state,
            "age": age,
            "salary": self.int_range(45_000, 210_000),
            "hired": self.hire_date(),
            "active": self.rng.int_n(5) != 0,
            "remote": self.rng.bool(),
        })
    }

    pub fn employees(&mut self, count: usize) -> Vec<Value> {
        (0..count).map(|_| self.employee()).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn hire_date(&mut self) -> String {
        let Ok(start) = Date::from_calendar_date(REFERENCE_YEAR - 12, Month::January, 1) else {
            return String::new();
        };
        let offset = self.int_range(0, 12 * 365);
        let date = start + Duration::days(offset);
        date.format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_default()
    }
}

/// Columns matching the shape of [`RowFaker::employee`].
pub fn employee_columns() -> Vec<Column<Value>> {
    vec![
        Column::keyed("id", "ID", DataType::String).with_width(90),
        Column::keyed("name", "Name", DataType::String).with_width(180),
        Column::keyed("email", "Email", DataType::String).with_width(240),
        Column::keyed("title", "Title", DataType::String),
        Column::keyed("department", "Department", DataType::String),
        Column::keyed("city", "City", DataType::String),
        Column::keyed("state", "State", DataType::String).with_width(70),
        Column::keyed("age", "Age", DataType::Number).with_width(70),
        Column::keyed("salary", "Salary", DataType::Currency),
        Column::keyed("hired", "Hired", DataType::Date),
        Column::keyed("active", "Active", DataType::Boolean).with_width(80),
        Column::keyed("remote", "Remote", DataType::Boolean)
            .filterable(false)
            .with_width(80),
    ]
}

/// The on-disk table document the CLI reads: column specs plus rows.
pub fn employee_table(rows: &[Value]) -> Value {
    let columns: Vec<Value> = employee_columns()
        .iter()
        .map(|column| {
            json!({
                "id": column.id,
                "header": column.header,
                "type": column.data_type.as_str(),
            })
        })
        .collect();
    json!({ "columns": columns, "rows": rows })
}

pub fn temp_table_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("table.json");
    Ok((dir, path))
}

pub fn fixture_date() -> &'static str {
    "2026-02-19"
}

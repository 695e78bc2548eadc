// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sift_grid::FilterOperator;
use time::OffsetDateTime;

use crate::schema::ColumnSchema;

const OUTPUT_CONTRACT: &str = r#"```json
{
  "filters": [{ "id": "<column id>", "operator": "<operator>", "value": <any> }],
  "sorting": [{ "id": "<column id>", "desc": <true|false> }],
  "confidence": <number between 0 and 1>
}
```
"#;

const OUTPUT_RULES: &str = r#"Rules:
1. Respond with the JSON object only. No prose, no code fences.
2. Use only the column ids listed under Columns.
3. `between` takes a two-element array `[min, max]`; `inList` takes an array of values.
4. `isEmpty` and `isNotEmpty` ignore `value`; send `null`.
5. Write dates as YYYY-MM-DD and resolve relative dates against the current date.
6. List sorting entries in priority order.
7. When the question cannot be expressed with these filters, return empty arrays and a confidence below 0.5.
"#;

pub fn build_system_prompt(schema: &[ColumnSchema], now: OffsetDateTime) -> String {
    let mut out = String::new();
    out.push_str(
        "You translate questions about a data table into filters and sorting for a grid. Output only JSON.\n",
    );
    out.push_str("\n## Current date\n\n");
    out.push_str(&format!("Today is {}.\n", format_human_date(now)));

    out.push_str("\n## Columns\n\n");
    if schema.is_empty() {
        out.push_str("(no columns)\n");
    }
    for column in schema {
        out.push_str(&format_column(column));
        out.push('\n');
    }

    out.push_str("\n## Operators\n\n");
    for operator in FilterOperator::ALL {
        out.push_str(&format!(
            "- `{}`: {}\n",
            operator.as_str(),
            operator.description()
        ));
    }

    out.push_str("\n## Output format\n\n");
    out.push_str(OUTPUT_CONTRACT);
    out.push('\n');
    out.push_str(OUTPUT_RULES);
    out
}

/// The user turn is the query, verbatim.
pub fn build_user_prompt(query: &str) -> String {
    query.to_owned()
}

fn format_column(column: &ColumnSchema) -> String {
    let mut line = format!(
        "- `{}` ({}): {}",
        column.id,
        column.data_type.as_str(),
        column.name
    );
    if let Some(description) = &column.description
        && description != &column.name
    {
        line.push_str(&format!(". {description}"));
    }
    if !column.examples.is_empty() {
        line.push_str(&format!(". Examples: {}", column.examples.join(", ")));
    }
    line
}

fn format_human_date(now: OffsetDateTime) -> String {
    let date = now.date();
    let human = date
        .format(&time::macros::format_description!(
            "[weekday repr:long], [month repr:long] [day], [year]"
        ))
        .unwrap_or_else(|_| date.to_string());
    let iso = date
        .format(&time::macros::format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string());
    format!("{human} ({iso})")
}

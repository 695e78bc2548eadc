// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use sift_testkit::{RowFaker, employee_table, temp_table_path};
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use tiny_http::{Header, Response, Server};

fn sift(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sift"));
    cmd.env_remove("SIFT_CONFIG_PATH")
        .env_remove("SIFT_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

fn write_employees(path: &Path, count: usize) -> Result<Vec<Value>> {
    let rows = RowFaker::new(11).employees(count);
    std::fs::write(path, serde_json::to_string(&employee_table(&rows))?)?;
    Ok(rows)
}

fn stdout_json(output: &Output) -> Result<Value> {
    assert!(
        output.status.success(),
        "exit {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn json_output_pages_sorted_rows() -> Result<()> {
    let (dir, table) = temp_table_path()?;
    write_employees(&table, 40)?;

    let output = sift(&dir.path().join("missing.toml"))
        .arg("--table")
        .arg(&table)
        .args(["--sort", "salary:desc", "--page-size", "5", "--page", "2", "--json"])
        .output()?;
    let document = stdout_json(&output)?;

    assert_eq!(document["pagination"]["page_index"], 1);
    assert_eq!(document["pagination"]["page_count"], 8);
    assert_eq!(document["pagination"]["total_rows"], 40);
    let salaries: Vec<i64> = document["rows"]
        .as_array()
        .ok_or_else(|| anyhow!("rows should be an array"))?
        .iter()
        .filter_map(|row| row["salary"].as_i64())
        .collect();
    assert_eq!(salaries.len(), 5);
    assert!(salaries.windows(2).all(|pair| pair[0] >= pair[1]));
    Ok(())
}

#[test]
fn text_output_applies_filters_and_search() -> Result<()> {
    let (dir, table) = temp_table_path()?;
    let rows = write_employees(&table, 30)?;
    let department = rows[0]["department"]
        .as_str()
        .ok_or_else(|| anyhow!("department should be text"))?
        .to_owned();
    let expected = rows
        .iter()
        .filter(|row| row["department"] == department.as_str())
        .count();

    let output = sift(&dir.path().join("missing.toml"))
        .arg("--table")
        .arg(&table)
        .arg("--filter")
        .arg(format!("department:equals:{department}"))
        .args(["--page-size", "100"])
        .output()?;
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("ID "), "{text}");
    assert!(
        text.ends_with(&format!("page 1 of 1 ({expected} rows)\n")),
        "{text}"
    );

    let output = sift(&dir.path().join("missing.toml"))
        .arg("--table")
        .arg(&table)
        .args(["--search", "no-such-person-anywhere"])
        .output()?;
    assert!(String::from_utf8_lossy(&output.stdout).ends_with("no matching rows\n"));
    Ok(())
}

#[test]
fn typed_filters_parse_their_values_as_json() -> Result<()> {
    let (dir, table) = temp_table_path()?;
    let rows = write_employees(&table, 30)?;
    let expected = rows
        .iter()
        .filter(|row| row["salary"].as_i64().is_some_and(|salary| salary > 60_000))
        .count();

    let output = sift(&dir.path().join("missing.toml"))
        .arg("--table")
        .arg(&table)
        .args(["--filter", "salary:gt:60000", "--page-size", "100", "--json"])
        .output()?;
    let document = stdout_json(&output)?;

    assert_eq!(document["pagination"]["total_rows"], expected);
    assert_eq!(document["state"]["column_filters"][0]["operator"], "gt");
    assert_eq!(document["state"]["column_filters"][0]["value"], 60_000);
    Ok(())
}

#[test]
fn bad_arguments_and_configs_exit_non_zero() -> Result<()> {
    let (dir, table) = temp_table_path()?;
    write_employees(&table, 3)?;
    let missing = dir.path().join("missing.toml");

    let output = sift(&missing).arg("--wat").output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown argument \"--wat\""));

    let output = sift(&missing).output()?;
    assert!(String::from_utf8_lossy(&output.stderr).contains("--table <path> is required"));

    let config = dir.path().join("config.toml");
    std::fs::write(&config, "version = 9\n")?;
    let output = sift(&config).arg("--check").output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported config version 9"), "{stderr}");
    assert!(stderr.contains("--print-example-config"), "{stderr}");
    Ok(())
}

#[test]
fn strict_config_rejects_unknown_sort_columns() -> Result<()> {
    let (dir, table) = temp_table_path()?;
    write_employees(&table, 3)?;
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "version = 1\n[grid]\nstrict = true\n")?;

    let output = sift(&config)
        .arg("--table")
        .arg(&table)
        .args(["--sort", "salry"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown column \"salry\""));
    Ok(())
}

#[test]
fn ask_applies_confident_answers_from_a_custom_endpoint() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let endpoint = format!("http://{}/translate", server.server_addr());
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/translate");
        let answer = json!({
            "filters": [{"id": "active", "operator": "equals", "value": true}],
            "sorting": [{"id": "age", "desc": true}],
            "confidence": 0.9
        });
        let body = json!({"content": answer.to_string()}).to_string();
        let response = Response::from_string(body).with_status_code(200).with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        );
        request.respond(response).expect("response should succeed");
    });

    let (dir, table) = temp_table_path()?;
    write_employees(&table, 25)?;
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "version = 1\n[ai]\nprovider = \"custom\"\nbase_url = \"{endpoint}\"\ntimeout = \"5s\"\n"
        ),
    )?;

    let output = sift(&config)
        .arg("--table")
        .arg(&table)
        .args(["--ask", "active people, oldest first", "--page-size", "50", "--json"])
        .output()?;
    let document = stdout_json(&output)?;
    handle.join().map_err(|_| anyhow!("server thread panicked"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ai: filters [active equals true], sorting [age desc], confidence 0.90"),
        "{stderr}"
    );
    let rows = document["rows"]
        .as_array()
        .ok_or_else(|| anyhow!("rows should be an array"))?;
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row["active"] == true));
    Ok(())
}

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultsd");
    let mut child = Command::new(exe)
        .env("RESULTSD_PUBLISH_DELAY_MS", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn seed_class(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let _ = request_ok(stdin, reader, "seed-1", "setup.subjects.add", json!({ "name": "Maths" }));
    let _ = request_ok(stdin, reader, "seed-2", "setup.subjects.add", json!({ "name": "Science" }));
    let _ = request_ok(
        stdin,
        reader,
        "seed-3",
        "roster.load",
        json!({ "students": [
            { "admissionNo": "AD2", "name": "Ben", "class": "8", "section": "A", "rollNo": "10" },
            { "admissionNo": "AD1", "name": "Asha", "class": "8", "section": "A", "rollNo": "2" },
            { "admissionNo": "AD7", "name": "Chen", "class": "8", "section": "B", "rollNo": "1" }
        ] }),
    );
}

fn open_pt1(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    request_ok(
        stdin,
        reader,
        "open",
        "grid.open",
        json!({ "class": "8", "section": "A", "exam": "PT1", "session": "2024-25" }),
    )
}

#[test]
fn pattern_splits_subject_across_remaining_exams() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_class(&mut stdin, &mut reader);
    let _ = request_ok(&mut stdin, &mut reader, "1", "setup.exams.remove", json!({ "name": "Half Yearly" }));
    let exams = request_ok(&mut stdin, &mut reader, "2", "setup.exams.remove", json!({ "name": "PT2" }));
    assert_eq!(exams.get("exams"), Some(&json!(["PT1", "Annual"])));

    let applied = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "patterns.apply",
        json!({
            "subjects": ["Maths"],
            "components": [
                { "name": "Written", "max": 80 },
                { "name": "Assignment", "max": 20 }
            ]
        }),
    );
    assert_eq!(applied.get("removed"), Some(&json!(["Maths"])));
    assert_eq!(
        applied.get("subjects"),
        Some(&json!(["Science", "Maths (Written)", "Maths (Assignment)"]))
    );

    for (i, (exam, subject, max)) in [
        ("PT1", "Maths (Written)", 80),
        ("PT1", "Maths (Assignment)", 20),
        ("Annual", "Maths (Written)", 80),
        ("Annual", "Maths (Assignment)", 20),
    ]
    .iter()
    .enumerate()
    {
        let got = request_ok(
            &mut stdin,
            &mut reader,
            &format!("max-{}", i),
            "setup.maxMarks.get",
            json!({ "exam": exam, "subject": subject }),
        );
        assert_eq!(got.get("max").and_then(|v| v.as_u64()), Some(*max));
    }

    let again = request(
        &mut stdin,
        &mut reader,
        "4",
        "patterns.apply",
        json!({ "subjects": ["Maths (Written)"], "components": [{ "name": "Oral", "max": 10 }] }),
    );
    assert_eq!(error_code(&again), Some("bad_params"));
}

#[test]
fn rejected_patterns_leave_setup_unchanged() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_class(&mut stdin, &mut reader);
    let before = request_ok(&mut stdin, &mut reader, "1", "setup.get", json!({}));

    let unknown = request(
        &mut stdin,
        &mut reader,
        "2",
        "patterns.apply",
        json!({ "subjects": ["History"], "components": [{ "name": "Written", "max": 80 }] }),
    );
    assert_eq!(error_code(&unknown), Some("not_found"));

    let zero_max = request(
        &mut stdin,
        &mut reader,
        "3",
        "patterns.apply",
        json!({ "subjects": ["Maths"], "components": [{ "name": "Written", "max": 0 }] }),
    );
    assert_eq!(error_code(&zero_max), Some("bad_params"));

    let both = request(
        &mut stdin,
        &mut reader,
        "4",
        "patterns.apply",
        json!({ "subjects": ["Maths"], "pattern": "x", "components": [] }),
    );
    assert_eq!(error_code(&both), Some("bad_params"));

    let after = request_ok(&mut stdin, &mut reader, "5", "setup.get", json!({}));
    assert_eq!(before, after);
}

#[test]
fn saved_pattern_applies_by_name() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_class(&mut stdin, &mut reader);
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "patterns.save",
        json!({ "name": "Lab split", "components": [
            { "name": "Theory", "max": 70 },
            { "name": "Practical", "max": 30 }
        ] }),
    );
    assert_eq!(
        saved
            .get("patterns")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let applied = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "patterns.apply",
        json!({ "subjects": ["Science"], "pattern": "Lab split" }),
    );
    assert_eq!(
        applied.get("added"),
        Some(&json!(["Science (Theory)", "Science (Practical)"]))
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "3",
        "patterns.apply",
        json!({ "subjects": ["Maths"], "pattern": "Nope" }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));
}

#[test]
fn invalid_default_max_is_rejected_not_coerced() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    for (i, bad) in [json!(""), json!("abc"), json!(0), json!(-5), json!(12.5)].iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("bad-{}", i),
            "setup.maxMarks.setDefault",
            json!({ "exam": "PT1", "value": bad }),
        );
        assert_eq!(error_code(&resp), Some("bad_params"), "value {}", bad);
    }
    let table = request_ok(&mut stdin, &mut reader, "get", "setup.maxMarks.get", json!({ "exam": "PT1" }));
    assert_eq!(
        table
            .get("table")
            .and_then(|t| t.get("default"))
            .and_then(|v| v.as_u64()),
        Some(100)
    );

    let ok = request_ok(
        &mut stdin,
        &mut reader,
        "good",
        "setup.maxMarks.setDefault",
        json!({ "exam": "PT1", "value": "25" }),
    );
    assert_eq!(ok.get("default").and_then(|v| v.as_u64()), Some(25));

    let unknown_exam = request(
        &mut stdin,
        &mut reader,
        "unknown",
        "setup.maxMarks.setDefault",
        json!({ "exam": "Mock", "value": 25 }),
    );
    assert_eq!(error_code(&unknown_exam), Some("not_found"));
}

#[test]
fn subject_override_can_be_cleared_back_to_default() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_class(&mut stdin, &mut reader);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "setup.maxMarks.setSubject",
        json!({ "exam": "Annual", "subject": "Science", "value": 70 }),
    );
    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "setup.maxMarks.clearSubject",
        json!({ "exam": "Annual", "subject": "Science" }),
    );
    assert_eq!(cleared.get("cleared").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(cleared.get("max").and_then(|v| v.as_u64()), Some(100));

    let dup = request_ok(&mut stdin, &mut reader, "3", "setup.subjects.add", json!({ "name": " Maths " }));
    assert_eq!(dup.get("added").and_then(|v| v.as_bool()), Some(false));
}

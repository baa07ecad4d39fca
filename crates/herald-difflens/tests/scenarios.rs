use herald_core::FileSnapshotPair;
use herald_difflens::hunk::{diff_hunks, segment, HunkKind};
use herald_difflens::unified::{excerpt, DEFAULT_CONTEXT};

fn pair(before: &[&str], after: &[&str]) -> FileSnapshotPair {
    FileSnapshotPair::new("/src/app.ts", before.join("\n"), after.join("\n"))
}

#[test]
fn replaced_middle_line_is_commented_on_line_two() {
    let hunks = segment(&pair(&["a", "b", "c"], &["a", "x", "c"]));
    assert_eq!(hunks.len(), 1);
    let h = &hunks[0];
    assert_eq!(h.kind, HunkKind::Replace);
    assert_eq!(h.before_range, 1..2);
    assert_eq!(h.after_range, 1..2);
    assert_eq!(h.after_lines, vec!["x".to_string()]);
    assert_eq!(h.target_line(), 2);
}

#[test]
fn appended_blank_line_is_discarded() {
    let p = FileSnapshotPair::new("/src/app.ts", "a\nb", "a\nb\n\n");
    let raw = diff_hunks(&p);
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].kind, HunkKind::Insert);
    assert_eq!(raw[0].after_lines, vec![String::new()]);
    assert!(segment(&p).is_empty());
}

#[test]
fn no_change_means_no_hunks() {
    for text in ["", "one", "one\ntwo\n", "\n\n\n", "x\r\ny\r\n"] {
        let p = FileSnapshotPair::new("/f", text, text);
        assert!(diff_hunks(&p).is_empty(), "hunks for {text:?}");
        assert!(excerpt(&p, DEFAULT_CONTEXT, 200).is_empty());
    }
}

#[test]
fn hunk_boundaries_are_stable_across_runs() {
    let before: Vec<String> = (0..400)
        .map(|i| match i % 5 {
            0 => "}".to_string(),
            1 => String::new(),
            _ => format!("let v{i} = {i};"),
        })
        .collect();
    let mut after = before.clone();
    after[42] = "let v42 = compute();".into();
    after.insert(200, "log(v200);".into());
    after.insert(201, "log(v201);".into());
    after.insert(202, "log(v202);".into());
    let p = FileSnapshotPair::new("/src/big.ts", before.join("\n"), after.join("\n"));

    let first = segment(&p);
    let second = segment(&p);
    assert_eq!(first, second);

    let lines: Vec<u32> = first.iter().map(|h| h.target_line()).collect();
    assert_eq!(lines, vec![43, 201]);
}

#[test]
fn excerpt_includes_paths_and_hunk_header() {
    let text = excerpt(
        &pair(&["a", "b", "c"], &["a", "x", "c"]),
        DEFAULT_CONTEXT,
        200,
    );
    assert!(text.contains("--- a/src/app.ts"));
    assert!(text.contains("+++ b/src/app.ts"));
    assert!(text.contains("-b"));
    assert!(text.contains("+x"));
}

#[test]
fn hunk_serializes_with_camel_case_ranges() {
    let hunks = segment(&pair(&["a", "b", "c"], &["a", "x", "c"]));
    let json = serde_json::to_value(&hunks[0]).unwrap();
    assert_eq!(json["kind"], "replace");
    assert_eq!(json["afterRange"]["start"], 1);
    assert_eq!(json["afterRange"]["end"], 2);
    assert_eq!(json["afterLines"][0], "x");
}

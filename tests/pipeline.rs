use stackir::listing::ListingEntry;
use stackir::{Decompiler, InlineConfig, Listing, StackIrError};

const MAIN: &str = r#"{
    "name": "main",
    "instructions": [
        { "op": "ldc_i4", "value": 1 },
        { "op": "ldc_i4", "value": 2 },
        { "op": "binary", "operator": "add" },
        { "op": "ldc_i4", "value": 3 },
        { "op": "binary", "operator": "mul" },
        { "op": "ret", "value": true }
    ]
}"#;

const STALLED: &str = r#"{
    "name": "stalled",
    "instructions": [
        { "op": "call", "method": "f", "returns_value": true },
        { "op": "peek" },
        { "op": "binary", "operator": "add" },
        { "op": "st_loc", "local": 0 }
    ]
}"#;

fn body_lines(func: &stackir::IlFunction) -> Vec<String> {
    func.body
        .instructions()
        .iter()
        .map(|&inst| func.render(inst).unwrap())
        .collect()
}

#[test]
fn test_default_pipeline_inlines_and_verifies() {
    let mut func = Listing::from_json(MAIN).unwrap().build().unwrap();
    let report = Decompiler::default().process_function(&mut func).unwrap();

    assert_eq!(
        body_lines(&func),
        vec!["ret(mul(add(ldc.i4 1, ldc.i4 2), ldc.i4 3))"]
    );
    let inlining = report.inlining.unwrap();
    assert_eq!(inlining.entries_before, 6);
    assert_eq!(inlining.entries_after, 1);
    assert!(inlining.finished);
    assert_eq!(report.folded, 0);
    assert_eq!(report.live_instructions, 6);
}

#[test]
fn test_folding_runs_after_inlining() {
    let config = InlineConfig {
        fold_constants: true,
        ..InlineConfig::default()
    };
    let mut func = Listing::from_json(MAIN).unwrap().build().unwrap();
    let report = Decompiler::new(config).process_function(&mut func).unwrap();

    assert_eq!(body_lines(&func), vec!["ret(ldc.i4 9)"]);
    assert_eq!(report.folded, 2);
    assert_eq!(report.live_instructions, 2);
}

#[test]
fn test_disabled_inlining_keeps_flat_listing() {
    let config = InlineConfig {
        inline: false,
        fold_constants: true,
        verify: true,
    };
    let mut func = Listing::from_json(MAIN).unwrap().build().unwrap();
    let report = Decompiler::new(config).process_function(&mut func).unwrap();

    assert!(report.inlining.is_none());
    assert_eq!(report.folded, 0);
    assert_eq!(func.body.instruction_count(), 6);
}

#[test]
fn test_stalled_listing_reports_unfinished() {
    let mut func = Listing::from_json(STALLED).unwrap().build().unwrap();
    let report = Decompiler::default().process_function(&mut func).unwrap();

    assert_eq!(
        body_lines(&func),
        vec!["call f()", "peek", "stloc V_0(add(pop, pop))"]
    );
    let inlining = report.inlining.unwrap();
    assert!(!inlining.finished);
    // the top-level `peek` waits on `call f`, then `add` is blocked by that `peek`
    assert_eq!(inlining.stalled, 2);
}

#[test]
fn test_functions_are_processed_independently() {
    let mut funcs = (0..16)
        .map(|index| {
            let listing = if index % 2 == 0 { MAIN } else { STALLED };
            Listing::from_json(listing).unwrap().build().unwrap()
        })
        .collect::<Vec<_>>();

    let reports = Decompiler::default().process_functions(&mut funcs);

    assert_eq!(reports.len(), 16);
    for (index, report) in reports.into_iter().enumerate() {
        let report = report.unwrap();
        let expected = if index % 2 == 0 { "main" } else { "stalled" };
        assert_eq!(report.name, expected);
        assert_eq!(report.inlining.unwrap().finished, index % 2 == 0);
    }
    assert_eq!(body_lines(&funcs[2]), body_lines(&funcs[0]));
}

#[test]
fn test_listing_round_trips_through_json() {
    let listing = Listing::from_json(STALLED).unwrap();
    assert_eq!(
        listing.instructions[0],
        ListingEntry::Call {
            method: "f".to_string(),
            args: 0,
            returns_value: true
        }
    );
    let text = serde_json::to_string(&listing).unwrap();
    assert_eq!(Listing::from_json(&text).unwrap(), listing);
}

#[test]
fn test_peek_on_empty_stack_is_rejected() {
    let err = Listing::from_json(r#"{ "name": "bad", "instructions": [{ "op": "peek" }] }"#)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, StackIrError::Listing { index: 0, .. }));
}

#[test]
fn test_malformed_listing_is_a_json_error() {
    let err = Listing::from_json(r#"{ "name": "bad", "instructions": [{ "op": "jump" }] }"#)
        .unwrap_err();
    assert!(matches!(err, StackIrError::Json(_)));
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "verify": false }"#).unwrap();

    let config = InlineConfig::from_path(&path).unwrap();
    assert!(config.inline);
    assert!(!config.verify);
}

//! End-to-end compilation tests: source text in, segment stream out.

use mudc_engine::{
    decode, CompileError, CompilerOptions, DiagnosticKind, ErrorPolicy, MemoryMap, RedefinePolicy,
    Session, SessionError,
};

fn compile(source: &str) -> (Session, mudc_engine::CompileOutput) {
    compile_with(source, CompilerOptions::default())
}

fn compile_with(source: &str, options: CompilerOptions) -> (Session, mudc_engine::CompileOutput) {
    let mut session = Session::new(options);
    session.compile_source("test.mud", source).expect("compile failed");
    let output = session.finish().expect("finish failed");
    (session, output)
}

#[test]
fn a_small_world_round_trips_through_the_stream() {
    let source = r#"
        /* world geography */
        define 0 "region"
            depth : byte = 2
            lit : bit = 1
        enddefine
        define 1 "avatar"
            health : byte = 100
        enddefine
        define 16 "lamp"
            brightness : byte
            home : regid
        enddefine

        use region hall = 10 { east : R 11 }
        use region yard = 11 { depth : 3 }
        use avatar player { }
        use lamp { brightness : 4 + 2 * 2  home : hall }
    "#;
    let options = CompilerOptions {
        memory_map: MemoryMap {
            object_base: 0x1000,
            entry_point: Some(0x1000),
        },
        ..CompilerOptions::default()
    };
    let (_, output) = compile_with(source, options);

    // everything packs contiguously except the explicit-id gap
    assert_eq!(output.image.segments.len(), 1);
    let decoded = decode(&output.stream).expect("stream decode failed");
    assert_eq!(decoded.segments, output.image.segments);
    assert_eq!(decoded.entry_point, Some(0x1000));

    // reciprocal west link was backfilled, not reported
    assert!(output.asymmetries.is_empty());
    let hall = output.regions.iter().find(|r| r.noid == 10).unwrap();
    assert_eq!(hall.neighbors, [-1, -1, 11, -1]);
    let yard = output.regions.iter().find(|r| r.noid == 11).unwrap();
    assert_eq!(yard.neighbors, [10, -1, -1, -1]);
}

#[test]
fn arithmetic_precedence_reaches_the_image() {
    let (_, output) = compile(
        r#"define 2 "cell"
            v : byte = 3 + 4 * 2
        enddefine
        use cell { }"#,
    );
    assert_eq!(output.image.segments[0].data, vec![11]);
}

#[test]
fn bit_then_byte_lands_at_offset_one() {
    let (session, output) = compile(
        r#"define 2 "item"
            flag : bit
            level : byte
        enddefine
        use item { }"#,
    );
    let class = session.compiler().classes().by_name("item").unwrap();
    assert_eq!(class.size, 2);
    assert_eq!(class.field("level").unwrap().offset, 1);
    assert_eq!(output.image.segments[0].data, vec![0, 0]);
}

#[test]
fn adjacent_objects_share_one_segment() {
    let (_, output) = compile(
        r#"define 2 "pair"
            v : words
        enddefine
        use pair { v : 0x0101 }
        use pair { v : 0x0202 }"#,
    );
    assert_eq!(output.image.segments.len(), 1);
    let segment = &output.image.segments[0];
    assert_eq!(segment.start, 0x1000);
    assert_eq!(segment.end(), 0x1003);
    assert_eq!(segment.data, vec![0x01, 0x01, 0x02, 0x02]);
}

#[test]
fn explicit_id_gaps_do_not_gap_addresses() {
    let (_, output) = compile(
        r#"define 2 "pair"
            v : words
        enddefine
        use pair = 0 { }
        use pair = 9 { }"#,
    );
    // packing skips no addresses, so both still touch
    assert_eq!(output.image.segments.len(), 1);
    assert_eq!(output.image.segments[0].data.len(), 4);
}

#[test]
fn duplicate_explicit_id_is_rejected() {
    let mut session = Session::new(CompilerOptions::default());
    let err = session
        .compile_source(
            "test.mud",
            r#"define 2 "thing"
                v : byte
            enddefine
            use thing = 5 { }
            use thing = 5 { }"#,
        )
        .unwrap_err();
    assert!(matches!(err, SessionError::Reported { count: 1 }));
    assert!(matches!(
        session.diagnostics()[0].kind,
        DiagnosticKind::Compile(CompileError::DuplicateObjectId { id: 5, .. })
    ));
}

#[test]
fn asymmetric_links_are_reported_and_kept() {
    let (_, output) = compile(
        r#"define 0 "region"
            depth : byte
        enddefine
        use region a = 1 { east : R 2 }
        use region b = 2 { west : R 3 }
        use region c = 3 { }"#,
    );
    assert_eq!(output.asymmetries.len(), 1);
    let report = &output.asymmetries[0];
    assert_eq!((report.region, report.declared, report.found), (1, 2, 3));
    // b keeps its declared link
    let b = output.regions.iter().find(|r| r.noid == 2).unwrap();
    assert_eq!(b.neighbors[0], 3);
}

#[test]
fn class_redefinition_honors_the_policy() {
    let source = r#"define 2 "thing"
        v : byte
    enddefine
    define 3 "thing"
        w : words
    enddefine"#;

    let mut strict = Session::new(CompilerOptions::default());
    assert!(strict.compile_source("test.mud", source).is_err());
    assert!(matches!(
        strict.diagnostics()[0].kind,
        DiagnosticKind::Compile(CompileError::DuplicateSymbol { .. })
    ));

    let options = CompilerOptions {
        redefine_policy: RedefinePolicy::Shadow,
        ..CompilerOptions::default()
    };
    let mut shadow = Session::new(options);
    shadow.compile_source("test.mud", source).unwrap();
    let compiler = shadow.compiler();
    let thing = compiler.classes().by_name("thing").unwrap();
    assert_eq!(thing.id, 3);
    assert_eq!(thing.size, 2);
}

#[test]
fn string_properties_override_prototype_text() {
    let (_, output) = compile(
        r#"define 7 "sign"
            text(8) : character = "CLOSED"
        enddefine
        use sign { text : "OPEN" }"#,
    );
    // override writes over the prototype from the start of the field
    assert_eq!(&output.image.segments[0].data[..6], b"OPENED");
}

#[test]
fn continue_policy_still_fails_the_build() {
    let options = CompilerOptions {
        error_policy: ErrorPolicy::Continue,
        ..CompilerOptions::default()
    };
    let mut session = Session::new(options);
    session
        .compile_source(
            "test.mud",
            r#"a = missing
            define 2 "ok"
                v : byte
            enddefine
            use nope { }"#,
        )
        .unwrap();
    assert_eq!(session.diagnostics().len(), 2);
    assert!(session.compiler().classes().by_name("ok").is_some());
    assert!(matches!(
        session.finish().unwrap_err(),
        SessionError::Reported { count: 2 }
    ));
}

#[test]
fn references_type_check_against_field_namespaces() {
    let mut session = Session::new(CompilerOptions::default());
    let err = session
        .compile_source(
            "test.mud",
            r#"define 0 "region"
                depth : byte
            enddefine
            define 16 "lamp"
                owner : avaid
            enddefine
            use region hall { }
            use lamp { owner : hall }"#,
        )
        .unwrap_err();
    assert!(matches!(err, SessionError::Reported { count: 1 }));
    assert!(matches!(
        session.diagnostics()[0].kind,
        DiagnosticKind::Compile(CompileError::TypeMismatch { .. })
    ));
}

//! Unit tests for instruction recognition.

use deparanoid::instruction::*;

fn parsed(line: &str) -> Instruction {
    parse(line).unwrap().unwrap_or_else(|| panic!("not recognised: {line}"))
}

#[test]
fn test_const_variants() {
    for (line, register, value) in [
        ("const/4 v0, 0x1", "v0", 1),
        ("const/16 v1, -0x80", "v1", -0x80),
        ("const/high16 v2, 0x7f000000", "v2", 0x7f00_0000),
        ("const v3, 0x12345678", "v3", 0x1234_5678),
        ("const-wide v0, -0x2a4a8f1b5c3d7e10L", "v0", -0x2a4a_8f1b_5c3d_7e10),
        ("const-wide/16 v4, 0x10", "v4", 0x10),
        ("const-wide/32 p0, 0x7fffffff", "p0", 0x7fff_ffff),
        ("const-wide/high16 v6, 0x4000000000000000L", "v6", 0x4000_0000_0000_0000),
        ("const-wide v0, -0x8000000000000000L", "v0", i64::MIN),
    ] {
        assert_eq!(
            parsed(line),
            Instruction::Const { register: register.to_string(), value },
            "{line}"
        );
    }
}

#[test]
fn test_const_string_keeps_raw_literal() {
    assert_eq!(
        parsed(r#"    const-string v2, "\u0003foo \"bar\"""#),
        Instruction::ConstString {
            register: "v2".to_string(),
            value: r#"\u0003foo \"bar\""#.to_string(),
        }
    );
    assert_eq!(
        parsed(r#"const-string/jumbo v0, """#),
        Instruction::ConstString { register: "v0".to_string(), value: String::new() }
    );
}

#[test]
fn test_new_array() {
    assert_eq!(
        parsed("new-array v0, v1, [Ljava/lang/String;"),
        Instruction::NewArray {
            register: "v0".to_string(),
            size_register: "v1".to_string(),
            type_descriptor: "[Ljava/lang/String;".to_string(),
        }
    );
}

#[test]
fn test_array_access() {
    assert_eq!(
        parsed("aput-object v2, v0, v1"),
        Instruction::ArrayAccess {
            op: AccessOp::Put,
            value_register: "v2".to_string(),
            array_register: "v0".to_string(),
            index_register: "v1".to_string(),
        }
    );
    assert!(matches!(parsed("aget-char v3, v4, v5"), Instruction::ArrayAccess { op: AccessOp::Get, .. }));
    assert_eq!(parse("aput-foo v1, v2, v3").unwrap(), None);
}

#[test]
fn test_static_field() {
    assert_eq!(
        parsed("sput-object v0, Lo/Deobf;->chunks:[Ljava/lang/String;"),
        Instruction::StaticField {
            op: AccessOp::Put,
            register: "v0".to_string(),
            class_name: "Lo/Deobf;".to_string(),
            field_name: "chunks".to_string(),
            field_type: "[Ljava/lang/String;".to_string(),
        }
    );
    assert!(matches!(
        parsed("sget v1, Lcom/a/B$C;->count:I"),
        Instruction::StaticField { op: AccessOp::Get, .. }
    ));
}

#[test]
fn test_unicode_names() {
    let i = parsed("sget-object v0, Lcom/\u{30b9}\u{30c8}/Ж;->\u{4e2d}:[Ljava/lang/String;");
    match i {
        Instruction::StaticField { class_name, field_name, .. } => {
            assert_eq!(class_name, "Lcom/\u{30b9}\u{30c8}/Ж;");
            assert_eq!(field_name, "\u{4e2d}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_invoke_static() {
    assert_eq!(
        parsed("invoke-static {v0, v1}, Lfoo;->bar(J)Ljava/lang/String;"),
        Instruction::InvokeStatic {
            registers: vec!["v0".to_string(), "v1".to_string()],
            class_name: "Lfoo;".to_string(),
            method: "bar(J)Ljava/lang/String;".to_string(),
            range: false,
        }
    );
    assert!(matches!(
        parsed("invoke-static {}, La;->b()V"),
        Instruction::InvokeStatic { ref registers, .. } if registers.is_empty()
    ));
}

#[test]
fn test_invoke_static_range() {
    assert_eq!(
        parsed("invoke-static/range {v16 .. v17}, Lfoo;->bar(J)Ljava/lang/String;"),
        Instruction::InvokeStatic {
            registers: vec!["v16".to_string(), "v17".to_string()],
            class_name: "Lfoo;".to_string(),
            method: "bar(J)Ljava/lang/String;".to_string(),
            range: true,
        }
    );
}

#[test]
fn test_move_result() {
    assert_eq!(
        parsed("move-result-object v0"),
        Instruction::MoveResult { register: "v0".to_string(), kind: MoveResultKind::Object }
    );
    assert_eq!(
        parsed("move-result-wide v2"),
        Instruction::MoveResult { register: "v2".to_string(), kind: MoveResultKind::Wide }
    );
    assert_eq!(
        parsed("move-result v1"),
        Instruction::MoveResult { register: "v1".to_string(), kind: MoveResultKind::Plain }
    );
}

#[test]
fn test_unrecognised_lines() {
    for line in ["", "nop", ".line 12", ":cond_0", "# comment", "invoke-virtual {p0}, La;->b()V", "move-exception v0"] {
        assert_eq!(parse(line).unwrap(), None, "{line}");
    }
}

#[test]
fn test_malformed_lines() {
    for line in ["const/4 v0", "new-array v0, v1", "sput-object v0, nowhere", "invoke-static {v0}, bad"] {
        assert!(parse(line).is_err(), "{line}");
    }
}

#[test]
fn test_referenced_registers() {
    assert_eq!(referenced_registers("add-int/lit8 v0, v1, 0x1"), vec!["v0", "v1"]);
    assert_eq!(referenced_registers("invoke-virtual {p0, v2}, La;->b(I)V"), vec!["p0", "v2"]);
    assert_eq!(referenced_registers("if-eqz v3, :cond_0"), vec!["v3"]);
    assert!(referenced_registers(":cond_0").is_empty());
    assert!(referenced_registers("return-void").is_empty());
}

#[test]
fn test_written_registers() {
    assert_eq!(written_registers("iget-wide v0, p0, LA;->x:J"), vec!["v0", "v1"]);
    assert_eq!(written_registers("move-wide/from16 v8, v20"), vec!["v8", "v9"]);
    assert_eq!(written_registers("add-long/2addr v2, v4"), vec!["v2", "v3"]);
    assert_eq!(written_registers("long-to-int v0, v2"), vec!["v0"]);
    assert_eq!(written_registers("cmp-long v0, v2, v4"), vec!["v0"]);
    assert_eq!(written_registers("move-exception p1"), vec!["p1"]);
    assert_eq!(written_registers("new-instance v3, Ljava/lang/Object;"), vec!["v3"]);
}

#[test]
fn test_read_only_lines_write_nothing() {
    for line in [
        "invoke-static {v0, v1}, La;->b(J)V",
        "iput-wide v0, p0, LA;->x:J",
        "aput-object v0, v1, v2",
        "if-eqz v0, :cond_0",
        "return-wide v0",
        "throw v0",
        "monitor-enter v0",
        "check-cast v0, Ljava/lang/String;",
        "fill-array-data v0, :array_0",
        "packed-switch v0, :pswitch_data_0",
        "filled-new-array {v0, v1}, [I",
        ".line 12",
        ":cond_0",
        "# v0 = 1",
    ] {
        assert!(written_registers(line).is_empty(), "{line}");
    }
}

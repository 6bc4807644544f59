//! Unit tests for field and method descriptors.

use deparanoid::descriptor::*;

fn method(modifiers: &[&str], name: &str, arguments: &[&str], return_type: &str) -> MethodDescriptor {
    MethodDescriptor {
        class_name: Some("Lcom/example/A;".to_string()),
        name: name.to_string(),
        arguments: arguments.iter().map(|s| s.to_string()).collect(),
        return_type: return_type.to_string(),
        modifiers: modifiers.iter().map(|s| s.to_string()).collect(),
    }
}

fn field(modifiers: &[&str], name: &str, type_descriptor: &str, init: Option<&str>) -> FieldDescriptor {
    FieldDescriptor {
        class_name: Some("Lcom/example/A;".to_string()),
        name: name.to_string(),
        type_descriptor: type_descriptor.to_string(),
        modifiers: modifiers.iter().map(|s| s.to_string()).collect(),
        init_value: init.map(str::to_string),
    }
}

#[test]
fn test_method_parse_inverts_render() {
    let cases = [
        method(&["public", "static"], "getString", &["J"], "Ljava/lang/String;"),
        method(&["private"], "a", &[], "V"),
        method(&["static", "constructor"], "<clinit>", &[], "V"),
        method(
            &["public", "final", "varargs"],
            "mix",
            &["[[I", "Ljava/util/List;", "Z", "[Ljava/lang/String;", "D"],
            "[B",
        ),
    ];
    for d in cases {
        let rendered = d.to_smali();
        let parsed = MethodDescriptor::parse(&rendered, d.class_name.as_deref()).unwrap();
        assert_eq!(parsed, d, "{rendered}");
    }
}

#[test]
fn test_field_parse_inverts_render() {
    let cases = [
        field(&["private", "static"], "a", "[Ljava/lang/String;", None),
        field(&["public", "static", "final"], "COUNT", "I", Some("0x10")),
        field(&[], "x", "Lcom/example/B;", None),
        field(&["static"], "weird$name-1", "[[J", None),
    ];
    for d in cases {
        let rendered = d.to_smali();
        let parsed = FieldDescriptor::parse(&rendered, d.class_name.as_deref()).unwrap();
        assert_eq!(parsed, d, "{rendered}");
    }
}

#[test]
fn test_parse_signature() {
    let (name, args, ret) = parse_method_signature("run(IJLjava/lang/Object;[[Z)V").unwrap();
    assert_eq!(name, "run");
    assert_eq!(args, vec!["I", "J", "Ljava/lang/Object;", "[[Z"]);
    assert_eq!(ret, "V");
}

#[test]
fn test_malformed_signatures() {
    assert!(parse_method_signature("run(I").is_err());
    assert!(parse_method_signature("(I)V").is_err());
    assert!(parse_method_signature("run(I)").is_err());
    assert!(parse_method_signature("run(Q)V").is_err());
}

#[test]
fn test_reference_round_trip() {
    let m = MethodDescriptor::from_reference("Lorg/lsposed/lsparanoid/Deobfuscator;->getString(J)Ljava/lang/String;").unwrap();
    assert_eq!(m.class_name.as_deref(), Some("Lorg/lsposed/lsparanoid/Deobfuscator;"));
    assert_eq!(m.to_reference(), "Lorg/lsposed/lsparanoid/Deobfuscator;->getString(J)Ljava/lang/String;");
    assert_eq!(m.to_string(), m.to_reference());
}

#[test]
fn test_reference_rejects_non_class_owner() {
    assert!(MethodDescriptor::from_reference("I->a()V").is_err());
    assert!(MethodDescriptor::from_reference("La;.a()V").is_err());
}

#[test]
fn test_descriptors_hash_structurally() {
    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(method(&["static"], "a", &["J"], "V"));
    set.insert(method(&["static"], "a", &["J"], "V"));
    set.insert(method(&["static"], "a", &["I"], "V"));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_not_a_declaration() {
    assert!(FieldDescriptor::parse(".method static a()V", None).is_err());
    assert!(FieldDescriptor::parse(".fieldx a:I", None).is_err());
    assert!(MethodDescriptor::parse(".field a:I", None).is_err());
}

#[test]
fn test_same_field_ignores_modifiers() {
    let a = field(&["static"], "chunks", STRING_ARRAY_TYPE, None);
    let b = FieldDescriptor::new(Some("Lcom/example/A;"), "chunks", STRING_ARRAY_TYPE);
    assert!(a.same_field(&b));
    assert_ne!(a, b);
}

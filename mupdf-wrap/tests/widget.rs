//! Round-trip integration test: parse widget.h via libclang → generate →
//! verify declarations and generated sources.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use mupdf_wrap::classify::Exclusion;
use mupdf_wrap::config::load_config;
use mupdf_wrap::model::*;
use mupdf_wrap::{Generated, extract, generate_from_headers};

struct Fixture {
    headers: HeaderSet,
    generated: Generated,
}

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures/widget")
}

// One parse for the whole file: libclang allows a single instance at a time.
static WIDGET: LazyLock<Fixture> = LazyLock::new(|| {
    let dir = fixture_dir();
    let cfg = load_config(&dir.join("widget.toml")).expect("load widget.toml");
    let headers = extract::parse_headers(&cfg, &dir).expect("parse widget.h");
    let generated = generate_from_headers(&cfg, &headers).expect("generate widget bindings");
    Fixture { headers, generated }
});

fn struct_def(name: &str) -> &'static StructDef {
    WIDGET
        .headers
        .structs
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("struct {name} missing"))
}

fn function(name: &str) -> &'static FunctionDef {
    WIDGET
        .headers
        .functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("function {name} missing"))
}

fn constant(name: &str) -> Option<i64> {
    WIDGET
        .headers
        .constants
        .iter()
        .find(|c| c.name == name)
        .and_then(|c| c.value.as_i64())
}

#[test]
fn roundtrip_structs() {
    let widget = struct_def("fz_widget");
    assert!(widget.complete);
    let names: Vec<&str> = widget.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["refs", "type", "at", "next", "dirty"]);

    let at = widget.field("at").unwrap();
    assert_eq!(at.ty.record_name(), Some("fz_point"));
    assert!(widget.field("type").unwrap().ty.is_enum());
    let next = widget.field("next").unwrap();
    assert_eq!(next.ty.pointee().and_then(|(t, _)| t.record_name()), Some("fz_widget"));
    assert_eq!(widget.field("dirty").unwrap().bitfield_width, Some(1));

    let point = struct_def("fz_point");
    assert_eq!(point.fields.len(), 2);

    let context = struct_def("fz_context");
    assert!(!context.complete, "fz_context should be opaque");
}

#[test]
fn roundtrip_enums_and_constants() {
    let ty = WIDGET
        .headers
        .enums
        .iter()
        .find(|e| e.name == "fz_widget_type")
        .expect("fz_widget_type missing");
    let variants: Vec<(&str, i64)> = ty.variants.iter().map(|v| (v.name.as_str(), v.value)).collect();
    assert_eq!(variants, [("FZ_WIDGET_BUTTON", 0), ("FZ_WIDGET_TEXT", 4)]);

    assert_eq!(constant("FZ_ERROR_GENERIC"), Some(1));
    assert_eq!(constant("FZ_ERROR_SYNTAX"), Some(2));
    assert_eq!(constant("FZ_WIDGET_VERSION"), Some(3));
    assert_eq!(constant("FZ_WIDGET_MASK"), Some(255));
}

#[test]
fn roundtrip_functions() {
    let new = function("fz_new_widget");
    assert!(!new.variadic);
    assert_eq!(new.params.len(), 3);
    assert!(new.comment.as_deref().unwrap_or_default().contains("Create a widget"));
    assert!(new.location.file.ends_with("widget.h"));

    assert!(function("fz_widget_printf").variadic);
    let ap = &function("fz_widget_vprintf").params[3];
    assert!(matches!(&ap.ty, CType::Named { name, .. } if name == "va_list"));

    let origin = function("fz_widget_origin");
    let (pointee, is_const) = origin.params[1].ty.pointee().unwrap();
    assert!(is_const);
    assert_eq!(pointee.record_name(), Some("fz_widget"));
}

#[test]
fn roundtrip_globals() {
    let origin = WIDGET
        .headers
        .globals
        .iter()
        .find(|g| g.name == "fz_origin")
        .expect("fz_origin missing");
    assert_eq!(origin.ty.record_name(), Some("fz_point"));
}

#[test]
fn generated_exceptions() {
    let header = WIDGET.generated.files.get("include/mupdf/exceptions.h").unwrap();
    assert!(header.contains("FzErrorSyntax"));
    assert!(!header.contains("FzErrorCount"));
    assert!(!header.contains("FzErrorNone"));
}

#[test]
fn generated_classes() {
    let header = WIDGET.generated.files.get("include/mupdf/classes.h").unwrap();
    assert!(header.contains("struct FzWidget\n{\n"));
    assert!(header.contains("struct FzPoint\n{\n"));
    assert!(header.contains("FZ_FUNCTION FzWidget fz_next_widget();"));
    let imp = WIDGET.generated.files.get("implementation/classes.cpp").unwrap();
    assert!(imp.contains("static RefsCheck<::fz_widget, FzWidget> s_FzWidget_refs_check"));

    let classes2 = WIDGET.generated.files.get("include/mupdf/classes2.h").unwrap();
    assert!(classes2.contains("FZ_FUNCTION FzPoint fz_origin_value();"));
}

#[test]
fn generated_report_and_interface() {
    let report = &WIDGET.generated.report;
    assert_eq!(report.reasons("fz_widget_printf"), Some(&[Exclusion::Variadic][..]));
    assert_eq!(
        report.reasons("fz_current_widget"),
        Some(&[Exclusion::FirstArgNotStruct][..])
    );

    let interface = WIDGET.generated.files.get("swig/mupdf.i").unwrap();
    assert!(interface.contains("%ignore mupdf::ll_fz_widget_vprintf;\n"));
    assert!(interface.contains("%constant int FZ_WIDGET_TEXT = FZ_WIDGET_TEXT;\n"));
    assert!(interface.contains("def fz_widget_size(widget):"));
}

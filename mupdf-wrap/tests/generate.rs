//! Generation over hand-built declarations: no libclang needed.

use mupdf_wrap::classes::{ClassSpec, ExtraConstructor};
use mupdf_wrap::classify::{Eligibility, Exclusion, ReturnKind};
use mupdf_wrap::config::Config;
use mupdf_wrap::context::GenContext;
use mupdf_wrap::model::*;
use mupdf_wrap::{REPORT_FILE, generate_from_headers, rename};
use proptest::prelude::*;

fn ctx_param() -> ParamDef {
    ParamDef::new("ctx", CType::ptr(CType::struct_typedef("fz_context")))
}

fn widget_ptr() -> CType {
    CType::ptr(CType::struct_typedef("fz_widget"))
}

fn widget_param() -> ParamDef {
    ParamDef::new("widget", widget_ptr())
}

/// A small MuPDF-shaped header set.
fn headers() -> HeaderSet {
    HeaderSet {
        structs: vec![
            StructDef::opaque("fz_context"),
            StructDef::new(
                "fz_widget",
                vec![
                    FieldDef::new("refs", CType::Int),
                    FieldDef::new("next", widget_ptr()),
                ],
            ),
            StructDef::opaque("fz_gadget"),
        ],
        enums: vec![EnumDef {
            name: "fz_widget_type".to_string(),
            variants: vec![EnumVariant {
                name: "FZ_WIDGET_BUTTON".to_string(),
                value: 0,
            }],
            location: Location::default(),
        }],
        functions: vec![
            FunctionDef::new("fz_new_widget", widget_ptr(), vec![ctx_param(), ParamDef::new("n", CType::Int)]),
            FunctionDef::new("fz_keep_widget", widget_ptr(), vec![ctx_param(), widget_param()]),
            FunctionDef::new("fz_drop_widget", CType::Void, vec![ctx_param(), widget_param()]),
            FunctionDef::new("fz_next_widget", widget_ptr(), vec![ctx_param(), widget_param()]),
            FunctionDef::new("fz_current_widget", widget_ptr(), vec![ctx_param()]),
            FunctionDef::new(
                "fz_widget_size",
                CType::Int,
                vec![
                    ctx_param(),
                    widget_param(),
                    ParamDef::new("out_w", CType::ptr(CType::Int)),
                    ParamDef::new("out_h", CType::ptr(CType::Int)),
                ],
            ),
            FunctionDef::new(
                "fz_printf",
                CType::Void,
                vec![
                    ctx_param(),
                    ParamDef::new("fmt", CType::const_ptr(CType::Char)),
                ],
            )
            .variadic(),
            FunctionDef::new(
                "fz_widget_kind",
                CType::Int,
                vec![ParamDef::new("t", CType::Enum { name: "fz_widget_type".to_string() })],
            ),
        ],
        constants: vec![ConstantDef {
            name: "FZ_ERROR_GENERIC".to_string(),
            value: ConstantValue::Signed(2),
        }],
        ..Default::default()
    }
}

#[test]
fn unchanged_headers_write_nothing_the_second_time() {
    let cfg = Config::default();
    let h = headers();
    let first = generate_from_headers(&cfg, &h).unwrap();
    let second = generate_from_headers(&cfg, &h).unwrap();
    assert_eq!(first.files, second.files);

    let dir = tempfile::tempdir().unwrap();
    let stats = first.write_to(dir.path()).unwrap();
    assert_eq!(stats.written.len(), first.files.len());
    let stats = second.write_to(dir.path()).unwrap();
    assert!(stats.written.is_empty(), "rewrote {:?}", stats.written);
    assert_eq!(stats.unchanged, first.files.len());
}

#[test]
fn output_tree_layout() {
    let generated = generate_from_headers(&Config::default(), &headers()).unwrap();
    let paths: Vec<String> = generated
        .files
        .paths()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    for unit in ["internal", "exceptions", "functions", "classes", "classes2"] {
        assert!(paths.contains(&format!("include/mupdf/{unit}.h")), "{paths:?}");
        assert!(paths.contains(&format!("implementation/{unit}.cpp")), "{paths:?}");
    }
    assert!(paths.contains(&"swig/mupdf.i".to_string()));
    assert!(paths.contains(&REPORT_FILE.to_string()));
}

#[test]
fn report_can_be_disabled() {
    let mut cfg = Config::default();
    cfg.output.report = false;
    let generated = generate_from_headers(&cfg, &headers()).unwrap();
    assert!(generated.files.get(REPORT_FILE).is_none());
}

#[test]
fn variadic_function_is_only_reported() {
    let generated = generate_from_headers(&Config::default(), &headers()).unwrap();
    assert_eq!(
        generated.report.reasons("fz_printf"),
        Some(&[Exclusion::Variadic][..])
    );
    let report = generated.files.get(REPORT_FILE).unwrap();
    assert!(report.contains("fz_printf: variadic\n"));
    for path in ["include/mupdf/functions.h", "include/mupdf/classes2.h"] {
        let text = generated.files.get(path).unwrap();
        assert!(!text.contains("fz_printf"), "{path} mentions fz_printf");
    }
}

#[test]
fn struct_without_extras_gets_minimal_class() {
    let generated = generate_from_headers(&Config::default(), &headers()).unwrap();
    let classes = generated.files.get("include/mupdf/classes.h").unwrap();
    assert!(classes.contains("struct FzGadget\n{\n"));
    assert!(classes.contains("    FZ_FUNCTION explicit FzGadget(::fz_gadget* internal);\n"));
    assert!(classes.contains("    FZ_FUNCTION ~FzGadget();\n"));
    // No keep function: copying is deleted.
    assert!(classes.contains("    FzGadget(const FzGadget& rhs) = delete;\n"));
}

#[test]
fn methods_and_constructors_land_in_the_class() {
    let generated = generate_from_headers(&Config::default(), &headers()).unwrap();
    let classes = generated.files.get("include/mupdf/classes.h").unwrap();
    assert!(classes.contains("FZ_FUNCTION explicit FzWidget(int n);"));
    assert!(classes.contains("FZ_FUNCTION FzWidget fz_next_widget();"));
    assert!(!classes.contains("fz_keep_widget()"));
    assert_eq!(generated.report.classes, 2);
    assert_eq!(generated.report.constructors, 1);
}

#[test]
fn every_function_is_classified() {
    let cfg = Config::default();
    let h = headers();
    let ctx = GenContext::new(&cfg, &h).unwrap();
    for f in &h.functions {
        let info = ctx.classify(f);
        match &info.eligibility {
            Eligibility::Constructor { struct_name } | Eligibility::Method { struct_name } => {
                assert!(h.structs.iter().any(|s| &s.name == struct_name));
                assert!(info.exclusions().is_empty());
            }
            Eligibility::Excluded(reasons) => {
                assert!(!reasons.is_empty(), "{} excluded without reason", f.name)
            }
        }
    }
    let kind = ctx.classify(&h.functions[7]);
    assert_eq!(kind.exclusions(), [Exclusion::IsEnum]);
}

#[test]
fn borrowed_results_are_kept() {
    let cfg = Config::default();
    let h = headers();
    let ctx = GenContext::new(&cfg, &h).unwrap();
    let new = ctx.classify(&h.functions[0]);
    assert!(matches!(&new.ret, ReturnKind::Wrapped { keep: None, .. }));
    let current = ctx.classify(&h.functions[4]);
    assert!(matches!(
        &current.ret,
        ReturnKind::Wrapped { keep: Some(k), .. } if k == "fz_keep_widget"
    ));
}

#[test]
fn out_param_helper_shape() {
    let generated = generate_from_headers(&Config::default(), &headers()).unwrap();
    let functions = generated.files.get("include/mupdf/functions.h").unwrap();
    assert!(functions.contains("struct ll_fz_widget_size_outparams\n{\n    int out_w = {};\n    int out_h = {};\n"));
    assert!(functions.contains(
        "FZ_FUNCTION int ll_fz_widget_size_outparams_fn(::fz_widget *widget, ll_fz_widget_size_outparams* outparams);"
    ));
    let interface = generated.files.get("swig/mupdf.i").unwrap();
    assert!(interface.contains("def ll_fz_widget_size(widget):"));
    assert!(interface.contains("    return ret, outparams.out_w, outparams.out_h\n"));
}

#[test]
fn keyword_out_params_reach_every_binding() {
    let mut h = headers();
    h.functions.push(FunctionDef::new(
        "fz_widget_range",
        CType::Int,
        vec![
            ctx_param(),
            widget_param(),
            ParamDef::new("from", CType::ptr(CType::Int)),
            ParamDef::new("in", CType::ptr(CType::Int)),
        ],
    ));
    let generated = generate_from_headers(&Config::default(), &h).unwrap();
    let functions = generated.files.get("include/mupdf/functions.h").unwrap();
    assert!(functions.contains("struct ll_fz_widget_range_outparams\n{\n    int from_ = {};\n    int in_ = {};\n"));
    let interface = generated.files.get("swig/mupdf.i").unwrap();
    assert!(interface.contains("    return ret, outparams.from_, outparams.in_\n"));
    assert!(!interface.contains("outparams.from,"));
}

#[test]
fn snippet_repeating_the_raw_constructor_is_skipped() {
    let mut cfg = Config::default();
    cfg.class.insert(
        "fz_widget".to_string(),
        ClassSpec {
            constructors_extra: vec![ExtraConstructor::Snippet {
                args: "::fz_widget* p".to_string(),
                body: "m_internal = p;".to_string(),
                comment: None,
            }],
            ..Default::default()
        },
    );
    let generated = generate_from_headers(&cfg, &headers()).unwrap();
    let classes = generated.files.get("include/mupdf/classes.h").unwrap();
    assert!(classes.contains("FZ_FUNCTION explicit FzWidget(::fz_widget* internal);"));
    assert!(!classes.contains("FzWidget(::fz_widget* p)"));
}

#[test]
fn class_name_collision_is_an_error() {
    let mut h = headers();
    h.structs.push(StructDef::opaque("fz_Gadget"));
    let err = generate_from_headers(&Config::default(), &h).unwrap_err();
    assert!(format!("{err:#}").contains("FzGadget"));
}

proptest! {
    #[test]
    fn class_names_are_injective(
        a in "fz(_[a-z0-9]{1,6}){1,3}",
        b in "fz(_[a-z0-9]{1,6}){1,3}",
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(rename::class_name(&a), rename::class_name(&b));
    }

    #[test]
    fn ll_names_are_injective(a in "[a-z_]{1,12}", b in "[a-z_]{1,12}") {
        prop_assume!(a != b);
        prop_assert_ne!(rename::ll_name("ll_", &a), rename::ll_name("ll_", &b));
    }
}

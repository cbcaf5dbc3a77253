//! Built-in class extras for MuPDF's structs.

use crate::classes::{
    ClassSpec, Copyable, DirectorSelf, ExtraConstructor, ExtraMethod, IteratorSpec, Pod,
    VirtualFnptrs,
};

fn fields(names: &[&str]) -> ExtraConstructor {
    ExtraConstructor::Fields {
        fields: names.iter().map(|s| s.to_string()).collect(),
        comment: None,
    }
}

fn prefixes(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Geometry types are small value types copied member-wise.
fn geometry(members: &[&str]) -> ClassSpec {
    ClassSpec {
        pod: Pod::Inline,
        copyable: Copyable::Default,
        constructors_extra: vec![fields(members)],
        ..Default::default()
    }
}

/// Context-like structs that never get a wrapper class.
const OPAQUE: &[&str] = &[
    "fz_aa_context",
    "fz_alloc_context",
    "fz_context",
    "fz_error_context",
    "fz_error_stack_slot",
    "fz_font_context",
    "fz_glyph_cache",
    "fz_locks_context",
    "fz_store",
    "fz_warn_context",
];

pub fn builtin() -> Vec<(&'static str, ClassSpec)> {
    let mut table: Vec<(&'static str, ClassSpec)> = OPAQUE
        .iter()
        .map(|name| {
            (
                *name,
                ClassSpec {
                    opaque: true,
                    ..Default::default()
                },
            )
        })
        .collect();

    let mut rect = geometry(&["x0", "y0", "x1", "y1"]);
    rect.constructor_prefixes = prefixes(&["fz_make_rect"]);
    rect.methods_extra = vec![ExtraMethod {
        comment: Some("True if the point is inside the rect.".to_string()),
        ..ExtraMethod::new(
            "bool",
            "contains(double x, double y)",
            "{\n    return x >= this->x0 && x < this->x1 && y >= this->y0 && y < this->y1;\n}",
        )
    }];

    let mut matrix = geometry(&["a", "b", "c", "d", "e", "f"]);
    matrix.constructor_prefixes = prefixes(&["fz_make_matrix"]);
    matrix.constructors_extra.insert(
        0,
        ExtraConstructor::DefaultFrom {
            global: "fz_identity".to_string(),
            comment: Some("Constructs the identity matrix.".to_string()),
        },
    );

    let mut point = geometry(&["x", "y"]);
    point.constructor_prefixes = prefixes(&["fz_make_point"]);

    table.extend([
        ("fz_rect", rect),
        ("fz_irect", geometry(&["x0", "y0", "x1", "y1"])),
        ("fz_matrix", matrix),
        ("fz_point", point),
        ("fz_quad", geometry(&["ul", "ur", "ll", "lr"])),
        (
            "fz_cookie",
            ClassSpec {
                pod: Pod::Yes,
                copyable: Copyable::Default,
                accessors: true,
                ..Default::default()
            },
        ),
        (
            "fz_stext_options",
            ClassSpec {
                pod: Pod::Yes,
                copyable: Copyable::Default,
                accessors: true,
                ..Default::default()
            },
        ),
        (
            "fz_buffer",
            ClassSpec {
                constructor_prefixes: prefixes(&["fz_read_file"]),
                ..Default::default()
            },
        ),
        (
            "fz_document",
            ClassSpec {
                constructor_prefixes: prefixes(&["fz_open_document"]),
                ..Default::default()
            },
        ),
        (
            "fz_page",
            ClassSpec {
                constructor_prefixes: prefixes(&["fz_load_page", "fz_load_chapter_page"]),
                ..Default::default()
            },
        ),
        (
            "fz_pixmap",
            ClassSpec {
                accessors: true,
                ..Default::default()
            },
        ),
        (
            "fz_font",
            ClassSpec {
                refs_offset: Some(0),
                ..Default::default()
            },
        ),
        (
            "fz_outline",
            ClassSpec {
                accessors: true,
                iterator: Some(IteratorSpec {
                    first: None,
                    next: "next".to_string(),
                }),
                ..Default::default()
            },
        ),
        (
            "fz_link",
            ClassSpec {
                accessors: true,
                iterator: Some(IteratorSpec {
                    first: None,
                    next: "next".to_string(),
                }),
                ..Default::default()
            },
        ),
        (
            "fz_stext_page",
            ClassSpec {
                iterator: Some(IteratorSpec {
                    first: Some("first_block".to_string()),
                    next: "next".to_string(),
                }),
                ..Default::default()
            },
        ),
        (
            "fz_stext_block",
            ClassSpec {
                pod: Pod::None,
                copyable: Copyable::Default,
                accessors: true,
                ..Default::default()
            },
        ),
        (
            "fz_device",
            ClassSpec {
                virtual_fnptrs: Some(VirtualFnptrs {
                    self_: DirectorSelf::Trailing {
                        alloc: "fz_new_device_of_size".to_string(),
                    },
                    comment: Some(
                        "Device whose callbacks are virtual methods that can be overridden."
                            .to_string(),
                    ),
                }),
                ..Default::default()
            },
        ),
        (
            "pdf_document",
            ClassSpec {
                constructor_prefixes: prefixes(&["pdf_open_document"]),
                ..Default::default()
            },
        ),
        (
            "pdf_page",
            ClassSpec {
                constructor_prefixes: prefixes(&["pdf_load_page"]),
                ..Default::default()
            },
        ),
    ]);
    table
}

//! Extraction: clang `Entity`/`Type` → [`HeaderSet`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clang::{
    Entity, EntityKind, Index, StorageClass, Type as ClangType, TypeKind,
    sonar::{self, Declaration, DefinitionValue},
};
use tracing::{debug, info, trace, warn};

use crate::config::{self, Config};
use crate::model::*;

/// Parse the configured headers once and extract every declaration located
/// in the traverse list.
///
/// `base_dir` is the directory relative to which header paths are resolved
/// (typically the parent directory of the TOML file).
pub fn parse_headers(cfg: &Config, base_dir: &Path) -> Result<HeaderSet> {
    let clang =
        clang::Clang::new().map_err(|e| anyhow::anyhow!("failed to initialize libclang: {e}"))?;
    let index = Index::new(&clang, false, false);
    extract(&index, cfg, base_dir)
}

fn extract(index: &Index, cfg: &Config, base_dir: &Path) -> Result<HeaderSet> {
    let header_path = cfg.wrapper_header(base_dir)?;
    debug!(header = %header_path.display(), "parsing headers");

    // User-specified args + -I flags from include_paths
    let mut all_args: Vec<String> = cfg.clang_args.clone();
    for inc in &cfg.include_paths {
        let inc = if inc.is_absolute() {
            inc.clone()
        } else {
            base_dir.join(inc)
        };
        let flag = format!("-I{}", inc.display());
        if !all_args.contains(&flag) {
            all_args.push(flag);
        }
    }
    // Attach plain `/* */` comments too; MuPDF documents with both styles.
    all_args.push("-fparse-all-comments".to_string());

    let tu = index
        .parser(&header_path)
        .arguments(&all_args)
        .detailed_preprocessing_record(true)
        .skip_function_bodies(true)
        .parse()
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {:?}", header_path.display(), e))?;

    // Resolve traverse entries through include_paths so relative names work,
    // and canonical forms match clang's spelling of `..` components.
    let resolved_traverse: Vec<PathBuf> = cfg
        .traverse_files()
        .iter()
        .map(|t| config::resolve_header(t, base_dir, &cfg.include_paths))
        .flat_map(|p| {
            let canonical = std::fs::canonicalize(&p).ok().filter(|c| *c != p);
            std::iter::once(p).chain(canonical)
        })
        .collect();
    let entities = tu.get_entity().get_children();

    let in_scope = |e: &Entity| in_traverse(e, &resolved_traverse);

    let structs = collect_structs(&entities, &in_scope);
    let (enums, anon_enum_constants) = collect_enums(&entities, &in_scope);
    let functions = collect_functions(&entities, &in_scope);
    let globals = collect_globals(&entities, &in_scope);
    let mut constants = collect_constants(&entities, &in_scope);
    constants.extend(anon_enum_constants);

    info!(
        structs = structs.len(),
        enums = enums.len(),
        functions = functions.len(),
        constants = constants.len(),
        globals = globals.len(),
        "header extraction complete"
    );

    Ok(HeaderSet {
        structs,
        enums,
        functions,
        constants,
        globals,
    })
}

// ---------------------------------------------------------------------------
// Collection helpers, one per declaration kind
// ---------------------------------------------------------------------------

/// Collect structs via sonar, then run a supplemental pass for StructDecl
/// entities that sonar missed, then record forward declarations that never
/// get a definition as opaque structs.
fn collect_structs(entities: &[Entity], in_scope: &impl Fn(&Entity) -> bool) -> Vec<StructDef> {
    let mut structs = Vec::new();
    let mut seen = HashSet::new();

    // Primary: sonar-discovered structs (via typedef patterns)
    for decl in sonar::find_structs(entities.to_vec()) {
        if !in_scope(&decl.entity) {
            continue;
        }
        seen.insert(decl.name.clone());
        match extract_struct(&decl) {
            Ok((s, nested)) => {
                debug!(name = %s.name, fields = s.fields.len(), "extracted struct");
                for ns in nested {
                    seen.insert(ns.name.clone());
                    structs.push(ns);
                }
                structs.push(s);
            }
            Err(e) => warn!(name = %decl.name, err = %e, "skipping struct"),
        }
    }

    // Supplemental: StructDecl/UnionDecl entities with full definitions that
    // sonar missed (a definition separate from its `typedef struct x x;`).
    let mut forward = Vec::new();
    for entity in entities {
        let is_union = match entity.get_kind() {
            EntityKind::StructDecl => false,
            EntityKind::UnionDecl => true,
            _ => continue,
        };
        if !in_scope(entity) {
            continue;
        }
        let name = match entity.get_name() {
            Some(n) if !is_unnamed(&n) => n,
            _ => continue,
        };
        if seen.contains(&name) {
            continue;
        }
        if !entity.is_definition() {
            forward.push((name, *entity));
            continue;
        }
        seen.insert(name.clone());
        match extract_struct_from_entity(entity, &name, is_union) {
            Ok((s, nested)) => {
                let kind = if is_union { "union" } else { "struct" };
                debug!(name = %s.name, fields = s.fields.len(), "extracted {kind} (supplemental)");
                for ns in nested {
                    seen.insert(ns.name.clone());
                    structs.push(ns);
                }
                structs.push(s);
            }
            Err(e) => warn!(name = %name, err = %e, "skipping struct/union"),
        }
    }

    // Opaque: declared but never defined in the header set.
    for (name, entity) in forward {
        if !seen.insert(name.clone()) {
            continue;
        }
        trace!(name = %name, "opaque struct");
        let mut s = StructDef::opaque(&name);
        s.location = location(&entity);
        structs.push(s);
    }

    structs
}

/// Collect enums via sonar. Variants of anonymous enums become constants.
fn collect_enums(
    entities: &[Entity],
    in_scope: &impl Fn(&Entity) -> bool,
) -> (Vec<EnumDef>, Vec<ConstantDef>) {
    let mut enums = Vec::new();
    let mut anon_constants = Vec::new();
    for decl in sonar::find_enums(entities.to_vec()) {
        if !in_scope(&decl.entity) {
            continue;
        }
        let en = extract_enum(&decl);
        if decl.entity.is_anonymous() && is_unnamed(&decl.name) {
            debug!(name = %decl.name, variants = en.variants.len(), "anonymous enum → constants");
            anon_constants.extend(en.variants.into_iter().map(|v| ConstantDef {
                name: v.name,
                value: ConstantValue::Signed(v.value),
            }));
            continue;
        }
        debug!(name = %en.name, variants = en.variants.len(), "extracted enum");
        enums.push(en);
    }

    // Supplemental: bare `enum { ... };` blocks sonar does not report.
    let mut seen: HashSet<String> = enums
        .iter()
        .flat_map(|e| e.variants.iter().map(|v| v.name.clone()))
        .chain(anon_constants.iter().map(|c| c.name.clone()))
        .collect();
    for entity in entities {
        if entity.get_kind() != EntityKind::EnumDecl || !in_scope(entity) {
            continue;
        }
        if !entity.get_name().is_none_or(|n| is_unnamed(&n)) {
            continue;
        }
        for c in entity.get_children() {
            if c.get_kind() != EntityKind::EnumConstantDecl {
                continue;
            }
            let Some(name) = c.get_name() else { continue };
            if !seen.insert(name.clone()) {
                continue;
            }
            let value = c.get_enum_constant_value().map_or(0, |(signed, _)| signed);
            trace!(name = %name, "extracted anonymous enum constant");
            anon_constants.push(ConstantDef {
                name,
                value: ConstantValue::Signed(value),
            });
        }
    }
    (enums, anon_constants)
}

/// Collect functions via sonar, variadic ones included.
fn collect_functions(entities: &[Entity], in_scope: &impl Fn(&Entity) -> bool) -> Vec<FunctionDef> {
    let mut functions = Vec::new();
    let mut seen = HashSet::new();
    for decl in sonar::find_functions(entities.to_vec()) {
        if !in_scope(&decl.entity) {
            continue;
        }
        match extract_function(&decl) {
            Ok(f) => {
                // First declaration wins; later ones are redeclarations.
                if !seen.insert(f.name.clone()) {
                    trace!(name = %f.name, "skipping duplicate function");
                    continue;
                }
                debug!(name = %f.name, params = f.params.len(), variadic = f.variadic, "extracted function");
                functions.push(f);
            }
            Err(e) => warn!(name = %decl.name, err = %e, "skipping function"),
        }
    }
    functions
}

/// Collect `extern` variable declarations.
fn collect_globals(entities: &[Entity], in_scope: &impl Fn(&Entity) -> bool) -> Vec<GlobalDef> {
    let mut globals = Vec::new();
    let mut seen = HashSet::new();
    for entity in entities {
        if entity.get_kind() != EntityKind::VarDecl
            || entity.get_storage_class() != Some(StorageClass::Extern)
            || !in_scope(entity)
        {
            continue;
        }
        let Some(name) = entity.get_name() else {
            continue;
        };
        if !seen.insert(name.clone()) {
            continue;
        }
        let Some(ty) = entity.get_type() else {
            continue;
        };
        match map_clang_type(&ty) {
            Ok(ty) => {
                debug!(name = %name, "extracted global");
                globals.push(GlobalDef {
                    name,
                    ty,
                    location: location(entity),
                });
            }
            Err(e) => warn!(name = %name, err = %e, "skipping global"),
        }
    }
    globals
}

/// Collect `#define` constants via sonar + supplemental hex parsing.
fn collect_constants(entities: &[Entity], in_scope: &impl Fn(&Entity) -> bool) -> Vec<ConstantDef> {
    let mut constants = Vec::new();
    let mut seen = HashSet::new();

    // Primary: sonar-discovered constants (decimal integers + floats)
    for def in sonar::find_definitions(entities.to_vec()) {
        if !in_scope(&def.entity) {
            continue;
        }
        let value = match def.value {
            DefinitionValue::Integer(negated, val) => integer_value(negated, val),
            DefinitionValue::Real(val) => ConstantValue::Float(val),
        };
        trace!(name = %def.name, "extracted #define constant");
        seen.insert(def.name.clone());
        constants.push(ConstantDef {
            name: def.name,
            value,
        });
    }

    // Supplemental: hex and suffixed constants that sonar's u64::from_str
    // misses, e.g. `#define FZ_STORE_DEFAULT (256 << 20)` is skipped but
    // `#define FZ_FONT_FLAG 0x1u` is not.
    for entity in entities {
        if entity.get_kind() != EntityKind::MacroDefinition || !in_scope(entity) {
            continue;
        }
        let name = match entity.get_name() {
            Some(n) if !n.is_empty() => n,
            _ => continue,
        };
        if seen.contains(&name) {
            continue;
        }
        let Some(range) = entity.get_range() else {
            continue;
        };
        let mut tokens: Vec<String> = range.tokenize().iter().map(|t| t.get_spelling()).collect();
        // Strip trailing "#" that clang sometimes appends
        if tokens.last().is_some_and(|t| t == "#") {
            tokens.pop();
        }
        let (negated, number) = match tokens.as_slice() {
            [_, n] => (false, n),
            [_, minus, n] if minus == "-" => (true, n),
            _ => continue,
        };
        if let Some(val) = parse_hex_or_suffixed_int(number) {
            trace!(name = %name, "extracted #define hex constant");
            seen.insert(name.clone());
            constants.push(ConstantDef {
                name,
                value: integer_value(negated, val),
            });
        }
    }

    constants
}

fn integer_value(negated: bool, val: u64) -> ConstantValue {
    if negated {
        ConstantValue::Signed((val as i64).wrapping_neg())
    } else if let Ok(v) = i64::try_from(val) {
        ConstantValue::Signed(v)
    } else {
        ConstantValue::Unsigned(val)
    }
}

/// Parse a hex literal (`0x1F`) or a suffixed integer (`1U`, `0x10UL`, etc.)
/// that `u64::from_str` can't handle. Returns None if not parseable.
fn parse_hex_or_suffixed_int(s: &str) -> Option<u64> {
    // Strip trailing integer suffixes: U, L, LL, UL, ULL (case-insensitive)
    let s = s.trim_end_matches(['u', 'U', 'l', 'L']);

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(octal) = s.strip_prefix("0") {
        if octal.is_empty() {
            Some(0)
        } else if octal.chars().all(|c| c.is_ascii_digit()) {
            u64::from_str_radix(octal, 8).ok()
        } else {
            None
        }
    } else {
        s.parse::<u64>().ok()
    }
}

fn location(entity: &Entity) -> Location {
    let Some(loc) = entity.get_location() else {
        return Location::default();
    };
    let loc = loc.get_file_location();
    Location {
        file: loc.file.map(|f| f.get_path()).unwrap_or_default(),
        line: loc.line,
    }
}

// ---------------------------------------------------------------------------
// Struct extraction
// ---------------------------------------------------------------------------

fn extract_struct(decl: &Declaration) -> Result<(StructDef, Vec<StructDef>)> {
    let is_union = decl.entity.get_kind() == EntityKind::UnionDecl;
    extract_struct_from_entity(&decl.entity, &decl.name, is_union)
}

fn extract_struct_from_entity(
    entity: &Entity,
    name: &str,
    is_union: bool,
) -> Result<(StructDef, Vec<StructDef>)> {
    let mut fields = Vec::new();
    let mut nested_types = Vec::new();
    for child in entity.get_children() {
        if child.get_kind() != EntityKind::FieldDecl {
            continue;
        }
        let field_name = child.get_name().unwrap_or_default();
        let field_type = child.get_type().context("field has no type")?;

        // Anonymous record fields (`union { int a; float b; } u;`) are
        // extracted as separate structs with synthetic names.
        let ctype =
            match try_extract_anonymous_field(&field_type, name, &field_name, &mut nested_types) {
                Some(synthetic_name) => CType::record(&synthetic_name),
                None => map_clang_type(&field_type)
                    .with_context(|| format!("unsupported type for field '{field_name}'"))?,
            };

        let bitfield_width = if child.is_bit_field() {
            child.get_bit_field_width()
        } else {
            None
        };

        trace!(field = %field_name, ty = ?ctype, "  field");
        fields.push(FieldDef {
            name: field_name,
            ty: ctype,
            bitfield_width,
        });
    }

    Ok((
        StructDef {
            name: name.to_string(),
            complete: true,
            is_union,
            fields,
            location: location(entity),
        },
        nested_types,
    ))
}

/// Extract an anonymous record field type as a struct named
/// `ParentName_FieldName` and return that name.
fn try_extract_anonymous_field(
    field_type: &ClangType,
    parent_name: &str,
    field_name: &str,
    nested_types: &mut Vec<StructDef>,
) -> Option<String> {
    // `fz_point at;` names an anonymous struct through its typedef.
    if !is_unnamed(&field_type.get_display_name()) {
        return None;
    }
    let canonical = field_type.get_canonical_type();
    if canonical.get_kind() != TypeKind::Record {
        return None;
    }
    let decl = canonical.get_declaration()?;
    if !decl.is_anonymous() {
        return None;
    }
    let is_nested_union = decl.get_kind() == EntityKind::UnionDecl;
    let synthetic_name = format!("{parent_name}_{field_name}");

    match extract_struct_from_entity(&decl, &synthetic_name, is_nested_union) {
        Ok((nested, mut more)) => {
            debug!(
                parent = %parent_name,
                field = %field_name,
                synthetic = %synthetic_name,
                "extracted anonymous record"
            );
            nested_types.push(nested);
            nested_types.append(&mut more);
            Some(synthetic_name)
        }
        Err(e) => {
            warn!(parent = %parent_name, field = %field_name, err = %e, "failed to extract anonymous record");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Enum and function extraction
// ---------------------------------------------------------------------------

fn extract_enum(decl: &Declaration) -> EnumDef {
    let variants = decl
        .entity
        .get_children()
        .into_iter()
        .filter(|c| c.get_kind() == EntityKind::EnumConstantDecl)
        .map(|c| EnumVariant {
            name: c.get_name().unwrap_or_default(),
            value: c.get_enum_constant_value().map_or(0, |(signed, _)| signed),
        })
        .collect();
    EnumDef {
        name: decl.name.clone(),
        variants,
        location: location(&decl.entity),
    }
}

fn extract_function(decl: &Declaration) -> Result<FunctionDef> {
    let fn_type = decl.entity.get_type().context("function has no type")?;
    let ret_type = fn_type
        .get_result_type()
        .context("function has no return type")?;
    let return_type = map_clang_type(&ret_type)
        .with_context(|| format!("unsupported return type of '{}'", decl.name))?;

    let args = decl.entity.get_arguments().unwrap_or_default();
    let arg_types = fn_type.get_argument_types().unwrap_or_default();

    let mut params = Vec::new();
    for (i, arg_entity) in args.iter().enumerate() {
        let name = arg_entity.get_name().unwrap_or_default();
        let ty = match arg_types.get(i) {
            Some(t) => map_clang_type(t)
                .with_context(|| format!("unsupported type for parameter {i} of '{}'", decl.name))?,
            None => CType::Void,
        };
        // Array parameters decay to pointers.
        let ty = match ty {
            CType::Array { element, .. } => CType::Ptr {
                pointee: element,
                is_const: false,
            },
            other => other,
        };
        params.push(ParamDef { name, ty });
    }

    Ok(FunctionDef {
        name: decl.name.clone(),
        return_type,
        params,
        variadic: decl.entity.is_variadic(),
        comment: decl.entity.get_comment(),
        location: location(&decl.entity),
    })
}

// ---------------------------------------------------------------------------
// Type mapping: clang TypeKind → CType
// ---------------------------------------------------------------------------

fn map_clang_type(ty: &ClangType) -> Result<CType> {
    match ty.get_kind() {
        TypeKind::Void => Ok(CType::Void),
        TypeKind::Bool => Ok(CType::Bool),
        TypeKind::CharS | TypeKind::CharU => Ok(CType::Char),
        TypeKind::SChar => Ok(CType::SChar),
        TypeKind::UChar => Ok(CType::UChar),
        TypeKind::Short => Ok(CType::Short),
        TypeKind::UShort => Ok(CType::UShort),
        TypeKind::Int => Ok(CType::Int),
        TypeKind::UInt => Ok(CType::UInt),
        TypeKind::Long => Ok(CType::Long),
        TypeKind::ULong => Ok(CType::ULong),
        TypeKind::LongLong => Ok(CType::LongLong),
        TypeKind::ULongLong => Ok(CType::ULongLong),
        TypeKind::Float => Ok(CType::Float),
        TypeKind::Double => Ok(CType::Double),
        TypeKind::LongDouble => Ok(CType::LongDouble),

        TypeKind::Pointer => {
            let pointee = ty
                .get_pointee_type()
                .context("pointer has no pointee type")?;
            let is_const = pointee.is_const_qualified();
            Ok(CType::Ptr {
                pointee: Box::new(map_clang_type(&pointee)?),
                is_const,
            })
        }

        TypeKind::ConstantArray => {
            let elem = ty.get_element_type().context("array has no element type")?;
            Ok(CType::Array {
                element: Box::new(map_clang_type(&elem)?),
                len: ty.get_size().unwrap_or(0),
            })
        }

        TypeKind::IncompleteArray => {
            let elem = ty
                .get_element_type()
                .context("incomplete array has no element type")?;
            Ok(CType::ptr(map_clang_type(&elem)?))
        }

        TypeKind::Elaborated => {
            let inner = ty
                .get_elaborated_type()
                .context("elaborated type has no inner type")?;
            map_clang_type(&inner)
        }

        TypeKind::Typedef => {
            let name = ty
                .get_declaration()
                .and_then(|d| d.get_name())
                .unwrap_or_default();
            if name.is_empty() {
                return map_clang_type(&ty.get_canonical_type());
            }
            // va_list is a compiler built-in with no portable canonical type
            if matches!(name.as_str(), "va_list" | "__builtin_va_list" | "__gnuc_va_list") {
                return Ok(CType::Named {
                    name: "va_list".to_string(),
                    resolved: None,
                });
            }
            let canonical = ty.get_canonical_type();
            let resolved = match anonymous_tag(&canonical) {
                // `typedef struct { ... } fz_point;` names the struct.
                Some(TypeKind::Record) => Some(CType::Record {
                    name: name.clone(),
                    complete: canonical.get_sizeof().is_ok(),
                }),
                Some(_) => Some(CType::Enum { name: name.clone() }),
                None => map_clang_type(&canonical).ok(),
            };
            Ok(CType::Named {
                name,
                resolved: resolved.map(Box::new),
            })
        }

        TypeKind::Record => {
            let name = ty
                .get_declaration()
                .and_then(|d| d.get_name())
                .filter(|n| !is_unnamed(n))
                .context("anonymous record type without name")?;
            // __va_list_tag backs va_list on x86-64.
            if name == "__va_list_tag" {
                return Ok(CType::Named {
                    name: "va_list".to_string(),
                    resolved: None,
                });
            }
            Ok(CType::Record {
                name,
                complete: ty.get_sizeof().is_ok(),
            })
        }

        TypeKind::Enum => {
            match ty
                .get_declaration()
                .and_then(|d| d.get_name())
                .filter(|n| !is_unnamed(n))
            {
                Some(name) => Ok(CType::Enum { name }),
                None => Ok(CType::Int),
            }
        }

        TypeKind::FunctionPrototype => {
            let ret = ty
                .get_result_type()
                .context("function prototype has no return type")?;
            let params = ty
                .get_argument_types()
                .unwrap_or_default()
                .iter()
                .map(map_clang_type)
                .collect::<Result<Vec<_>>>()?;
            Ok(CType::FnPtr {
                return_type: Box::new(map_clang_type(&ret)?),
                params,
                variadic: ty.is_variadic(),
            })
        }

        TypeKind::FunctionNoPrototype => Ok(CType::FnPtr {
            return_type: Box::new(CType::Void),
            params: vec![],
            variadic: false,
        }),

        other => {
            // Attributed, atomic and similar wrappers: fall back to the
            // canonical type when it differs.
            let canonical = ty.get_canonical_type();
            if canonical.get_kind() != other {
                return map_clang_type(&canonical);
            }
            anyhow::bail!("unsupported clang TypeKind: {other:?}")
        }
    }
}

/// clang spells anonymous tags as "" or "enum (unnamed at file.h:97:1)",
/// older releases as "(anonymous ...)".
fn is_unnamed(name: &str) -> bool {
    name.is_empty() || name.contains("(unnamed") || name.contains("(anonymous")
}

/// The tag kind of an anonymous struct, union or enum type.
fn anonymous_tag(canonical: &ClangType) -> Option<TypeKind> {
    let kind = canonical.get_kind();
    if !matches!(kind, TypeKind::Record | TypeKind::Enum) {
        return None;
    }
    let decl = canonical.get_declaration()?;
    let unnamed = decl.is_anonymous()
        || decl
            .get_name()
            .is_none_or(|n| is_unnamed(&n));
    unnamed.then_some(kind)
}

// ---------------------------------------------------------------------------
// Source-location filtering
// ---------------------------------------------------------------------------

/// True if the entity is declared in one of the traverse files, or below a
/// traverse directory.
fn in_traverse(entity: &Entity, traverse: &[PathBuf]) -> bool {
    let Some(location) = entity.get_location() else {
        return false;
    };
    let Some(file) = location.get_file_location().file else {
        return false;
    };
    let file_path = file.get_path();
    traverse
        .iter()
        .any(|tf| file_path.starts_with(tf) || file_path.ends_with(tf))
}
